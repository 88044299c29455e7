use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::io::BufReader;
use tokio::net::TcpListener;

use super::io::{MAX_MESSAGE_BYTES, read_frame, write_frame};
use super::*;
use crate::error::{AppError, AppResult, RpcError};

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::rpc(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn sample_start_request() -> StartRequest {
    StartRequest {
        project: "loadtest-project".to_owned(),
        topic: "loadtest-kafka".to_owned(),
        request_rate: 100,
        message_size: 512,
        max_outstanding_requests: 20,
        start_time: Utc::now(),
        stop_condition: StopCondition::TestDuration(Duration::from_secs(30)),
        broker_options: Some(BrokerOptions::KafkaOptions(KafkaOptions {
            broker: "localhost:9092".to_owned(),
            poll_duration: Duration::from_millis(100),
            zookeeper_address: "localhost:2181".to_owned(),
            replication_factor: 2,
            partitions: 100,
        })),
        burn_in_duration: Duration::from_secs(2),
        publish_batch_size: 10,
        publish_batch_duration: Duration::from_millis(50),
    }
}

/// Serves exactly one call on an ephemeral port, replying with `response`.
async fn serve_once(response: RpcResponse) -> AppResult<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        if read_frame::<_, RpcRequest>(&mut reader).await.is_ok() {
            drop(write_frame(&mut write_half, &response).await);
        }
    });
    Ok(addr)
}

#[test]
fn start_request_uses_oneof_field_names() -> AppResult<()> {
    let request = sample_start_request();
    let value = serde_json::to_value(RpcRequest::Start(Box::new(request)))?;
    if value.get("type").and_then(|kind| kind.as_str()) != Some("start") {
        return Err(AppError::rpc(format!("missing type tag: {}", value)));
    }
    if value
        .get("stop_condition")
        .and_then(|cond| cond.get("test_duration"))
        .and_then(serde_json::Value::as_u64)
        != Some(30_000)
    {
        return Err(AppError::rpc(format!("unexpected stop_condition: {}", value)));
    }
    let kafka = value
        .get("broker_options")
        .and_then(|options| options.get("kafka_options"))
        .ok_or_else(|| AppError::rpc("missing kafka_options"))?;
    if kafka.get("poll_duration").and_then(serde_json::Value::as_u64) != Some(100) {
        return Err(AppError::rpc(format!("unexpected kafka options: {}", kafka)));
    }
    Ok(())
}

#[test]
fn check_response_defaults_optional_fields() -> AppResult<()> {
    let response: RpcResponse =
        serde_json::from_str(r#"{"type":"check","bucket_values":[1,2],"is_finished":true}"#)?;
    let RpcResponse::Check(check) = response else {
        return Err(AppError::rpc("expected check response"));
    };
    if !check.is_finished
        || check.running_duration != Duration::ZERO
        || check.waste_millis != 0
        || !check.received_messages.is_empty()
    {
        return Err(AppError::rpc(format!("unexpected defaults: {:?}", check)));
    }
    Ok(())
}

#[test]
fn read_frame_reports_closed_connection() -> AppResult<()> {
    run_async_test(async {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut reader = BufReader::new(client);
        match read_frame::<_, RpcRequest>(&mut reader).await {
            Err(RpcError::ConnectionClosed) => Ok(()),
            other => Err(AppError::rpc(format!("unexpected result: {:?}", other))),
        }
    })
}

#[test]
fn read_frame_caps_unterminated_lines() -> AppResult<()> {
    run_async_test(async {
        let mut reader = BufReader::new(tokio::io::repeat(b'x'));
        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            read_frame::<_, RpcRequest>(&mut reader),
        )
        .await
        .map_err(|err| AppError::rpc(format!("read did not stop at the limit: {}", err)))?;
        match outcome {
            Err(RpcError::MessageTooLarge { max_bytes }) if max_bytes == MAX_MESSAGE_BYTES => Ok(()),
            other => Err(AppError::rpc(format!("unexpected result: {:?}", other))),
        }
    })
}

#[test]
fn frames_survive_duplex_pipe() -> AppResult<()> {
    run_async_test(async {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, _server_write) = tokio::io::split(server);
        let (_client_read, mut client_write) = tokio::io::split(client);
        let request = CheckRequest {
            duplicates: vec![MessageIdentifier {
                publisher_client_id: 7,
                sequence_number: 3,
            }],
        };
        write_frame(&mut client_write, &RpcRequest::Check(request.clone())).await?;
        let mut reader = BufReader::new(server_read);
        match read_frame::<_, RpcRequest>(&mut reader).await? {
            RpcRequest::Check(received) if received == request => Ok(()),
            other => Err(AppError::rpc(format!("unexpected frame: {:?}", other))),
        }
    })
}

#[test]
fn tcp_port_maps_remote_error() -> AppResult<()> {
    run_async_test(async {
        let addr = serve_once(RpcResponse::Error(ErrorMessage {
            message: "already started".to_owned(),
        }))
        .await?;
        let port = TcpWorkerPort::new(addr, Duration::from_secs(2));
        match port.start(&sample_start_request()).await {
            Err(RpcError::Remote { message }) if message == "already started" => Ok(()),
            other => Err(AppError::rpc(format!("unexpected result: {:?}", other))),
        }
    })
}

#[test]
fn tcp_port_rejects_mismatched_response() -> AppResult<()> {
    run_async_test(async {
        let addr = serve_once(RpcResponse::Start(StartResponse {})).await?;
        let port = TcpWorkerPort::new(addr, Duration::from_secs(2));
        match port.check(&CheckRequest::default()).await {
            Err(RpcError::UnexpectedResponse { expected, actual })
                if expected == "check" && actual == "start" =>
            {
                Ok(())
            }
            other => Err(AppError::rpc(format!("unexpected result: {:?}", other))),
        }
    })
}

#[test]
fn tcp_port_reports_refused_connection() -> AppResult<()> {
    run_async_test(async {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        drop(listener);
        let port = TcpWorkerPort::new(addr, Duration::from_secs(2));
        match port.check(&CheckRequest::default()).await {
            Err(RpcError::Connection { .. }) => Ok(()),
            other => Err(AppError::rpc(format!("unexpected result: {:?}", other))),
        }
    })
}
