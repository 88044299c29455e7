use std::future::Future;
use std::time::Duration;

use chrono::Utc;

use super::*;
use crate::error::{AppError, AppResult, RpcError};
use crate::fleet::ClientType;
use crate::metrics::LatencyBuckets;
use crate::rpc::{
    CheckRequest, MessageIdentifier, StartRequest, StopCondition, TcpWorkerPort, WorkerPort,
    WorkerReady,
};

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::fleet(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn start_request(messages: u32) -> StartRequest {
    StartRequest {
        project: "p".to_owned(),
        topic: "loadtest-kafka".to_owned(),
        request_rate: 1_000,
        message_size: 64,
        max_outstanding_requests: 10,
        start_time: Utc::now(),
        stop_condition: StopCondition::NumberOfMessages(messages),
        broker_options: None,
        burn_in_duration: Duration::ZERO,
        publish_batch_size: 5,
        publish_batch_duration: Duration::ZERO,
    }
}

#[test]
fn flush_returns_deltas_and_resets() -> AppResult<()> {
    let task = Task::new(ClientType::KafkaPublisher, 1);
    task.record_latency(3);
    task.record_latency(3);
    task.record_latency(700);
    let first = task.flush_bucket_values();
    let mut expected = LatencyBuckets::new();
    expected.record_n(3, 2);
    expected.record(700);
    if first != expected {
        return Err(AppError::fleet(format!("Unexpected flush {:?}", first.values())));
    }
    if !task.flush_bucket_values().is_empty() {
        return Err(AppError::fleet("Second flush was not empty"));
    }
    if task.message_count() != 3 {
        return Err(AppError::fleet("Message counter lost samples"));
    }
    Ok(())
}

#[test]
fn identifiers_are_sequential_and_drained() -> AppResult<()> {
    let task = Task::new(ClientType::PubsubSubscriber, 77);
    let first = task.next_identifier();
    let second = task.next_identifier();
    if first.publisher_client_id != 77 || second.sequence_number != first.sequence_number.saturating_add(1) {
        return Err(AppError::fleet("Identifiers are not sequential"));
    }
    task.push_received(&[first, second]);
    let drained = task.drain_received();
    if drained != [first, second] || !task.drain_received().is_empty() {
        return Err(AppError::fleet("Received queue not drained"));
    }
    Ok(())
}

#[test]
fn announce_writes_port_line() -> AppResult<()> {
    run_async_test(async {
        let server = WorkerServer::bind("127.0.0.1:0", ClientType::PubsubPublisher, 1).await?;
        let mut out: Vec<u8> = Vec::new();
        server.announce(&mut out).await?;
        let line = String::from_utf8(out).map_err(|err| AppError::fleet(err.to_string()))?;
        let ready: WorkerReady = serde_json::from_str(line.trim_end())?;
        if !line.ends_with('\n') || ready.port != server.local_addr()?.port() {
            return Err(AppError::fleet(format!("Unexpected handshake {:?}", line)));
        }
        Ok(())
    })
}

#[test]
fn server_runs_load_and_rejects_second_start() -> AppResult<()> {
    run_async_test(async {
        let server = WorkerServer::bind("127.0.0.1:0", ClientType::KafkaSubscriber, 9).await?;
        let addr = server.local_addr()?.to_string();
        let serving = tokio::spawn(server.serve());
        let port = TcpWorkerPort::new(addr, Duration::from_secs(2));

        port.start(&start_request(20)).await?;
        match port.start(&start_request(20)).await {
            Err(RpcError::Remote { .. }) => {}
            other => {
                return Err(AppError::fleet(format!("Second start accepted: {:?}", other)));
            }
        }

        let duplicate = MessageIdentifier {
            publisher_client_id: 9,
            sequence_number: 0,
        };
        let mut total = 0u64;
        let mut finished = false;
        for _ in 0..200 {
            let response = port
                .check(&CheckRequest {
                    duplicates: vec![duplicate],
                })
                .await?;
            total = total.saturating_add(LatencyBuckets::from_wire(&response.bucket_values)?.total());
            if response.is_finished {
                finished = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        if !finished || total != 20 {
            return Err(AppError::fleet(format!(
                "Worker finished={} after {} samples",
                finished, total
            )));
        }
        tokio::time::timeout(Duration::from_secs(2), serving)
            .await
            .map_err(|err| AppError::fleet(format!("Server kept running: {}", err)))??;
        Ok(())
    })
}
