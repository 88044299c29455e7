use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use super::*;
use crate::error::{AppError, AppResult, FleetError};
use crate::fleet::ClientType;

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

#[test]
fn handshake_parses_port_line() -> AppResult<()> {
    run_async_test(async {
        let port = read_handshake(&b"{\"port\":40123}\nlater output\n"[..]).await?;
        if port != 40123 {
            return Err(AppError::fleet(format!("Unexpected port {}", port)));
        }
        Ok(())
    })
}

#[test]
fn handshake_rejects_closed_and_garbage_output() -> AppResult<()> {
    run_async_test(async {
        match read_handshake(&b""[..]).await {
            Err(FleetError::HandshakeClosed) => {}
            other => {
                return Err(AppError::fleet(format!("Expected closed, got {:?}", other)));
            }
        }
        match read_handshake(&b"listening on 4000\n"[..]).await {
            Err(FleetError::HandshakeInvalid { line, .. }) if line == "listening on 4000" => Ok(()),
            other => Err(AppError::fleet(format!("Expected invalid, got {:?}", other))),
        }
    })
}

#[test]
fn missing_program_reports_spawn_error() -> AppResult<()> {
    run_async_test(async {
        let supervisor = WorkerSupervisor::new(
            PathBuf::from("/nonexistent/fleetload-worker"),
            Duration::from_secs(1),
            false,
        );
        match supervisor.spawn_worker(ClientType::KafkaPublisher).await {
            Err(AppError::Fleet(FleetError::WorkerSpawn { .. })) => {}
            other => {
                return Err(AppError::fleet(format!("Expected spawn error, got {:?}", other)));
            }
        }
        if supervisor.worker_count() != 0 {
            return Err(AppError::fleet("Failed worker was tracked"));
        }
        Ok(())
    })
}

#[cfg(unix)]
#[test]
fn silent_exit_reports_closed_handshake() -> AppResult<()> {
    run_async_test(async {
        let supervisor = WorkerSupervisor::new(PathBuf::from("true"), Duration::from_secs(5), false);
        match supervisor.spawn_worker(ClientType::PubsubSubscriber).await {
            Err(AppError::Fleet(FleetError::HandshakeClosed)) => Ok(()),
            other => Err(AppError::fleet(format!(
                "Expected closed handshake, got {:?}",
                other
            ))),
        }
    })
}
