use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::args::RunArgs;
use crate::config::{FleetPlan, LocalWorkerSpec, build_plan, load_config};
use crate::error::{AppError, AppResult, ConfigError, FleetError};
use crate::fleet::{ClientSpec, Controller, EnvironmentPort, MessageTracker, StaticEnvironment};
use crate::rpc::{TcpWorkerPort, WorkerPort};
use crate::supervisor::{LocalEnvironment, WorkerSupervisor};

use super::summary::{FleetReport, log_interim, print_report, write_report};

/// Drives one load test: provisions local workers, starts the fleet, waits for
/// completion and reports per-type statistics.
///
/// # Errors
///
/// Returns configuration and provisioning errors, the first fatal start error,
/// or the first client failure seen while waiting.
pub(crate) async fn run_fleet(args: &RunArgs, verbose: bool) -> AppResult<()> {
    let file = load_config(args.config.as_deref())?
        .ok_or_else(|| AppError::config(ConfigError::NoConfigFile))?;
    let FleetPlan {
        config,
        clients,
        local_workers,
        stats_interval,
        handshake_timeout,
    } = build_plan(&file, args)?;

    let (specs, environment) = provision(clients, &local_workers, handshake_timeout, verbose).await?;
    info!(
        "Fleet of {} workers, start at {}, stop on {:?}",
        specs.len(),
        config.start_time.to_rfc3339(),
        config.stop_condition
    );

    let rpc_timeout = config.timings.rpc_timeout;
    let controller = Controller::from_specs(
        config,
        specs,
        |spec| Arc::new(TcpWorkerPort::new(spec.address.clone(), rpc_timeout)) as Arc<dyn WorkerPort>,
        environment,
    );
    let tracker = Arc::new(MessageTracker::new());
    controller.start_clients(Arc::clone(&tracker)).await?;

    let outcome = monitor(&controller, stats_interval).await;
    if let Err(err) = &outcome {
        error!("Load test failed: {}", err);
    }

    let stats = controller.stats_for_all_types().await;
    let report = FleetReport::new(&stats, controller.progress()?, &tracker);
    print_report(&report);
    if let Some(path) = args.summary_json.as_deref() {
        write_report(Path::new(path), &report).await?;
    }

    if let Err(err) = controller.shutdown(outcome.as_ref().err()).await {
        warn!("Fleet shutdown reported an error: {}", err);
    }
    outcome
}

async fn provision(
    mut clients: Vec<ClientSpec>,
    local_workers: &[LocalWorkerSpec],
    handshake_timeout: Duration,
    verbose: bool,
) -> AppResult<(Vec<ClientSpec>, Arc<dyn EnvironmentPort>)> {
    if local_workers.iter().all(|entry| entry.count == 0) {
        return Ok((clients, Arc::new(StaticEnvironment)));
    }
    let supervisor = Arc::new(WorkerSupervisor::for_current_exe(
        handshake_timeout,
        verbose,
    )?);
    match supervisor.spawn_all(local_workers).await {
        Ok(spawned) => clients.extend(spawned),
        Err(err) => {
            let killed = supervisor.shutdown_all().await;
            warn!("Worker provisioning failed; stopped {} workers", killed);
            return Err(err);
        }
    }
    info!("Spawned {} local workers", supervisor.worker_count());
    Ok((clients, Arc::new(LocalEnvironment::new(supervisor))))
}

/// Waits for the fleet while logging interim statistics every `interval`.
async fn monitor(controller: &Controller, interval: Duration) -> AppResult<()> {
    let wait = controller.wait_for_clients();
    tokio::pin!(wait);
    let first = Instant::now()
        .checked_add(interval)
        .unwrap_or_else(Instant::now);
    let mut ticker = tokio::time::interval_at(first, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut listening = true;

    loop {
        tokio::select! {
            outcome = &mut wait => return outcome,
            _ = ticker.tick() => {
                let stats = controller.stats_for_all_types().await;
                log_interim(&stats, controller.progress()?);
            }
            signal = &mut interrupt, if listening => {
                if let Err(err) = signal {
                    warn!("Failed to listen for Ctrl+C: {}", err);
                    listening = false;
                    continue;
                }
                warn!("Interrupted; reporting partial statistics");
                return Err(AppError::fleet(FleetError::Interrupted));
            }
        }
    }
}
