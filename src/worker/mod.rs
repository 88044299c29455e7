//! Synthetic worker: serves the control channel and simulates broker traffic.
mod load;
mod server;
mod task;

#[cfg(test)]
mod tests;

pub use server::WorkerServer;
pub use task::Task;

use tracing::info;

use crate::args::WorkerArgs;
use crate::error::AppResult;

/// Entry point of `fleetload worker`: binds, announces the port on stdout and
/// serves until the load has finished and been reported.
///
/// # Errors
///
/// Returns an error when binding or writing the handshake fails.
pub async fn run_worker(args: &WorkerArgs) -> AppResult<()> {
    let publisher_id = args
        .publisher_id
        .unwrap_or_else(|| rand::random::<i64>().saturating_abs());
    let server = WorkerServer::bind(&args.bind, args.client_type, publisher_id).await?;
    let mut stdout = tokio::io::stdout();
    server.announce(&mut stdout).await?;
    info!(
        "Worker {} ready as {} on {}",
        publisher_id,
        args.client_type,
        server.local_addr()?
    );
    server.serve().await;
    Ok(())
}
