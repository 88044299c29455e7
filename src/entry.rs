use clap::Parser;

use crate::app;
use crate::args::{Command, FleetArgs};
use crate::error::AppResult;
use crate::logger::{LogTarget, init_logging};
use crate::worker;

/// Parses the command line, installs logging and runs the selected subcommand
/// on a multi-threaded runtime.
///
/// # Errors
///
/// Returns whatever the subcommand fails with.
pub fn run() -> AppResult<()> {
    let args = FleetArgs::parse();

    let target = match args.command {
        Command::Run(_) => LogTarget::Stdout,
        Command::Worker(_) => LogTarget::Stderr,
    };
    init_logging(args.verbose, args.no_color, target);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args))
}

async fn run_async(args: FleetArgs) -> AppResult<()> {
    match args.command {
        Command::Run(run) => app::run_fleet(&run, args.verbose).await,
        Command::Worker(worker) => worker::run_worker(&worker).await,
    }
}
