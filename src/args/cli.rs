use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::fleet::ClientType;

use super::parsers::{
    parse_client_type, parse_duration_arg, parse_offset_arg, parse_positive_u32,
};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Fleet controller for distributed synthetic pub/sub load tests - parallel worker start, bounded retries, health-check polling, and aggregated latency statistics."
)]
pub struct FleetArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (overridden by FLEETLOAD_LOG / RUST_LOG)
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Drive a load test across the configured worker fleet
    Run(RunArgs),
    /// Serve the worker control channel with synthetic traffic
    Worker(WorkerArgs),
}

#[derive(Debug, Args, Clone, Default)]
pub struct RunArgs {
    /// Path to config file (TOML or JSON); defaults to ./fleetload.toml or ./fleetload.json
    #[arg(long = "config", short = 'c', env = "FLEETLOAD_CONFIG")]
    pub config: Option<String>,

    /// Project name sent to every worker
    #[arg(long = "project")]
    pub project: Option<String>,

    /// Prefix prepended to each client type's topic suffix
    #[arg(long = "topic-prefix")]
    pub topic_prefix: Option<String>,

    /// Messages per second per worker
    #[arg(long = "request-rate", value_parser = parse_positive_u32)]
    pub request_rate: Option<u32>,

    /// Stop after this long (supports ms/s/m/h)
    #[arg(
        long = "test-duration",
        value_parser = parse_duration_arg,
        conflicts_with = "number_of_messages"
    )]
    pub test_duration: Option<Duration>,

    /// Stop after each publisher has sent this many messages
    #[arg(long = "number-of-messages", value_parser = parse_positive_u32)]
    pub number_of_messages: Option<u32>,

    /// Discard latency data reported this long after the start time (supports ms/s/m/h)
    #[arg(long = "burn-in", value_parser = parse_offset_arg)]
    pub burn_in: Option<Duration>,

    /// Health-check period per worker (supports ms/s/m/h)
    #[arg(long = "check-interval", value_parser = parse_duration_arg)]
    pub check_interval: Option<Duration>,

    /// How often to log intermediate per-type statistics (supports ms/s/m/h)
    #[arg(long = "stats-interval", value_parser = parse_duration_arg)]
    pub stats_interval: Option<Duration>,

    /// Write the final per-type summary as JSON to this path
    #[arg(long = "summary-json")]
    pub summary_json: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct WorkerArgs {
    /// Which role this worker simulates
    #[arg(long = "client-type", value_parser = parse_client_type)]
    pub client_type: ClientType,

    /// Address to bind the control channel on
    #[arg(long = "bind", default_value = "127.0.0.1:0")]
    pub bind: String,

    /// Identifier stamped on published messages (random when omitted)
    #[arg(long = "publisher-id")]
    pub publisher_id: Option<i64>,
}
