use super::*;
use crate::args::parsers::{parse_duration_arg, parse_offset_arg};
use crate::error::{AppError, AppResult};
use crate::fleet::ClientType;
use clap::Parser;
use std::time::Duration;

#[test]
fn parse_run_subcommand_with_overrides() -> AppResult<()> {
    let args = FleetArgs::try_parse_from([
        "fleetload",
        "run",
        "--config",
        "fleet.toml",
        "--request-rate",
        "250",
        "--test-duration",
        "2m",
        "--burn-in",
        "0s",
    ])?;
    let Command::Run(run) = args.command else {
        return Err(AppError::validation("Expected run subcommand"));
    };
    if run.config.as_deref() != Some("fleet.toml") {
        return Err(AppError::validation("Unexpected config path"));
    }
    if run.request_rate != Some(250) {
        return Err(AppError::validation("Unexpected request rate"));
    }
    if run.test_duration != Some(Duration::from_secs(120)) {
        return Err(AppError::validation("Unexpected test duration"));
    }
    if run.burn_in != Some(Duration::ZERO) {
        return Err(AppError::validation("Unexpected burn-in"));
    }
    Ok(())
}

#[test]
fn parse_worker_subcommand() -> AppResult<()> {
    let args = FleetArgs::try_parse_from([
        "fleetload",
        "--verbose",
        "worker",
        "--client-type",
        "kafka-subscriber",
    ])?;
    if !args.verbose {
        return Err(AppError::validation("Expected verbose flag"));
    }
    let Command::Worker(worker) = args.command else {
        return Err(AppError::validation("Expected worker subcommand"));
    };
    if worker.client_type != ClientType::KafkaSubscriber {
        return Err(AppError::validation("Unexpected client type"));
    }
    if worker.bind != "127.0.0.1:0" {
        return Err(AppError::validation("Unexpected default bind address"));
    }
    Ok(())
}

#[test]
fn stop_condition_flags_conflict() -> AppResult<()> {
    let result = FleetArgs::try_parse_from([
        "fleetload",
        "run",
        "--test-duration",
        "10s",
        "--number-of-messages",
        "100",
    ]);
    if result.is_ok() {
        return Err(AppError::validation("Expected conflict error"));
    }
    Ok(())
}

#[test]
fn rejects_unknown_client_type_and_zero_rate() -> AppResult<()> {
    if FleetArgs::try_parse_from(["fleetload", "worker", "--client-type", "rabbit"]).is_ok() {
        return Err(AppError::validation("Unknown client type accepted"));
    }
    if FleetArgs::try_parse_from(["fleetload", "run", "--request-rate", "0"]).is_ok() {
        return Err(AppError::validation("Zero request rate accepted"));
    }
    Ok(())
}

#[test]
fn duration_parsers_handle_units_and_zero() -> AppResult<()> {
    if parse_duration_arg("250ms")? != Duration::from_millis(250) {
        return Err(AppError::validation("Unexpected ms duration"));
    }
    if parse_duration_arg("2h")? != Duration::from_secs(7200) {
        return Err(AppError::validation("Unexpected hour duration"));
    }
    if parse_duration_arg("0s").is_ok() {
        return Err(AppError::validation("Zero duration accepted"));
    }
    if parse_duration_arg("5d").is_ok() {
        return Err(AppError::validation("Unknown unit accepted"));
    }
    if parse_offset_arg("0")? != Duration::ZERO {
        return Err(AppError::validation("Zero offset rejected"));
    }
    Ok(())
}
