mod support_fleet;

use std::fs;

use serde_json::Value;
use tempfile::tempdir;

use support_fleet::{describe, run_fleetload, write_config};

const LOCAL_FLEET: &str = r#"
project = "e2e"
request_rate = 200
message_size = 64
start_delay = "0s"
test_duration = "2s"
stats_interval = "1s"
publish_batch_size = 10

[timings]
check_interval = "200ms"
start_backoff = "100ms"
rpc_timeout = "5s"

[[local_workers]]
type = "pubsub-publisher"
count = 2

[[local_workers]]
type = "kafka-subscriber"
"#;

#[test]
fn e2e_local_fleet_runs_to_completion() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let config_path = dir.path().join("fleetload.toml");
    let summary_path = dir.path().join("summary.json");
    write_config(&config_path, LOCAL_FLEET)?;

    let output = run_fleetload([
        "run".to_owned(),
        "--config".to_owned(),
        config_path.to_string_lossy().into_owned(),
        "--summary-json".to_owned(),
        summary_path.to_string_lossy().into_owned(),
    ])?;
    if !output.status.success() {
        return Err(describe(&output));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("Fleet summary") {
        return Err(format!("Missing summary header.\n{}", describe(&output)));
    }

    let raw = fs::read_to_string(&summary_path)
        .map_err(|err| format!("read summary failed: {}", err))?;
    let summary: Value =
        serde_json::from_str(&raw).map_err(|err| format!("parse summary failed: {}", err))?;

    let stopped = summary
        .pointer("/clients/stopped")
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("Missing stopped count: {}", raw))?;
    if stopped != 3 {
        return Err(format!("Expected 3 stopped clients, got {}: {}", stopped, raw));
    }
    let failed = summary
        .pointer("/clients/failed")
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("Missing failed count: {}", raw))?;
    if failed != 0 {
        return Err(format!("Expected no failed clients, got {}", failed));
    }

    for client_type in ["pubsub-publisher", "kafka-subscriber"] {
        let messages = summary
            .pointer(&format!("/types/{}/total_messages", client_type))
            .and_then(Value::as_u64)
            .ok_or_else(|| format!("Missing stats for {}: {}", client_type, raw))?;
        if messages == 0 {
            return Err(format!("Expected messages for {}: {}", client_type, raw));
        }
    }
    if summary.pointer("/types/pubsub-subscriber").is_some() {
        return Err(format!("Absent client type should be omitted: {}", raw));
    }
    Ok(())
}

#[test]
fn e2e_missing_config_fails() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let missing = dir.path().join("absent.toml");

    let output = run_fleetload([
        "run".to_owned(),
        "--config".to_owned(),
        missing.to_string_lossy().into_owned(),
    ])?;
    if output.status.success() {
        return Err(format!("Expected failure.\n{}", describe(&output)));
    }
    Ok(())
}

#[test]
fn e2e_unknown_client_type_fails() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let config_path = dir.path().join("fleetload.toml");
    write_config(
        &config_path,
        r#"
test_duration = "1s"

[[clients]]
address = "127.0.0.1:9"
type = "carrier-pigeon"
"#,
    )?;

    let output = run_fleetload([
        "run".to_owned(),
        "--config".to_owned(),
        config_path.to_string_lossy().into_owned(),
    ])?;
    if output.status.success() {
        return Err(format!("Expected failure.\n{}", describe(&output)));
    }
    Ok(())
}
