use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::AppResult;
use crate::fleet::{ClientType, FleetProgress, MessageTracker};
use crate::metrics::{LoadtestStats, StatsSummary};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FleetReport {
    pub(crate) types: BTreeMap<ClientType, StatsSummary>,
    pub(crate) clients: FleetProgress,
    pub(crate) received_messages: u64,
    pub(crate) duplicate_messages: u64,
}

impl FleetReport {
    pub(crate) fn new(
        stats: &BTreeMap<ClientType, LoadtestStats>,
        clients: FleetProgress,
        tracker: &MessageTracker,
    ) -> Self {
        Self {
            types: stats
                .iter()
                .map(|(client_type, stats)| (*client_type, stats.summary()))
                .collect(),
            clients,
            received_messages: tracker.received_count(),
            duplicate_messages: tracker.duplicate_count(),
        }
    }
}

pub(crate) fn log_interim(stats: &BTreeMap<ClientType, LoadtestStats>, progress: FleetProgress) {
    info!(
        "Clients: {} running, {} stopped, {} failed, {} pending",
        progress.running, progress.stopped, progress.failed, progress.pending
    );
    for (client_type, stats) in stats {
        info!(
            "{}: {} messages in {}s ({} msg/s), p99 {}",
            client_type,
            stats.total_messages(),
            stats.running_seconds,
            stats.messages_per_second(),
            format_latency(stats.bucket_values.percentile_ms(990))
        );
    }
}

pub(crate) fn print_report(report: &FleetReport) {
    println!("Fleet summary");
    println!(
        "  clients: {} total, {} stopped, {} failed, {} running, {} pending",
        report.clients.total(),
        report.clients.stopped,
        report.clients.failed,
        report.clients.running,
        report.clients.pending
    );
    for (client_type, summary) in &report.types {
        println!("  {}", client_type);
        println!(
            "    messages: {} over {}s ({} msg/s)",
            summary.total_messages, summary.running_seconds, summary.messages_per_second
        );
        println!(
            "    latency: p50 {} | p90 {} | p99 {} | p99.9 {}",
            format_latency(summary.p50_latency_ms),
            format_latency(summary.p90_latency_ms),
            format_latency(summary.p99_latency_ms),
            format_latency(summary.p999_latency_ms)
        );
        println!("    waste: {}ms", summary.waste_millis);
    }
    if report.received_messages > 0 {
        println!(
            "  received: {} ({} duplicates)",
            report.received_messages, report.duplicate_messages
        );
    }
}

pub(crate) async fn write_report(path: &Path, report: &FleetReport) -> AppResult<()> {
    let mut content = serde_json::to_vec_pretty(report)?;
    content.push(b'\n');
    tokio::fs::write(path, content).await?;
    info!("Wrote summary to {}", path.display());
    Ok(())
}

fn format_latency(value: Option<u64>) -> String {
    value.map_or_else(|| "n/a".to_owned(), |ms| format!("<={}ms", ms))
}
