use serde::Serialize;

use super::buckets::LatencyBuckets;

/// Statistics aggregated across every client of one type at query time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadtestStats {
    pub running_seconds: u64,
    pub bucket_values: LatencyBuckets,
    pub waste_millis: u64,
}

/// Flattened view of [`LoadtestStats`] used for summaries and JSON output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatsSummary {
    pub running_seconds: u64,
    pub total_messages: u64,
    pub messages_per_second: u64,
    pub waste_millis: u64,
    pub p50_latency_ms: Option<u64>,
    pub p90_latency_ms: Option<u64>,
    pub p99_latency_ms: Option<u64>,
    pub p999_latency_ms: Option<u64>,
    pub bucket_values: Vec<u64>,
}

impl LoadtestStats {
    #[must_use]
    pub fn total_messages(&self) -> u64 {
        self.bucket_values.total()
    }

    #[must_use]
    pub fn messages_per_second(&self) -> u64 {
        self.total_messages()
            .checked_div(self.running_seconds)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            running_seconds: self.running_seconds,
            total_messages: self.total_messages(),
            messages_per_second: self.messages_per_second(),
            waste_millis: self.waste_millis,
            p50_latency_ms: self.bucket_values.percentile_ms(500),
            p90_latency_ms: self.bucket_values.percentile_ms(900),
            p99_latency_ms: self.bucket_values.percentile_ms(990),
            p999_latency_ms: self.bucket_values.percentile_ms(999),
            bucket_values: self.bucket_values.values().to_vec(),
        }
    }
}
