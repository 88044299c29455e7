//! Latency bucket histograms and aggregated load test statistics.
mod buckets;
mod stats;

#[cfg(test)]
mod tests;

pub use buckets::{LATENCY_BUCKET_BOUNDS_MS, LATENCY_BUCKET_COUNT, LatencyBuckets};
pub use stats::{LoadtestStats, StatsSummary};
