use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::rpc::StopCondition;

pub const DEFAULT_TOPIC_PREFIX: &str = "loadtest-";
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_START_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_START_ERROR_THRESHOLD: u32 = 10;
pub const DEFAULT_CHECK_ERROR_THRESHOLD: u32 = 3;
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_MESSAGES_PER_PULL: u32 = 10;
pub const DEFAULT_KAFKA_POLL_DURATION: Duration = Duration::from_millis(100);

/// Retry and polling policy shared by every client of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTimings {
    /// Period of the health-check tick once a client is running.
    pub check_interval: Duration,
    /// Pause between failed start attempts.
    pub start_backoff: Duration,
    /// A client fails once its start error count exceeds this value.
    pub start_error_threshold: u32,
    /// A client fails once its consecutive check error count exceeds this value.
    pub check_error_threshold: u32,
    /// Upper bound on a single start or check call.
    pub rpc_timeout: Duration,
}

impl Default for ClientTimings {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            start_backoff: DEFAULT_START_BACKOFF,
            start_error_threshold: DEFAULT_START_ERROR_THRESHOLD,
            check_error_threshold: DEFAULT_CHECK_ERROR_THRESHOLD,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubsubSettings {
    pub max_messages_per_pull: u32,
}

impl Default for PubsubSettings {
    fn default() -> Self {
        Self {
            max_messages_per_pull: DEFAULT_MAX_MESSAGES_PER_PULL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSettings {
    pub broker: String,
    pub poll_duration: Duration,
    pub zookeeper_address: String,
    pub replication_factor: u32,
    pub partitions: u32,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            broker: "localhost:9092".to_owned(),
            poll_duration: DEFAULT_KAFKA_POLL_DURATION,
            zookeeper_address: "localhost:2181".to_owned(),
            replication_factor: 2,
            partitions: 100,
        }
    }
}

/// Immutable parameters of one load test run, shared by the controller and
/// every client it creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadtestConfig {
    pub project: String,
    pub topic_prefix: String,
    pub request_rate: u32,
    pub message_size: u32,
    pub max_outstanding_requests: u32,
    pub start_time: DateTime<Utc>,
    pub stop_condition: StopCondition,
    pub burn_in_duration: Duration,
    pub publish_batch_size: u32,
    pub publish_batch_duration: Duration,
    pub pubsub: PubsubSettings,
    pub kafka: KafkaSettings,
    pub timings: ClientTimings,
}

impl Default for LoadtestConfig {
    fn default() -> Self {
        Self {
            project: "loadtest".to_owned(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_owned(),
            request_rate: 1,
            message_size: 100,
            max_outstanding_requests: 10,
            start_time: Utc::now(),
            stop_condition: StopCondition::TestDuration(Duration::from_secs(60)),
            burn_in_duration: Duration::ZERO,
            publish_batch_size: 1,
            publish_batch_duration: Duration::ZERO,
            pubsub: PubsubSettings::default(),
            kafka: KafkaSettings::default(),
            timings: ClientTimings::default(),
        }
    }
}

impl LoadtestConfig {
    /// Instant at which check results start counting toward statistics.
    #[must_use]
    pub fn burn_in_deadline(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.burn_in_duration)
            .ok()
            .and_then(|delta| self.start_time.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    #[must_use]
    pub fn in_burn_in(&self, now: DateTime<Utc>) -> bool {
        now < self.burn_in_deadline()
    }

    /// Whole seconds elapsed since the configured start time, clamped at zero.
    #[must_use]
    pub fn seconds_since_start(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from(now.signed_duration_since(self.start_time).num_seconds()).unwrap_or(0)
    }
}
