use std::time::Duration;

use serde::Deserialize;

use crate::error::ValidationError;
use crate::fleet::ClientType;

/// On-disk fleet configuration, read from `fleetload.toml` or `fleetload.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub project: Option<String>,
    pub topic_prefix: Option<String>,
    pub request_rate: Option<u32>,
    pub message_size: Option<u32>,
    pub max_outstanding_requests: Option<u32>,
    /// Delay between building the config and the shared start instant.
    pub start_delay: Option<DurationValue>,
    pub test_duration: Option<DurationValue>,
    pub number_of_messages: Option<u32>,
    pub burn_in_duration: Option<DurationValue>,
    pub publish_batch_size: Option<u32>,
    pub publish_batch_duration: Option<DurationValue>,
    pub stats_interval: Option<DurationValue>,
    pub handshake_timeout: Option<DurationValue>,
    pub pubsub: Option<PubsubSection>,
    pub kafka: Option<KafkaSection>,
    pub timings: Option<TimingsSection>,
    #[serde(default)]
    pub clients: Vec<ClientEntry>,
    #[serde(default)]
    pub local_workers: Vec<LocalWorkerEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PubsubSection {
    pub max_messages_per_pull: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KafkaSection {
    pub broker: Option<String>,
    pub poll_duration: Option<DurationValue>,
    pub zookeeper_address: Option<String>,
    pub replication_factor: Option<u32>,
    pub partitions: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingsSection {
    pub check_interval: Option<DurationValue>,
    pub start_backoff: Option<DurationValue>,
    pub start_error_threshold: Option<u32>,
    pub check_error_threshold: Option<u32>,
    pub rpc_timeout: Option<DurationValue>,
}

/// A pre-provisioned worker reachable at `address`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientEntry {
    pub address: String,
    #[serde(rename = "type")]
    pub client_type: String,
    pub subscription: Option<String>,
}

/// Workers spawned on this host by the supervisor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalWorkerEntry {
    #[serde(rename = "type")]
    pub client_type: String,
    #[serde(default = "default_worker_count")]
    pub count: usize,
}

const fn default_worker_count() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => super::parse_duration_value(text),
        }
    }

    /// Like [`Self::to_duration`] but accepts zero, for offsets such as burn-in.
    pub(crate) fn to_offset(&self) -> Result<Duration, ValidationError> {
        match self.to_duration() {
            Err(ValidationError::DurationZero) => Ok(Duration::ZERO),
            other => other,
        }
    }
}

/// Fleet membership after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalWorkerSpec {
    pub client_type: ClientType,
    pub count: usize,
}
