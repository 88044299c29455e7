use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one published message, used for duplicate tracking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageIdentifier {
    pub publisher_client_id: i64,
    pub sequence_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    TestDuration(#[serde(with = "duration_ms")] Duration),
    NumberOfMessages(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PubsubOptions {
    pub subscription: String,
    pub max_messages_per_pull: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KafkaOptions {
    pub broker: String,
    #[serde(with = "duration_ms")]
    pub poll_duration: Duration,
    pub zookeeper_address: String,
    pub replication_factor: u32,
    pub partitions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrokerOptions {
    PubsubOptions(PubsubOptions),
    KafkaOptions(KafkaOptions),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartRequest {
    pub project: String,
    pub topic: String,
    pub request_rate: u32,
    pub message_size: u32,
    pub max_outstanding_requests: u32,
    pub start_time: DateTime<Utc>,
    pub stop_condition: StopCondition,
    #[serde(default)]
    pub broker_options: Option<BrokerOptions>,
    #[serde(with = "duration_ms")]
    pub burn_in_duration: Duration,
    pub publish_batch_size: u32,
    #[serde(with = "duration_ms")]
    pub publish_batch_duration: Duration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartResponse {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRequest {
    #[serde(default)]
    pub duplicates: Vec<MessageIdentifier>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResponse {
    pub bucket_values: Vec<i64>,
    #[serde(with = "duration_ms", default)]
    pub running_duration: Duration,
    pub is_finished: bool,
    #[serde(default)]
    pub received_messages: Vec<MessageIdentifier>,
    #[serde(default)]
    pub waste_millis: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorMessage {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RpcRequest {
    Start(Box<StartRequest>),
    Check(CheckRequest),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RpcResponse {
    Start(StartResponse),
    Check(Box<CheckResponse>),
    Error(ErrorMessage),
}

impl RpcResponse {
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            RpcResponse::Start(_) => "start",
            RpcResponse::Check(_) => "check",
            RpcResponse::Error(_) => "error",
        }
    }
}

/// Single line a freshly spawned worker prints before serving calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerReady {
    pub port: u16,
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
