use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::LoadtestConfig;
use crate::error::ValidationError;
use crate::rpc::{BrokerOptions, KafkaOptions, PubsubOptions};

/// Broker family and role a worker plays in the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientType {
    PubsubPublisher,
    PubsubSubscriber,
    KafkaPublisher,
    KafkaSubscriber,
}

type OptionsBuilder = fn(&LoadtestConfig, &str) -> Option<BrokerOptions>;

struct ClientTypeProfile {
    name: &'static str,
    topic_suffix: &'static str,
    publisher: bool,
    options: OptionsBuilder,
}

const PUBSUB_PUBLISHER: ClientTypeProfile = ClientTypeProfile {
    name: "pubsub-publisher",
    topic_suffix: "pubsub",
    publisher: true,
    options: no_options,
};

const PUBSUB_SUBSCRIBER: ClientTypeProfile = ClientTypeProfile {
    name: "pubsub-subscriber",
    topic_suffix: "pubsub",
    publisher: false,
    options: pubsub_options,
};

const KAFKA_PUBLISHER: ClientTypeProfile = ClientTypeProfile {
    name: "kafka-publisher",
    topic_suffix: "kafka",
    publisher: true,
    options: kafka_options,
};

const KAFKA_SUBSCRIBER: ClientTypeProfile = ClientTypeProfile {
    name: "kafka-subscriber",
    topic_suffix: "kafka",
    publisher: false,
    options: kafka_options,
};

impl ClientType {
    pub const ALL: [ClientType; 4] = [
        ClientType::PubsubPublisher,
        ClientType::PubsubSubscriber,
        ClientType::KafkaPublisher,
        ClientType::KafkaSubscriber,
    ];

    const fn profile(self) -> &'static ClientTypeProfile {
        match self {
            ClientType::PubsubPublisher => &PUBSUB_PUBLISHER,
            ClientType::PubsubSubscriber => &PUBSUB_SUBSCRIBER,
            ClientType::KafkaPublisher => &KAFKA_PUBLISHER,
            ClientType::KafkaSubscriber => &KAFKA_SUBSCRIBER,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.profile().name
    }

    #[must_use]
    pub const fn topic_suffix(self) -> &'static str {
        self.profile().topic_suffix
    }

    #[must_use]
    pub const fn is_publisher(self) -> bool {
        self.profile().publisher
    }

    /// Full topic name for this type under the run's prefix.
    #[must_use]
    pub fn topic(self, config: &LoadtestConfig) -> String {
        format!("{}{}", config.topic_prefix, self.topic_suffix())
    }

    /// Broker-specific start options; `subscription` only matters to pull subscribers.
    #[must_use]
    pub fn broker_options(self, config: &LoadtestConfig, subscription: &str) -> Option<BrokerOptions> {
        (self.profile().options)(config, subscription)
    }
}

const fn no_options(_config: &LoadtestConfig, _subscription: &str) -> Option<BrokerOptions> {
    None
}

fn pubsub_options(config: &LoadtestConfig, subscription: &str) -> Option<BrokerOptions> {
    Some(BrokerOptions::PubsubOptions(PubsubOptions {
        subscription: subscription.to_owned(),
        max_messages_per_pull: config.pubsub.max_messages_per_pull,
    }))
}

fn kafka_options(config: &LoadtestConfig, _subscription: &str) -> Option<BrokerOptions> {
    Some(BrokerOptions::KafkaOptions(KafkaOptions {
        broker: config.kafka.broker.clone(),
        poll_duration: config.kafka.poll_duration,
        zookeeper_address: config.kafka.zookeeper_address.clone(),
        replication_factor: config.kafka.replication_factor,
        partitions: config.kafka.partitions,
    }))
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClientType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        ClientType::ALL
            .into_iter()
            .find(|client_type| client_type.name() == normalized)
            .ok_or_else(|| ValidationError::InvalidClientType {
                value: value.to_owned(),
            })
    }
}
