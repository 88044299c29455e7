//! Configuration loading and the immutable run parameters.
mod build;
mod loader;
mod parse;
mod settings;
pub mod types;


pub use build::{
    DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_START_DELAY, DEFAULT_STATS_INTERVAL, FleetPlan, build_plan,
};
pub use loader::load_config;
pub use settings::{ClientTimings, KafkaSettings, LoadtestConfig, PubsubSettings};
pub use types::LocalWorkerSpec;

#[cfg(test)]
pub(crate) use loader::load_config_file;
pub(crate) use parse::parse_duration_value;
