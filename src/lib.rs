//! Core library for the `fleetload` CLI.
//!
//! `fleetload run` drives a synthetic pub/sub load test across a fleet of
//! worker processes: it starts every worker in parallel with bounded retries,
//! polls their health, folds their latency histograms into per-type
//! statistics, and detects overall completion. `fleetload worker` is the
//! synthetic worker those runs talk to.
pub mod args;
pub mod config;
pub mod error;
pub mod fleet;
pub mod metrics;
pub mod rpc;
pub mod supervisor;
pub mod worker;

mod app;
mod entry;
mod logger;

pub use entry::run;
