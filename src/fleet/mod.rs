//! Fleet controller: per-worker clients, their lifecycle, and aggregation.
mod client;
mod client_type;
mod controller;
mod environment;
mod signal;
mod status;
mod tracker;


pub use client::{Client, ClientSnapshot, ClientSpec};
pub use client_type::ClientType;
pub use controller::{Controller, FleetProgress};
pub use environment::{EnvironmentPort, StaticEnvironment};
pub use signal::{Completion, CompletionSignal};
pub use status::ClientStatus;
pub use tracker::MessageTracker;
