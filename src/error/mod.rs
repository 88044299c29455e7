mod app;
mod config;
mod fleet;
mod rpc;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use fleet::FleetError;
pub use rpc::RpcError;
pub use validation::ValidationError;
