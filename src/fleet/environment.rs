use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Owner of the worker processes or machines behind the fleet.
#[async_trait]
pub trait EnvironmentPort: Send + Sync {
    /// Tears the fleet down. `cause` is set when a fatal error triggered it.
    async fn shutdown(&self, cause: Option<&AppError>) -> AppResult<()>;
}

/// Workers provisioned elsewhere; shutting down only records why.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEnvironment;

#[async_trait]
impl EnvironmentPort for StaticEnvironment {
    async fn shutdown(&self, cause: Option<&AppError>) -> AppResult<()> {
        match cause {
            Some(err) => warn!("Fleet shutdown requested after failure: {}", err),
            None => info!("Fleet shutdown requested"),
        }
        Ok(())
    }
}
