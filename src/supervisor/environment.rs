use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::fleet::EnvironmentPort;

use super::process::WorkerSupervisor;

/// Fleet environment backed by locally supervised worker processes.
pub struct LocalEnvironment {
    supervisor: Arc<WorkerSupervisor>,
}

impl LocalEnvironment {
    #[must_use]
    pub const fn new(supervisor: Arc<WorkerSupervisor>) -> Self {
        Self { supervisor }
    }
}

#[async_trait]
impl EnvironmentPort for LocalEnvironment {
    async fn shutdown(&self, cause: Option<&AppError>) -> AppResult<()> {
        if let Some(err) = cause {
            warn!("Stopping local workers after failure: {}", err);
        }
        let killed = self.supervisor.shutdown_all().await;
        info!("Local workers stopped ({} still running were killed)", killed);
        Ok(())
    }
}
