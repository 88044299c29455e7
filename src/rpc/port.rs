use async_trait::async_trait;

use crate::error::RpcError;

use super::types::{CheckRequest, CheckResponse, StartRequest, StartResponse};

/// Start/check surface of one remote worker.
///
/// Every call is independent; a failed call may simply be issued again.
#[async_trait]
pub trait WorkerPort: Send + Sync {
    async fn start(&self, request: &StartRequest) -> Result<StartResponse, RpcError>;

    async fn check(&self, request: &CheckRequest) -> Result<CheckResponse, RpcError>;
}
