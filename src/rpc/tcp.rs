use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::RpcError;

use super::io::{read_frame, write_frame};
use super::port::WorkerPort;
use super::types::{
    CheckRequest, CheckResponse, RpcRequest, RpcResponse, StartRequest, StartResponse,
};

/// [`WorkerPort`] that opens one TCP connection per call.
#[derive(Debug, Clone)]
pub struct TcpWorkerPort {
    address: String,
    call_timeout: Duration,
}

impl TcpWorkerPort {
    #[must_use]
    pub const fn new(address: String, call_timeout: Duration) -> Self {
        Self {
            address,
            call_timeout,
        }
    }

    async fn call(&self, call: &'static str, request: &RpcRequest) -> Result<RpcResponse, RpcError> {
        let exchange = async {
            let stream = TcpStream::connect(&self.address).await.map_err(|err| {
                RpcError::Connection {
                    addr: self.address.clone(),
                    source: Arc::new(err),
                }
            })?;
            let (read_half, mut write_half) = stream.into_split();
            write_frame(&mut write_half, request).await?;
            let mut reader = BufReader::new(read_half);
            read_frame::<_, RpcResponse>(&mut reader).await
        };
        let response = timeout(self.call_timeout, exchange)
            .await
            .map_err(|_elapsed| RpcError::Timeout {
                call,
                timeout_ms: u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX),
            })??;
        debug!("{} {} -> {}", self.address, call, response.kind());
        Ok(response)
    }
}

#[async_trait]
impl WorkerPort for TcpWorkerPort {
    async fn start(&self, request: &StartRequest) -> Result<StartResponse, RpcError> {
        let message = RpcRequest::Start(Box::new(request.clone()));
        match self.call("start", &message).await? {
            RpcResponse::Start(response) => Ok(response),
            RpcResponse::Error(error) => Err(RpcError::Remote {
                message: error.message,
            }),
            other @ RpcResponse::Check(_) => Err(RpcError::UnexpectedResponse {
                expected: "start",
                actual: other.kind(),
            }),
        }
    }

    async fn check(&self, request: &CheckRequest) -> Result<CheckResponse, RpcError> {
        let message = RpcRequest::Check(request.clone());
        match self.call("check", &message).await? {
            RpcResponse::Check(response) => Ok(*response),
            RpcResponse::Error(error) => Err(RpcError::Remote {
                message: error.message,
            }),
            other @ RpcResponse::Start(_) => Err(RpcError::UnexpectedResponse {
                expected: "check",
                actual: other.kind(),
            }),
        }
    }
}
