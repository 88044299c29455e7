use thiserror::Error;

use crate::fleet::{ClientStatus, ClientType};

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Invalid status transition for client {address}: {from} -> {to}.")]
    InvalidTransition {
        address: String,
        from: ClientStatus,
        to: ClientStatus,
    },
    #[error("Completion signal for client {address} was already resolved.")]
    SignalAlreadyResolved { address: String },
    #[error("State lock for client {address} was poisoned.")]
    StatePoisoned { address: String },
    #[error("Fleet has no clients.")]
    EmptyFleet,
    #[error("Start task panicked or was cancelled: {source}")]
    StartTask {
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("Stats task for {client_type} panicked or was cancelled: {source}")]
    StatsTask {
        client_type: ClientType,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("Failed to spawn worker '{program}': {source}")]
    WorkerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Worker process has no stdout pipe.")]
    WorkerStdoutUnavailable,
    #[error("Worker exited before completing the handshake.")]
    HandshakeClosed,
    #[error("Timed out after {timeout_ms}ms waiting for worker handshake.")]
    HandshakeTimeout { timeout_ms: u64 },
    #[error("Invalid worker handshake '{line}': {source}")]
    HandshakeInvalid {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Worker already received a start request.")]
    WorkerAlreadyStarted,
    #[error("Run interrupted before all clients finished.")]
    Interrupted,
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
