use std::sync::Arc;

use thiserror::Error;

/// Transport-level failure of a start or check call.
///
/// Cloneable so one failure can be handed to every waiter on a client's
/// completion signal.
#[derive(Debug, Error, Clone)]
pub enum RpcError {
    #[error("Connection error to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("Connection closed.")]
    ConnectionClosed,
    #[error("Timed out after {timeout_ms}ms waiting for {call} response.")]
    Timeout { call: &'static str, timeout_ms: u64 },
    #[error("Wire message exceeded max size ({max_bytes} bytes).")]
    MessageTooLarge { max_bytes: usize },
    #[error("Wire message was not valid UTF-8: {source}")]
    InvalidUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("Serialization error during {context}: {source}")]
    Serialize {
        context: &'static str,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("Deserialization error during {context}: {source}")]
    Deserialize {
        context: &'static str,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("Expected {expected} response, got {actual}.")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },
    #[error("Remote error: {message}")]
    Remote { message: String },
    #[error("Fleet shut down before the client finished.")]
    FleetShutdown,
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

impl RpcError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io {
            context,
            source: Arc::new(source),
        }
    }

    pub(crate) fn serialize(context: &'static str, source: serde_json::Error) -> Self {
        Self::Serialize {
            context,
            source: Arc::new(source),
        }
    }

    pub(crate) fn deserialize(context: &'static str, source: serde_json::Error) -> Self {
        Self::Deserialize {
            context,
            source: Arc::new(source),
        }
    }
}
