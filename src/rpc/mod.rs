//! Controller/worker RPC contract: wire types, framing, and the worker port.
pub(crate) mod io;
mod port;
mod tcp;
mod types;

#[cfg(test)]
mod tests;

pub use port::WorkerPort;
pub use tcp::TcpWorkerPort;
pub use types::{
    BrokerOptions, CheckRequest, CheckResponse, ErrorMessage, KafkaOptions, MessageIdentifier,
    PubsubOptions, RpcRequest, RpcResponse, StartRequest, StartResponse, StopCondition,
    WorkerReady,
};
