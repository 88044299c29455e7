use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AppResult, FleetError, RpcError};
use crate::fleet::ClientType;
use crate::rpc::io::{read_frame, write_frame};
use crate::rpc::{
    CheckRequest, CheckResponse, ErrorMessage, RpcRequest, RpcResponse, StartRequest,
    StartResponse, WorkerReady,
};

use super::load::run_load;
use super::task::Task;

/// Control-channel server of a synthetic worker.
pub struct WorkerServer {
    listener: TcpListener,
    state: Arc<WorkerState>,
}

struct WorkerState {
    task: Arc<Task>,
    load: Mutex<Option<JoinHandle<()>>>,
    done: Notify,
}

impl WorkerServer {
    /// Binds the control channel.
    ///
    /// # Errors
    ///
    /// Returns an error when the address cannot be bound.
    pub async fn bind(addr: &str, client_type: ClientType, publisher_id: i64) -> Result<Self, FleetError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| FleetError::Bind {
                addr: addr.to_owned(),
                source: err,
            })?;
        Ok(Self {
            listener,
            state: Arc::new(WorkerState {
                task: Arc::new(Task::new(client_type, publisher_id)),
                load: Mutex::new(None),
                done: Notify::new(),
            }),
        })
    }

    /// # Errors
    ///
    /// Returns an error when the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, FleetError> {
        self.listener.local_addr().map_err(|err| FleetError::Io {
            context: "reading worker address",
            source: err,
        })
    }

    #[must_use]
    pub fn task(&self) -> Arc<Task> {
        Arc::clone(&self.state.task)
    }

    /// Writes the one-line bootstrap handshake announcing the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error when the handshake cannot be written.
    pub async fn announce<W>(&self, out: &mut W) -> AppResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let ready = WorkerReady {
            port: self.local_addr()?.port(),
        };
        let mut line = serde_json::to_vec(&ready)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }

    /// Serves start and check calls until the worker has reported completion.
    pub async fn serve(self) {
        info!(
            "{} worker listening on {}",
            self.state.task.client_type(),
            self.listener
                .local_addr()
                .map_or_else(|_| "unknown".to_owned(), |addr| addr.to_string())
        );
        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                () = self.state.done.notified() => break,
            };
            let (stream, peer) = match accepted {
                Ok(result) => result,
                Err(err) => {
                    warn!("Failed to accept controller connection: {}", err);
                    continue;
                }
            };
            debug!("Control connection from {}", peer);
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, &state).await {
                    warn!("Control connection from {} failed: {}", peer, err);
                }
            });
        }
        info!("Worker reported completion; shutting down");
    }
}

async fn handle_connection(stream: TcpStream, state: &WorkerState) -> Result<(), RpcError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let request: RpcRequest = read_frame(&mut reader).await?;
    let (response, finished) = match request {
        RpcRequest::Start(request) => (state.start(*request), false),
        RpcRequest::Check(request) => {
            let response = state.check(&request);
            let finished = response.is_finished;
            (RpcResponse::Check(Box::new(response)), finished)
        }
    };
    write_frame(&mut write_half, &response).await?;
    if finished {
        state.done.notify_one();
    }
    Ok(())
}

impl WorkerState {
    fn start(&self, request: StartRequest) -> RpcResponse {
        let mut load = match self.load.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if load.is_some() {
            return RpcResponse::Error(ErrorMessage {
                message: FleetError::WorkerAlreadyStarted.to_string(),
            });
        }
        info!(
            "Start received for topic {} at {} msg/s",
            request.topic, request.request_rate
        );
        *load = Some(tokio::spawn(run_load(Arc::clone(&self.task), request)));
        RpcResponse::Start(StartResponse {})
    }

    fn check(&self, request: &CheckRequest) -> CheckResponse {
        if !request.duplicates.is_empty() {
            self.task.note_duplicates(request.duplicates.len());
            debug!(
                "Controller reported {} duplicates ({} so far)",
                request.duplicates.len(),
                self.task.duplicates_reported()
            );
        }
        // Read the flag before flushing so the final deltas ship with it.
        let is_finished = self.task.is_finished();
        CheckResponse {
            bucket_values: self.task.flush_bucket_values().to_wire(),
            running_duration: self.task.running_duration(),
            is_finished,
            received_messages: self.task.drain_received(),
            waste_millis: self.task.waste_millis(),
        }
    }
}
