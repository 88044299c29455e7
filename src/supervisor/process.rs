use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::LocalWorkerSpec;
use crate::error::{AppError, AppResult, FleetError};
use crate::fleet::{ClientSpec, ClientType};
use crate::rpc::WorkerReady;

struct SupervisedWorker {
    address: String,
    client_type: ClientType,
    child: Child,
}

/// Spawns synthetic workers as child processes of this binary.
pub struct WorkerSupervisor {
    program: PathBuf,
    handshake_timeout: Duration,
    verbose: bool,
    children: Mutex<Vec<SupervisedWorker>>,
}

impl WorkerSupervisor {
    #[must_use]
    pub const fn new(program: PathBuf, handshake_timeout: Duration, verbose: bool) -> Self {
        Self {
            program,
            handshake_timeout,
            verbose,
            children: Mutex::new(Vec::new()),
        }
    }

    /// Supervisor that re-executes the running binary.
    ///
    /// # Errors
    ///
    /// Returns an error when the current executable cannot be resolved.
    pub fn for_current_exe(handshake_timeout: Duration, verbose: bool) -> AppResult<Self> {
        let program = std::env::current_exe()?;
        Ok(Self::new(program, handshake_timeout, verbose))
    }

    /// Spawns one worker and waits for its handshake.
    ///
    /// # Errors
    ///
    /// Returns an error when the process cannot be spawned or does not
    /// announce its port within the handshake timeout.
    pub async fn spawn_worker(&self, client_type: ClientType) -> AppResult<String> {
        let mut command = Command::new(&self.program);
        command
            .arg("worker")
            .arg("--client-type")
            .arg(client_type.name())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if self.verbose {
            command.arg("--verbose");
        }
        debug!("Spawning {} {} worker", self.program.display(), client_type);
        let mut child = command.spawn().map_err(|err| {
            AppError::fleet(FleetError::WorkerSpawn {
                program: self.program.display().to_string(),
                source: err,
            })
        })?;
        let Some(stdout) = child.stdout.take() else {
            kill_quietly(&mut child).await;
            return Err(AppError::fleet(FleetError::WorkerStdoutUnavailable));
        };

        let port = match tokio::time::timeout(self.handshake_timeout, read_handshake(stdout)).await {
            Ok(Ok(port)) => port,
            Ok(Err(err)) => {
                kill_quietly(&mut child).await;
                return Err(AppError::fleet(err));
            }
            Err(_) => {
                kill_quietly(&mut child).await;
                return Err(AppError::fleet(FleetError::HandshakeTimeout {
                    timeout_ms: u64::try_from(self.handshake_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                }));
            }
        };

        let address = format!("127.0.0.1:{}", port);
        info!("Spawned {} worker at {}", client_type, address);
        let worker = SupervisedWorker {
            address: address.clone(),
            client_type,
            child,
        };
        match self.children.lock() {
            Ok(mut children) => children.push(worker),
            Err(poisoned) => poisoned.into_inner().push(worker),
        }
        Ok(address)
    }

    /// Spawns every requested local worker, in order, and returns their specs.
    ///
    /// # Errors
    ///
    /// Returns the first spawn failure; workers spawned before it keep running
    /// until [`Self::shutdown_all`].
    pub async fn spawn_all(&self, workers: &[LocalWorkerSpec]) -> AppResult<Vec<ClientSpec>> {
        let mut specs = Vec::new();
        for entry in workers {
            for _ in 0..entry.count {
                let address = self.spawn_worker(entry.client_type).await?;
                specs.push(ClientSpec {
                    address,
                    client_type: entry.client_type,
                    subscription: None,
                });
            }
        }
        Ok(specs)
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        match self.children.lock() {
            Ok(children) => children.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Kills every supervised worker that is still running. Returns how many
    /// had to be killed.
    pub async fn shutdown_all(&self) -> usize {
        let workers = match self.children.lock() {
            Ok(mut children) => std::mem::take(&mut *children),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let mut killed = 0usize;
        for mut worker in workers {
            match worker.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(
                        "{} worker at {} already exited with {}",
                        worker.client_type, worker.address, status
                    );
                }
                Ok(None) => {
                    kill_quietly(&mut worker.child).await;
                    killed = killed.saturating_add(1);
                }
                Err(err) => {
                    warn!("Failed to poll worker at {}: {}", worker.address, err);
                    kill_quietly(&mut worker.child).await;
                    killed = killed.saturating_add(1);
                }
            }
        }
        killed
    }
}

async fn kill_quietly(child: &mut Child) {
    if let Err(err) = child.kill().await {
        warn!("Failed to kill worker process: {}", err);
    }
}

/// Reads the single `{"port":N}` line a worker prints once it is serving.
pub(crate) async fn read_handshake<R>(stdout: R) -> Result<u16, FleetError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|err| FleetError::Io {
            context: "reading worker handshake",
            source: err,
        })?;
    if read == 0 {
        return Err(FleetError::HandshakeClosed);
    }
    let trimmed = line.trim();
    serde_json::from_str::<WorkerReady>(trimmed)
        .map(|ready| ready.port)
        .map_err(|err| FleetError::HandshakeInvalid {
            line: trimmed.to_owned(),
            source: err,
        })
}
