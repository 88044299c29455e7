use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::LoadtestConfig;
use crate::error::{AppError, AppResult, FleetError, RpcError};
use crate::metrics::LatencyBuckets;
use crate::rpc::{CheckRequest, CheckResponse, MessageIdentifier, StartRequest, WorkerPort};

use super::client_type::ClientType;
use super::signal::{Completion, CompletionSignal};
use super::status::ClientStatus;
use super::tracker::MessageTracker;

/// Identity of one worker in the fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSpec {
    pub address: String,
    pub client_type: ClientType,
    /// Pull subscription name; defaults to `<topic>-subscription`.
    pub subscription: Option<String>,
}

/// Point-in-time copy of a client's cumulative state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub address: String,
    pub client_type: ClientType,
    pub status: ClientStatus,
    pub bucket_values: LatencyBuckets,
    pub running_duration: Option<Duration>,
    pub waste_millis: u64,
    pub connection_errors: u32,
    pub check_errors: u32,
}

/// Controller-side proxy for one remote worker.
///
/// Cloning is cheap; clones share the same state, signal and transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    address: String,
    client_type: ClientType,
    subscription: String,
    config: Arc<LoadtestConfig>,
    port: Arc<dyn WorkerPort>,
    state: Mutex<ClientState>,
    done: CompletionSignal,
    tracker: OnceLock<Arc<MessageTracker>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, Default)]
struct ClientState {
    status: ClientStatus,
    bucket_values: LatencyBuckets,
    connection_errors: u32,
    check_errors: u32,
    running_duration: Option<Duration>,
    waste_millis: u64,
    pending_duplicates: Vec<MessageIdentifier>,
}

impl ClientState {
    fn transition(&mut self, next: ClientStatus, address: &str) -> Result<(), FleetError> {
        if !self.status.can_transition_to(next) {
            return Err(FleetError::InvalidTransition {
                address: address.to_owned(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

impl Client {
    #[must_use]
    pub fn new(spec: ClientSpec, config: Arc<LoadtestConfig>, port: Arc<dyn WorkerPort>) -> Self {
        let subscription = spec
            .subscription
            .unwrap_or_else(|| format!("{}-subscription", spec.client_type.topic(&config)));
        Self {
            inner: Arc::new(ClientInner {
                address: spec.address,
                client_type: spec.client_type,
                subscription,
                config,
                port,
                state: Mutex::new(ClientState::default()),
                done: CompletionSignal::new(),
                tracker: OnceLock::new(),
                poller: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    #[must_use]
    pub fn client_type(&self) -> ClientType {
        self.inner.client_type
    }

    /// Current lifecycle status.
    ///
    /// # Errors
    ///
    /// Returns an error when the state lock is poisoned.
    pub fn status(&self) -> Result<ClientStatus, FleetError> {
        Ok(self.lock_state()?.status)
    }

    /// Copies the cumulative state under the client lock.
    ///
    /// # Errors
    ///
    /// Returns an error when the state lock is poisoned.
    pub fn snapshot(&self) -> Result<ClientSnapshot, FleetError> {
        let state = self.lock_state()?;
        Ok(ClientSnapshot {
            address: self.inner.address.clone(),
            client_type: self.inner.client_type,
            status: state.status,
            bucket_values: state.bucket_values,
            running_duration: state.running_duration,
            waste_millis: state.waste_millis,
            connection_errors: state.connection_errors,
            check_errors: state.check_errors,
        })
    }

    /// Resolves once the worker has stopped or failed.
    pub async fn wait(&self) -> Completion {
        self.inner.done.wait().await
    }

    /// The start request this client sends to its worker.
    #[must_use]
    pub fn start_request(&self) -> StartRequest {
        let config = &self.inner.config;
        let client_type = self.inner.client_type;
        StartRequest {
            project: config.project.clone(),
            topic: client_type.topic(config),
            request_rate: config.request_rate,
            message_size: config.message_size,
            max_outstanding_requests: config.max_outstanding_requests,
            start_time: config.start_time,
            stop_condition: config.stop_condition.clone(),
            broker_options: client_type.broker_options(config, &self.inner.subscription),
            burn_in_duration: config.burn_in_duration,
            publish_batch_size: config.publish_batch_size,
            publish_batch_duration: config.publish_batch_duration,
        }
    }

    /// Starts the remote worker, retrying transient failures with a fixed backoff.
    ///
    /// Resolves once the worker is running (health checks are then polled in the
    /// background) or once the retry budget is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the last RPC error when the start error count exceeds the
    /// threshold, or a fleet error when the client was already started.
    pub async fn start(&self, tracker: Arc<MessageTracker>) -> AppResult<()> {
        {
            let state = self.lock_state()?;
            if state.status != ClientStatus::None {
                return Err(AppError::fleet(FleetError::InvalidTransition {
                    address: self.inner.address.clone(),
                    from: state.status,
                    to: ClientStatus::Running,
                }));
            }
        }
        if self.inner.tracker.set(tracker).is_err() {
            debug!("Message tracker already attached to {}", self.inner.address);
        }

        let request = self.start_request();
        let timings = &self.inner.config.timings;
        loop {
            match self.inner.port.start(&request).await {
                Ok(_) => {
                    self.lock_state()?
                        .transition(ClientStatus::Running, &self.inner.address)?;
                    info!(
                        "Started {} worker at {}",
                        self.inner.client_type, self.inner.address
                    );
                    self.spawn_polling();
                    return Ok(());
                }
                Err(err) => {
                    let errors = {
                        let mut state = self.lock_state()?;
                        state.connection_errors = state.connection_errors.saturating_add(1);
                        state.connection_errors
                    };
                    if errors > timings.start_error_threshold {
                        error!(
                            "Giving up on {} after {} start errors: {}",
                            self.inner.address, errors, err
                        );
                        self.fail(err.clone())?;
                        return Err(AppError::rpc(err));
                    }
                    warn!(
                        "Start of {} failed ({} of {}), retrying in {:?}: {}",
                        self.inner.address,
                        errors,
                        timings.start_error_threshold,
                        timings.start_backoff,
                        err
                    );
                    tokio::time::sleep(timings.start_backoff).await;
                }
            }
        }
    }

    /// Runs one health check. A no-op unless the client is running.
    ///
    /// Transient failures are counted, not returned; the client fails once the
    /// consecutive error count exceeds the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error only for broken invariants: a poisoned lock, an illegal
    /// transition or a doubly resolved completion signal.
    pub async fn check_once(&self) -> Result<(), FleetError> {
        let duplicates = {
            let mut state = self.lock_state()?;
            if state.status != ClientStatus::Running {
                return Ok(());
            }
            std::mem::take(&mut state.pending_duplicates)
        };
        let request = CheckRequest { duplicates };
        let result = match self.inner.port.check(&request).await {
            Ok(response) => {
                LatencyBuckets::from_wire(&response.bucket_values).map(|buckets| (response, buckets))
            }
            Err(err) => Err(err),
        };
        match result {
            Ok((response, buckets)) => self.apply_check(&response, &buckets),
            Err(err) => self.record_check_error(request.duplicates, err),
        }
    }

    /// Cancels background health checks and fails the client unless it has
    /// already stopped or failed, so its waiters are released.
    ///
    /// # Errors
    ///
    /// Returns an error when the state lock is poisoned or the completion
    /// signal was already resolved.
    pub fn halt(&self) -> Result<(), FleetError> {
        self.abort_polling();
        let halted = {
            let mut state = self.lock_state()?;
            if state.status.is_terminal() {
                false
            } else {
                state.transition(ClientStatus::Failed, &self.inner.address)?;
                true
            }
        };
        if halted {
            warn!("{} halted by fleet shutdown", self.inner.address);
            return self.resolve(Err(RpcError::FleetShutdown));
        }
        Ok(())
    }

    fn abort_polling(&self) {
        let handle = match self.inner.poller.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn apply_check(&self, response: &CheckResponse, buckets: &LatencyBuckets) -> Result<(), FleetError> {
        let in_burn_in = self.inner.config.in_burn_in(Utc::now());
        let duplicates = self
            .inner
            .tracker
            .get()
            .map(|tracker| tracker.record_received(&response.received_messages))
            .unwrap_or_default();

        let finished = {
            let mut state = self.lock_state()?;
            if state.status != ClientStatus::Running {
                return Ok(());
            }
            state.check_errors = 0;
            // Zero means the load has not begun yet.
            if !response.running_duration.is_zero() {
                state.running_duration = Some(
                    state
                        .running_duration
                        .map_or(response.running_duration, |previous| {
                            previous.max(response.running_duration)
                        }),
                );
            }
            state.waste_millis = response.waste_millis;
            state.pending_duplicates.extend(duplicates);
            if !in_burn_in {
                state.bucket_values.merge(buckets);
            }
            if response.is_finished {
                state.transition(ClientStatus::Stopped, &self.inner.address)?;
            }
            response.is_finished
        };

        if in_burn_in && !buckets.is_empty() {
            debug!(
                "Discarded {} burn-in samples from {}",
                buckets.total(),
                self.inner.address
            );
        }
        if finished {
            info!(
                "{} worker at {} finished",
                self.inner.client_type, self.inner.address
            );
            self.resolve(Ok(()))?;
        }
        Ok(())
    }

    fn record_check_error(
        &self,
        duplicates: Vec<MessageIdentifier>,
        err: RpcError,
    ) -> Result<(), FleetError> {
        let threshold = self.inner.config.timings.check_error_threshold;
        let errors = {
            let mut state = self.lock_state()?;
            if state.status != ClientStatus::Running {
                return Ok(());
            }
            let mut restored = duplicates;
            restored.append(&mut state.pending_duplicates);
            state.pending_duplicates = restored;
            state.check_errors = state.check_errors.saturating_add(1);
            if state.check_errors > threshold {
                state.transition(ClientStatus::Failed, &self.inner.address)?;
            }
            state.check_errors
        };

        if errors > threshold {
            error!(
                "{} failed after {} consecutive check errors: {}",
                self.inner.address, errors, err
            );
            return self.resolve(Err(err));
        }
        warn!(
            "Check of {} failed ({} of {}): {}",
            self.inner.address, errors, threshold, err
        );
        Ok(())
    }

    fn fail(&self, err: RpcError) -> Result<(), FleetError> {
        self.lock_state()?
            .transition(ClientStatus::Failed, &self.inner.address)?;
        self.resolve(Err(err))
    }

    fn resolve(&self, outcome: Completion) -> Result<(), FleetError> {
        if self.inner.done.resolve(outcome) {
            Ok(())
        } else {
            Err(FleetError::SignalAlreadyResolved {
                address: self.inner.address.clone(),
            })
        }
    }

    fn spawn_polling(&self) {
        let client = self.clone();
        let period = self.inner.config.timings.check_interval;
        let handle = tokio::spawn(async move { client.poll_checks(period).await });
        match self.inner.poller.lock() {
            Ok(mut guard) => *guard = Some(handle),
            Err(poisoned) => *poisoned.into_inner() = Some(handle),
        }
    }

    async fn poll_checks(&self, period: Duration) {
        let first = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
        let mut ticker = tokio::time::interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.status() {
                Ok(ClientStatus::Running) => {}
                Ok(ClientStatus::None | ClientStatus::Stopped | ClientStatus::Failed) => break,
                Err(err) => {
                    error!("Stopping health checks for {}: {}", self.inner.address, err);
                    break;
                }
            }
            if let Err(err) = self.check_once().await {
                error!("Health check of {} aborted: {}", self.inner.address, err);
                break;
            }
        }
        debug!("Health checks for {} stopped", self.inner.address);
    }

    /// Poisons the state lock by unwinding while holding it.
    #[cfg(test)]
    pub(crate) fn poison_state(&self) {
        let inner = Arc::clone(&self.inner);
        let joined = std::thread::spawn(move || {
            let _guard = inner.state.lock();
            std::panic::resume_unwind(Box::new("poisoned client state"));
        })
        .join();
        if joined.is_ok() {
            debug!("State of {} was not poisoned", self.inner.address);
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ClientState>, FleetError> {
        match self.inner.state.lock() {
            Ok(guard) => Ok(guard),
            Err(_) => Err(FleetError::StatePoisoned {
                address: self.inner.address.clone(),
            }),
        }
    }
}
