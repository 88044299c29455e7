use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::LoadtestConfig;
use crate::error::{AppError, AppResult, FleetError};
use crate::metrics::LoadtestStats;
use crate::rpc::WorkerPort;

use super::client::{Client, ClientSpec};
use super::client_type::ClientType;
use super::environment::EnvironmentPort;
use super::status::ClientStatus;
use super::tracker::MessageTracker;

/// Client counts per lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetProgress {
    pub pending: usize,
    pub running: usize,
    pub stopped: usize,
    pub failed: usize,
}

impl FleetProgress {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending
            .saturating_add(self.running)
            .saturating_add(self.stopped)
            .saturating_add(self.failed)
    }
}

/// Fleet coordinator: starts every client, waits on them and folds their
/// state into per-type statistics.
pub struct Controller {
    clients: Vec<Client>,
    config: Arc<LoadtestConfig>,
    environment: Arc<dyn EnvironmentPort>,
}

impl Controller {
    #[must_use]
    pub fn new(
        config: Arc<LoadtestConfig>,
        clients: Vec<Client>,
        environment: Arc<dyn EnvironmentPort>,
    ) -> Self {
        Self {
            clients,
            config,
            environment,
        }
    }

    /// Builds one client per spec, asking `connect` for each worker's transport.
    #[must_use]
    pub fn from_specs<F>(
        config: LoadtestConfig,
        specs: Vec<ClientSpec>,
        mut connect: F,
        environment: Arc<dyn EnvironmentPort>,
    ) -> Self
    where
        F: FnMut(&ClientSpec) -> Arc<dyn WorkerPort>,
    {
        let config = Arc::new(config);
        let clients = specs
            .into_iter()
            .map(|spec| {
                let port = connect(&spec);
                Client::new(spec, Arc::clone(&config), port)
            })
            .collect();
        Self::new(config, clients, environment)
    }

    #[must_use]
    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    #[must_use]
    pub fn config(&self) -> &LoadtestConfig {
        &self.config
    }

    /// Starts every client in parallel and waits until each is running or
    /// has given up.
    ///
    /// # Errors
    ///
    /// Returns the first fatal start error after shutting the fleet down.
    pub async fn start_clients(&self, tracker: Arc<MessageTracker>) -> AppResult<()> {
        if self.clients.is_empty() {
            return Err(AppError::fleet(FleetError::EmptyFleet));
        }
        info!("Starting {} clients", self.clients.len());

        let mut tasks = JoinSet::new();
        for client in &self.clients {
            let client = client.clone();
            let tracker = Arc::clone(&tracker);
            tasks.spawn(async move { client.start(tracker).await });
        }

        let mut first_error: Option<AppError> = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => Err(AppError::fleet(FleetError::StartTask { source: err })),
            };
            if let Err(err) = outcome {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    debug!("Additional start failure: {}", err);
                }
            }
        }

        if let Some(err) = first_error {
            error!("Fleet start failed: {}", err);
            if let Err(shutdown_err) = self.shutdown(Some(&err)).await {
                error!("Fleet shutdown failed: {}", shutdown_err);
            }
            return Err(err);
        }
        info!("All {} clients running", self.clients.len());
        Ok(())
    }

    /// Waits for every client to stop, or for the first one to fail.
    ///
    /// # Errors
    ///
    /// Returns the RPC error of the first client to fail.
    pub async fn wait_for_clients(&self) -> AppResult<()> {
        wait_all(self.clients.iter()).await
    }

    /// Waits for every publisher client to stop, or for the first one to fail.
    ///
    /// # Errors
    ///
    /// Returns the RPC error of the first publisher to fail.
    pub async fn wait_for_publisher_clients(&self) -> AppResult<()> {
        wait_all(
            self.clients
                .iter()
                .filter(|client| client.client_type().is_publisher()),
        )
        .await
    }

    /// Aggregated statistics for one client type; `None` when the fleet has no
    /// client of that type.
    ///
    /// # Errors
    ///
    /// Returns an error when a client's state lock is poisoned.
    pub fn stats_for_type(&self, client_type: ClientType) -> AppResult<Option<LoadtestStats>> {
        aggregate_type(&self.clients, client_type, &self.config, Utc::now()).map_err(AppError::from)
    }

    /// Statistics for every client type present in the fleet, computed
    /// concurrently. Types that fail to aggregate are logged and left out.
    pub async fn stats_for_all_types(&self) -> BTreeMap<ClientType, LoadtestStats> {
        let now = Utc::now();
        let mut tasks = Vec::with_capacity(ClientType::ALL.len());
        for client_type in ClientType::ALL {
            let clients: Vec<Client> = self
                .clients
                .iter()
                .filter(|client| client.client_type() == client_type)
                .cloned()
                .collect();
            if clients.is_empty() {
                continue;
            }
            let config = Arc::clone(&self.config);
            let handle = tokio::spawn(async move {
                aggregate_type(&clients, client_type, &config, now)
            });
            tasks.push((client_type, handle));
        }

        let mut result = BTreeMap::new();
        for (client_type, handle) in tasks {
            match handle.await {
                Ok(Ok(Some(stats))) => {
                    result.insert(client_type, stats);
                }
                Ok(Ok(None)) => {}
                Ok(Err(err)) => warn!("Omitting {} stats: {}", client_type, err),
                Err(err) => warn!(
                    "Omitting {} stats: {}",
                    client_type,
                    FleetError::StatsTask {
                        client_type,
                        source: err,
                    }
                ),
            }
        }
        result
    }

    /// Counts clients per status.
    ///
    /// # Errors
    ///
    /// Returns an error when a client's state lock is poisoned.
    pub fn progress(&self) -> AppResult<FleetProgress> {
        let mut progress = FleetProgress::default();
        for client in &self.clients {
            let slot = match client.status()? {
                ClientStatus::None => &mut progress.pending,
                ClientStatus::Running => &mut progress.running,
                ClientStatus::Stopped => &mut progress.stopped,
                ClientStatus::Failed => &mut progress.failed,
            };
            *slot = slot.saturating_add(1);
        }
        Ok(progress)
    }

    /// Stops background health checks, fails every client that has not
    /// finished, and hands teardown to the environment.
    ///
    /// # Errors
    ///
    /// Returns whatever the environment reports while tearing down.
    pub async fn shutdown(&self, cause: Option<&AppError>) -> AppResult<()> {
        for client in &self.clients {
            if let Err(err) = client.halt() {
                warn!("Failed to halt {}: {}", client.address(), err);
            }
        }
        self.environment.shutdown(cause).await
    }
}

/// Resolves once every client finished, or with the first failure as soon as
/// it happens.
async fn wait_all<'client, I>(clients: I) -> AppResult<()>
where
    I: Iterator<Item = &'client Client>,
{
    try_join_all(clients.map(|client| client.wait()))
        .await
        .map(|_finished| ())
        .map_err(AppError::rpc)
}

/// Folds the clients of one type into a single statistics record.
pub(crate) fn aggregate_type(
    clients: &[Client],
    client_type: ClientType,
    config: &LoadtestConfig,
    now: DateTime<Utc>,
) -> Result<Option<LoadtestStats>, FleetError> {
    let mut stats = LoadtestStats::default();
    let mut matched = false;
    let mut running = None;
    for client in clients
        .iter()
        .filter(|client| client.client_type() == client_type)
    {
        matched = true;
        let snapshot = client.snapshot()?;
        stats.bucket_values.merge(&snapshot.bucket_values);
        stats.waste_millis = stats.waste_millis.saturating_add(snapshot.waste_millis);
        running = running.max(snapshot.running_duration);
    }
    if !matched {
        return Ok(None);
    }
    stats.running_seconds = match running {
        Some(duration) => duration.as_secs(),
        None => config.seconds_since_start(now),
    };
    Ok(Some(stats))
}
