use std::time::Duration;

use chrono::{TimeDelta, Utc};

use crate::args::RunArgs;
use crate::error::{AppError, AppResult, ConfigError, ValidationError};
use crate::fleet::{ClientSpec, ClientType};
use crate::rpc::StopCondition;

use super::settings::{ClientTimings, KafkaSettings, LoadtestConfig, PubsubSettings};
use super::types::{ConfigFile, DurationValue, LocalWorkerSpec};

pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything `fleetload run` needs: the immutable run parameters plus the fleet
/// membership.
#[derive(Debug, Clone)]
pub struct FleetPlan {
    pub config: LoadtestConfig,
    pub clients: Vec<ClientSpec>,
    pub local_workers: Vec<LocalWorkerSpec>,
    pub stats_interval: Duration,
    pub handshake_timeout: Duration,
}

/// Builds the run plan from a config file, letting CLI flags win.
///
/// # Errors
///
/// Returns an error when values are invalid, conflict, or describe an empty fleet.
pub fn build_plan(file: &ConfigFile, args: &RunArgs) -> AppResult<FleetPlan> {
    let defaults = LoadtestConfig::default();

    let project = args
        .project
        .clone()
        .or_else(|| file.project.clone())
        .unwrap_or(defaults.project);
    let topic_prefix = args
        .topic_prefix
        .clone()
        .or_else(|| file.topic_prefix.clone())
        .unwrap_or(defaults.topic_prefix);

    let request_rate = positive(
        args.request_rate.or(file.request_rate),
        defaults.request_rate,
        "request_rate",
    )?;
    let message_size = positive(file.message_size, defaults.message_size, "message_size")?;
    let max_outstanding_requests = positive(
        file.max_outstanding_requests,
        defaults.max_outstanding_requests,
        "max_outstanding_requests",
    )?;
    let publish_batch_size = positive(
        file.publish_batch_size,
        defaults.publish_batch_size,
        "publish_batch_size",
    )?;

    let stop_condition = stop_condition(file, args)?.unwrap_or(defaults.stop_condition);

    let burn_in_duration = match args.burn_in {
        Some(duration) => duration,
        None => offset(file.burn_in_duration.as_ref(), "burn_in_duration")?
            .unwrap_or(defaults.burn_in_duration),
    };
    let publish_batch_duration = offset(
        file.publish_batch_duration.as_ref(),
        "publish_batch_duration",
    )?
    .unwrap_or(defaults.publish_batch_duration);
    let start_delay = offset(file.start_delay.as_ref(), "start_delay")?.unwrap_or(DEFAULT_START_DELAY);
    let start_time = TimeDelta::from_std(start_delay)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| {
            AppError::config(ConfigError::InvalidDuration {
                field: "start_delay",
                source: ValidationError::DurationOverflow,
            })
        })?;

    let pubsub = build_pubsub(file)?;
    let kafka = build_kafka(file)?;
    let mut timings = build_timings(file)?;
    if let Some(interval) = args.check_interval {
        timings.check_interval = interval;
    }

    let stats_interval = match args.stats_interval {
        Some(interval) => interval,
        None => duration(file.stats_interval.as_ref(), "stats_interval")?
            .unwrap_or(DEFAULT_STATS_INTERVAL),
    };
    let handshake_timeout = duration(file.handshake_timeout.as_ref(), "handshake_timeout")?
        .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT);

    let clients = build_clients(file)?;
    let local_workers = build_local_workers(file)?;
    if clients.is_empty() && local_workers.iter().all(|entry| entry.count == 0) {
        return Err(AppError::config(ConfigError::EmptyFleet));
    }

    Ok(FleetPlan {
        config: LoadtestConfig {
            project,
            topic_prefix,
            request_rate,
            message_size,
            max_outstanding_requests,
            start_time,
            stop_condition,
            burn_in_duration,
            publish_batch_size,
            publish_batch_duration,
            pubsub,
            kafka,
            timings,
        },
        clients,
        local_workers,
        stats_interval,
        handshake_timeout,
    })
}

fn stop_condition(file: &ConfigFile, args: &RunArgs) -> AppResult<Option<StopCondition>> {
    if let Some(duration) = args.test_duration {
        return Ok(Some(StopCondition::TestDuration(duration)));
    }
    if let Some(count) = args.number_of_messages {
        return Ok(Some(StopCondition::NumberOfMessages(count)));
    }
    match (file.test_duration.as_ref(), file.number_of_messages) {
        (Some(_), Some(_)) => Err(AppError::config(ConfigError::Conflict {
            left: "test_duration",
            right: "number_of_messages",
        })),
        (Some(value), None) => Ok(Some(StopCondition::TestDuration(
            value
                .to_duration()
                .map_err(|err| invalid_duration("test_duration", err))?,
        ))),
        (None, Some(count)) => Ok(Some(StopCondition::NumberOfMessages(positive(
            Some(count),
            1,
            "number_of_messages",
        )?))),
        (None, None) => Ok(None),
    }
}

fn build_pubsub(file: &ConfigFile) -> AppResult<PubsubSettings> {
    let mut settings = PubsubSettings::default();
    if let Some(section) = file.pubsub.as_ref() {
        settings.max_messages_per_pull = positive(
            section.max_messages_per_pull,
            settings.max_messages_per_pull,
            "pubsub.max_messages_per_pull",
        )?;
    }
    Ok(settings)
}

fn build_kafka(file: &ConfigFile) -> AppResult<KafkaSettings> {
    let mut settings = KafkaSettings::default();
    let Some(section) = file.kafka.as_ref() else {
        return Ok(settings);
    };
    if let Some(broker) = section.broker.clone() {
        settings.broker = broker;
    }
    if let Some(poll) = duration(section.poll_duration.as_ref(), "kafka.poll_duration")? {
        settings.poll_duration = poll;
    }
    if let Some(zookeeper) = section.zookeeper_address.clone() {
        settings.zookeeper_address = zookeeper;
    }
    settings.replication_factor = positive(
        section.replication_factor,
        settings.replication_factor,
        "kafka.replication_factor",
    )?;
    settings.partitions = positive(section.partitions, settings.partitions, "kafka.partitions")?;
    Ok(settings)
}

fn build_timings(file: &ConfigFile) -> AppResult<ClientTimings> {
    let mut timings = ClientTimings::default();
    let Some(section) = file.timings.as_ref() else {
        return Ok(timings);
    };
    if let Some(interval) = duration(section.check_interval.as_ref(), "timings.check_interval")? {
        timings.check_interval = interval;
    }
    if let Some(backoff) = offset(section.start_backoff.as_ref(), "timings.start_backoff")? {
        timings.start_backoff = backoff;
    }
    if let Some(threshold) = section.start_error_threshold {
        timings.start_error_threshold = threshold;
    }
    if let Some(threshold) = section.check_error_threshold {
        timings.check_error_threshold = threshold;
    }
    if let Some(timeout) = duration(section.rpc_timeout.as_ref(), "timings.rpc_timeout")? {
        timings.rpc_timeout = timeout;
    }
    Ok(timings)
}

fn build_clients(file: &ConfigFile) -> AppResult<Vec<ClientSpec>> {
    let mut clients = Vec::with_capacity(file.clients.len());
    for (index, entry) in file.clients.iter().enumerate() {
        let client_type: ClientType = entry
            .client_type
            .parse()
            .map_err(|err| AppError::config(ConfigError::InvalidClient { index, source: err }))?;
        clients.push(ClientSpec {
            address: entry.address.clone(),
            client_type,
            subscription: entry.subscription.clone(),
        });
    }
    Ok(clients)
}

fn build_local_workers(file: &ConfigFile) -> AppResult<Vec<LocalWorkerSpec>> {
    let mut workers = Vec::with_capacity(file.local_workers.len());
    for (index, entry) in file.local_workers.iter().enumerate() {
        let client_type: ClientType = entry
            .client_type
            .parse()
            .map_err(|err| AppError::config(ConfigError::InvalidClient { index, source: err }))?;
        workers.push(LocalWorkerSpec {
            client_type,
            count: entry.count,
        });
    }
    Ok(workers)
}

fn positive(value: Option<u32>, default: u32, field: &'static str) -> AppResult<u32> {
    match value {
        None => Ok(default),
        Some(0) => Err(AppError::config(ConfigError::FieldMustBePositive {
            field,
            source: ValidationError::ValueTooSmall { min: 1 },
        })),
        Some(value) => Ok(value),
    }
}

fn duration(value: Option<&DurationValue>, field: &'static str) -> AppResult<Option<Duration>> {
    value
        .map(DurationValue::to_duration)
        .transpose()
        .map_err(|err| invalid_duration(field, err))
}

fn offset(value: Option<&DurationValue>, field: &'static str) -> AppResult<Option<Duration>> {
    value
        .map(DurationValue::to_offset)
        .transpose()
        .map_err(|err| invalid_duration(field, err))
}

fn invalid_duration(field: &'static str, source: ValidationError) -> AppError {
    AppError::config(ConfigError::InvalidDuration { field, source })
}
