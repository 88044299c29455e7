use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rand::distributions::{Distribution, Uniform};
use rand::thread_rng;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::rpc::{StartRequest, StopCondition};

use super::task::Task;

const NANOS_PER_SECOND: u64 = 1_000_000_000;
const TAIL_PROBABILITY: f64 = 0.01;
const REDELIVERY_PROBABILITY: f64 = 0.002;

/// Pacing derived from a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoadPlan {
    pub(crate) period: Duration,
    pub(crate) batch_size: u32,
    pub(crate) deadline: Option<Duration>,
    pub(crate) message_limit: Option<u64>,
    pub(crate) base_latency_ms: u64,
}

impl LoadPlan {
    pub(crate) fn from_request(request: &StartRequest) -> Self {
        let batch_size = request.publish_batch_size.max(1);
        let rate = u64::from(request.request_rate.max(1));
        let period_nanos = NANOS_PER_SECOND
            .saturating_mul(u64::from(batch_size))
            .checked_div(rate)
            .unwrap_or(NANOS_PER_SECOND)
            .max(1);
        let (deadline, message_limit) = match request.stop_condition {
            StopCondition::TestDuration(duration) => (Some(duration), None),
            StopCondition::NumberOfMessages(count) => (None, Some(u64::from(count))),
        };
        let batch_wait_ms =
            u64::try_from(request.publish_batch_duration.as_millis()).unwrap_or(u64::MAX);
        Self {
            period: Duration::from_nanos(period_nanos),
            batch_size,
            deadline,
            message_limit,
            base_latency_ms: u64::from(request.message_size)
                .checked_div(10_000)
                .unwrap_or(0)
                .saturating_add(batch_wait_ms.checked_div(2).unwrap_or(0))
                .saturating_add(1),
        }
    }
}

/// Generates synthetic traffic for `task` until the stop condition is met.
pub(crate) async fn run_load(task: Arc<Task>, request: StartRequest) {
    let plan = LoadPlan::from_request(&request);
    let delay = request
        .start_time
        .signed_duration_since(Utc::now())
        .to_std()
        .unwrap_or(Duration::ZERO);
    if !delay.is_zero() {
        debug!("Waiting {:?} for the shared start time", delay);
        tokio::time::sleep(delay).await;
    }

    task.mark_started();
    info!(
        "Generating {} load on {} every {:?} in batches of {}",
        task.client_type(),
        request.topic,
        plan.period,
        plan.batch_size
    );

    let started = Instant::now();
    let mut ticker = tokio::time::interval(plan.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut emitted = 0u64;
    loop {
        let scheduled = ticker.tick().await;
        let late = Instant::now().saturating_duration_since(scheduled);
        if late > plan.period {
            task.add_waste(late.saturating_sub(plan.period));
        }
        if plan
            .deadline
            .is_some_and(|deadline| started.elapsed() >= deadline)
        {
            break;
        }
        let remaining = plan
            .message_limit
            .map_or(u64::from(plan.batch_size), |limit| limit.saturating_sub(emitted));
        let batch = remaining.min(u64::from(plan.batch_size));
        if batch == 0 {
            break;
        }
        emit_batch(&task, batch, plan.base_latency_ms);
        emitted = emitted.saturating_add(batch);
    }

    task.mark_finished();
    info!("Load finished after {} messages", task.message_count());
}

fn emit_batch(task: &Task, count: u64, base_latency_ms: u64) {
    let mut rng = thread_rng();
    let body = Uniform::new_inclusive(base_latency_ms, base_latency_ms.saturating_add(40));
    let tail = Uniform::new_inclusive(100u64, 1_500);
    let subscriber = !task.client_type().is_publisher();
    let mut received = Vec::new();
    for _ in 0..count {
        let latency = if rng.gen_bool(TAIL_PROBABILITY) {
            tail.sample(&mut rng)
        } else {
            body.sample(&mut rng)
        };
        task.record_latency(latency);
        if subscriber {
            let identifier = task.next_identifier();
            received.push(identifier);
            if rng.gen_bool(REDELIVERY_PROBABILITY) {
                received.push(identifier);
            }
        }
    }
    if !received.is_empty() {
        task.push_received(&received);
    }
}
