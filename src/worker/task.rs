use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use tokio::time::Instant;

use crate::fleet::ClientType;
use crate::metrics::LatencyBuckets;
use crate::rpc::MessageIdentifier;

/// Worker-side accumulator shared by the load generator and the check handler.
#[derive(Debug)]
pub struct Task {
    client_type: ClientType,
    publisher_id: i64,
    next_sequence: AtomicI32,
    messages: AtomicU64,
    waste_millis: AtomicU64,
    duplicates_reported: AtomicU64,
    buckets: Mutex<LatencyBuckets>,
    received: Mutex<Vec<MessageIdentifier>>,
    started_at: OnceLock<Instant>,
    finished: AtomicBool,
}

impl Task {
    #[must_use]
    pub fn new(client_type: ClientType, publisher_id: i64) -> Self {
        Self {
            client_type,
            publisher_id,
            next_sequence: AtomicI32::new(0),
            messages: AtomicU64::new(0),
            waste_millis: AtomicU64::new(0),
            duplicates_reported: AtomicU64::new(0),
            buckets: Mutex::new(LatencyBuckets::new()),
            received: Mutex::new(Vec::new()),
            started_at: OnceLock::new(),
            finished: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn client_type(&self) -> ClientType {
        self.client_type
    }

    /// Stamps the next outgoing message.
    pub fn next_identifier(&self) -> MessageIdentifier {
        MessageIdentifier {
            publisher_client_id: self.publisher_id,
            sequence_number: self.next_sequence.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn record_latency(&self, latency_ms: u64) {
        match self.buckets.lock() {
            Ok(mut buckets) => buckets.record(latency_ms),
            Err(poisoned) => poisoned.into_inner().record(latency_ms),
        }
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_waste(&self, wasted: Duration) {
        let millis = u64::try_from(wasted.as_millis()).unwrap_or(u64::MAX);
        self.waste_millis.fetch_add(millis, Ordering::Relaxed);
    }

    pub fn push_received(&self, identifiers: &[MessageIdentifier]) {
        match self.received.lock() {
            Ok(mut received) => received.extend_from_slice(identifiers),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(identifiers),
        }
    }

    /// Returns the bucket deltas since the previous flush and zeroes them.
    pub fn flush_bucket_values(&self) -> LatencyBuckets {
        match self.buckets.lock() {
            Ok(mut buckets) => buckets.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    pub fn drain_received(&self) -> Vec<MessageIdentifier> {
        match self.received.lock() {
            Ok(mut received) => std::mem::take(&mut *received),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn note_duplicates(&self, count: usize) {
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        self.duplicates_reported.fetch_add(count, Ordering::Relaxed);
    }

    pub fn mark_started(&self) {
        if self.started_at.set(Instant::now()).is_err() {
            tracing::debug!("Task start time already recorded");
        }
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn running_duration(&self) -> Duration {
        self.started_at
            .get()
            .map_or(Duration::ZERO, Instant::elapsed)
    }

    #[must_use]
    pub fn message_count(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn waste_millis(&self) -> u64 {
        self.waste_millis.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn duplicates_reported(&self) -> u64 {
        self.duplicates_reported.load(Ordering::Relaxed)
    }
}
