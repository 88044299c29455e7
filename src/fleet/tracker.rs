use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::rpc::MessageIdentifier;

/// Fleet-wide record of message identifiers reported by subscribers.
#[derive(Debug, Default)]
pub struct MessageTracker {
    seen: Mutex<HashSet<MessageIdentifier>>,
    received: AtomicU64,
    duplicates: AtomicU64,
}

impl MessageTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `identifiers` and returns those that were already seen.
    #[must_use]
    pub fn record_received(&self, identifiers: &[MessageIdentifier]) -> Vec<MessageIdentifier> {
        if identifiers.is_empty() {
            return Vec::new();
        }
        let mut duplicates = Vec::new();
        {
            let mut seen = match self.seen.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            for identifier in identifiers {
                if !seen.insert(*identifier) {
                    duplicates.push(*identifier);
                }
            }
        }
        self.received
            .fetch_add(u64::try_from(identifiers.len()).unwrap_or(u64::MAX), Ordering::Relaxed);
        self.duplicates
            .fetch_add(u64::try_from(duplicates.len()).unwrap_or(u64::MAX), Ordering::Relaxed);
        duplicates
    }

    #[must_use]
    pub fn received_count(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn duplicate_count(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn unique_count(&self) -> usize {
        match self.seen.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
