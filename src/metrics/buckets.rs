use crate::error::RpcError;

/// Upper bound (inclusive, milliseconds) of every latency bucket.
pub const LATENCY_BUCKET_BOUNDS_MS: [u64; 24] = [
    0,
    1,
    5,
    10,
    20,
    40,
    60,
    80,
    100,
    150,
    200,
    500,
    1_000,
    2_000,
    3_000,
    10_000,
    20_000,
    100_000,
    400_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    2_147_483_647,
];

pub const LATENCY_BUCKET_COUNT: usize = LATENCY_BUCKET_BOUNDS_MS.len();

const LAST_BUCKET: usize = LATENCY_BUCKET_COUNT.saturating_sub(1);

/// Fixed-size count-per-latency-range histogram.
///
/// Values are cumulative counts; the only mutations are recording and
/// merging, so counts never decrease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencyBuckets {
    values: [u64; LATENCY_BUCKET_COUNT],
}

impl LatencyBuckets {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: [0; LATENCY_BUCKET_COUNT],
        }
    }

    /// Index of the bucket that holds `latency_ms`.
    #[must_use]
    pub fn bucket_index(latency_ms: u64) -> usize {
        LATENCY_BUCKET_BOUNDS_MS
            .iter()
            .position(|bound| latency_ms <= *bound)
            .unwrap_or(LAST_BUCKET)
    }

    pub fn record(&mut self, latency_ms: u64) {
        self.record_n(latency_ms, 1);
    }

    pub fn record_n(&mut self, latency_ms: u64, count: u64) {
        if let Some(slot) = self.values.get_mut(Self::bucket_index(latency_ms)) {
            *slot = slot.saturating_add(count);
        }
    }

    /// Element-wise addition of `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        for (target, source) in self.values.iter_mut().zip(other.values.iter()) {
            *target = target.saturating_add(*source);
        }
    }

    #[must_use]
    pub const fn values(&self) -> &[u64; LATENCY_BUCKET_COUNT] {
        &self.values
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.values
            .iter()
            .fold(0u64, |acc, value| acc.saturating_add(*value))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|value| *value == 0)
    }

    /// Resets every bucket to zero and returns the previous contents.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Upper bound of the bucket holding the given rank, expressed in
    /// per-mille (500 = p50, 990 = p99). `None` when no samples exist.
    #[must_use]
    pub fn percentile_ms(&self, permille: u32) -> Option<u64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let permille = u64::from(permille.min(1000));
        let rank = total.saturating_mul(permille).div_ceil(1000).max(1);
        let mut seen = 0u64;
        for (value, bound) in self.values.iter().zip(LATENCY_BUCKET_BOUNDS_MS.iter()) {
            seen = seen.saturating_add(*value);
            if seen >= rank {
                return Some(*bound);
            }
        }
        LATENCY_BUCKET_BOUNDS_MS.last().copied()
    }

    #[must_use]
    pub fn to_wire(&self) -> Vec<i64> {
        self.values
            .iter()
            .map(|value| i64::try_from(*value).unwrap_or(i64::MAX))
            .collect()
    }

    /// Builds buckets from a wire `bucket_values` sequence.
    ///
    /// # Errors
    ///
    /// Returns an error when the sequence has the wrong length or holds a
    /// negative count.
    pub fn from_wire(values: &[i64]) -> Result<Self, RpcError> {
        if values.len() != LATENCY_BUCKET_COUNT {
            return Err(RpcError::MalformedResponse {
                reason: format!(
                    "expected {} bucket values, got {}",
                    LATENCY_BUCKET_COUNT,
                    values.len()
                ),
            });
        }
        let mut buckets = Self::new();
        for (slot, value) in buckets.values.iter_mut().zip(values.iter()) {
            *slot = u64::try_from(*value).map_err(|err| RpcError::MalformedResponse {
                reason: format!("negative bucket value {}: {}", value, err),
            })?;
        }
        Ok(buckets)
    }
}

impl From<[u64; LATENCY_BUCKET_COUNT]> for LatencyBuckets {
    fn from(values: [u64; LATENCY_BUCKET_COUNT]) -> Self {
        Self { values }
    }
}
