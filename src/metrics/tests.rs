use super::*;
use crate::error::{AppError, AppResult};

fn buckets_with(entries: &[(usize, u64)]) -> LatencyBuckets {
    let mut values = [0u64; LATENCY_BUCKET_COUNT];
    for (index, value) in entries {
        if let Some(slot) = values.get_mut(*index) {
            *slot = *value;
        }
    }
    LatencyBuckets::from(values)
}

#[test]
fn bucket_index_uses_inclusive_upper_bounds() -> AppResult<()> {
    let cases = [
        (0u64, 0usize),
        (1, 1),
        (2, 2),
        (5, 2),
        (6, 3),
        (150, 9),
        (151, 10),
        (2_147_483_647, 23),
        (u64::MAX, 23),
    ];
    for (latency, expected) in cases {
        let actual = LatencyBuckets::bucket_index(latency);
        if actual != expected {
            return Err(AppError::validation(format!(
                "latency {} mapped to bucket {}, expected {}",
                latency, actual, expected
            )));
        }
    }
    Ok(())
}

#[test]
fn merge_is_order_independent() -> AppResult<()> {
    let a = buckets_with(&[(0, 1), (3, 7), (23, 2)]);
    let b = buckets_with(&[(0, 4), (5, 1)]);
    let c = buckets_with(&[(3, 9), (12, 11)]);

    let mut left = LatencyBuckets::new();
    left.merge(&a);
    left.merge(&b);
    left.merge(&c);

    let mut right = LatencyBuckets::new();
    right.merge(&c);
    right.merge(&a);
    right.merge(&b);

    let mut grouped = b;
    grouped.merge(&c);
    let mut nested = a;
    nested.merge(&grouped);

    if left != right || left != nested {
        return Err(AppError::validation("merge depends on order"));
    }
    let expected = buckets_with(&[(0, 5), (3, 16), (5, 1), (12, 11), (23, 2)]);
    if left != expected {
        return Err(AppError::validation(format!(
            "unexpected merged buckets: {:?}",
            left.values()
        )));
    }
    Ok(())
}

#[test]
fn merge_saturates_instead_of_overflowing() -> AppResult<()> {
    let mut target = buckets_with(&[(1, u64::MAX)]);
    target.merge(&buckets_with(&[(1, 10)]));
    if target.values().get(1) != Some(&u64::MAX) {
        return Err(AppError::validation("bucket overflowed"));
    }
    Ok(())
}

#[test]
fn take_returns_contents_and_zeroes() -> AppResult<()> {
    let mut buckets = LatencyBuckets::new();
    buckets.record(12);
    buckets.record(12);
    buckets.record_n(450, 3);
    let taken = buckets.take();
    if taken.total() != 5 {
        return Err(AppError::validation(format!(
            "unexpected taken total {}",
            taken.total()
        )));
    }
    if !buckets.is_empty() {
        return Err(AppError::validation("buckets not cleared after take"));
    }
    Ok(())
}

#[test]
fn percentiles_report_bucket_upper_bounds() -> AppResult<()> {
    // 90 samples <= 10ms, 9 samples <= 100ms, 1 sample <= 1000ms.
    let buckets = buckets_with(&[(3, 90), (8, 9), (12, 1)]);
    let checks = [(500u32, 10u64), (900, 10), (990, 100), (1000, 1_000)];
    for (permille, expected) in checks {
        if buckets.percentile_ms(permille) != Some(expected) {
            return Err(AppError::validation(format!(
                "p{} was {:?}, expected {}",
                permille,
                buckets.percentile_ms(permille),
                expected
            )));
        }
    }
    if LatencyBuckets::new().percentile_ms(500).is_some() {
        return Err(AppError::validation("empty buckets produced a percentile"));
    }
    Ok(())
}

#[test]
fn from_wire_rejects_wrong_length_and_negative_values() -> AppResult<()> {
    if LatencyBuckets::from_wire(&[1, 2, 3]).is_ok() {
        return Err(AppError::validation("short bucket array accepted"));
    }
    let mut negative = vec![0i64; LATENCY_BUCKET_COUNT];
    if let Some(slot) = negative.get_mut(4) {
        *slot = -1;
    }
    if LatencyBuckets::from_wire(&negative).is_ok() {
        return Err(AppError::validation("negative bucket accepted"));
    }
    let buckets = buckets_with(&[(2, 3), (7, 4)]);
    let decoded = LatencyBuckets::from_wire(&buckets.to_wire())?;
    if decoded != buckets {
        return Err(AppError::validation("wire conversion changed values"));
    }
    Ok(())
}

#[test]
fn stats_summary_derives_throughput() -> AppResult<()> {
    let stats = LoadtestStats {
        running_seconds: 10,
        bucket_values: buckets_with(&[(3, 90), (8, 10)]),
        waste_millis: 42,
    };
    let summary = stats.summary();
    if summary.total_messages != 100 || summary.messages_per_second != 10 {
        return Err(AppError::validation(format!(
            "unexpected summary {:?}",
            summary
        )));
    }
    let idle = LoadtestStats::default();
    if idle.messages_per_second() != 0 {
        return Err(AppError::validation("zero running time must not divide"));
    }
    Ok(())
}
