//! Operation timing — the "record duration for named operation" sink.
//!
//! Counters are atomics behind a read-mostly map, so concurrent recorders
//! for an already-known operation only ever take the shared lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::trace;

/// Destination for operation latency measurements.
///
/// Implementations must not panic and must not block for long: callers
/// invoke this on hot paths (every store operation, every pass).
pub trait MetricsSink: Send + Sync {
    /// Record the time elapsed since `start` under `key`.
    fn measure_since(&self, key: &[&str], start: Instant);
}

/// Sink that discards every measurement.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn measure_since(&self, _key: &[&str], _start: Instant) {}
}

/// Aggregated timings for a single operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTiming {
    /// Dotted operation key, e.g. `policy.memory.get_policies`.
    pub operation: String,
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

/// Per-operation counters.
struct OperationStats {
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl OperationStats {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            max_nanos: AtomicU64::new(0),
        }
    }

    fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    fn timing(&self, operation: &str) -> OperationTiming {
        OperationTiming {
            operation: operation.to_string(),
            count: self.count.load(Ordering::Relaxed),
            total: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
            max: Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed)),
        }
    }
}

/// In-memory sink that aggregates count, total and max latency per operation.
#[derive(Clone, Default)]
pub struct TimingRecorder {
    operations: Arc<RwLock<HashMap<String, Arc<OperationStats>>>>,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explicit duration for `key`.
    pub fn record(&self, key: &[&str], elapsed: Duration) {
        let operation = key.join(".");

        let existing = self
            .operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&operation)
            .cloned();

        let stats = match existing {
            Some(stats) => stats,
            None => {
                let mut operations = self
                    .operations
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                operations
                    .entry(operation.clone())
                    .or_insert_with(|| Arc::new(OperationStats::new()))
                    .clone()
            }
        };

        stats.record(elapsed);
        trace!(
            %operation,
            elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            "operation timed"
        );
    }

    /// Timings for a single operation, if it has been recorded.
    pub fn stats(&self, operation: &str) -> Option<OperationTiming> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(operation)
            .map(|s| s.timing(operation))
    }

    /// Timings for every recorded operation, sorted by operation key.
    pub fn snapshot(&self) -> Vec<OperationTiming> {
        let operations = self
            .operations
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut timings: Vec<OperationTiming> = operations
            .iter()
            .map(|(name, stats)| stats.timing(name))
            .collect();
        timings.sort_by(|a, b| a.operation.cmp(&b.operation));
        timings
    }
}

impl MetricsSink for TimingRecorder {
    fn measure_since(&self, key: &[&str], start: Instant) {
        self.record(key, start.elapsed());
    }
}
