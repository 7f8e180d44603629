//! warpgrid-metrics — observability for WarpGrid control loops.
//!
//! Components that want latency reporting take an `Arc<dyn MetricsSink>`
//! and call `measure_since()` when an operation completes. Sinks are
//! fire-and-forget: recording never fails and never blocks the caller
//! beyond a short uncontended lock.
//!
//! # Architecture
//!
//! ```text
//! MetricsSink (trait)
//!   ├── NoopSink        ← default when nothing is wired
//!   └── TimingRecorder  ← per-operation count / total / max
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod prometheus;
pub mod timing;

pub use prometheus::render_prometheus;
pub use timing::{MetricsSink, NoopSink, OperationTiming, TimingRecorder};
