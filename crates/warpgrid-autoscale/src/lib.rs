//! warpgrid-autoscale — policy-gated autoscaling passes.
//!
//! On every tick the autoscaler reads all scaling policies, drops jobs
//! whose groups are deploying or cooling down, and hands the rest to a
//! bounded worker pool where the `Scaler` evaluates them.
//!
//! # Architecture
//!
//! ```text
//! Autoscaler::run()
//!   └── tick ──▶ evaluate_policies()
//!                  ├── PolicyBackend::get_policies()
//!                  ├── per job, groups in sorted order:
//!                  │     Scaler::job_group_is_deploying()
//!                  │     Scaler::job_group_is_in_cooldown()
//!                  └── WorkerPool::submit(WorkItem)
//!                           └── worker ──▶ Scaler::evaluate_job()
//! ```
//!
//! Passes never overlap: a tick that fires while the previous pass is
//! still running is skipped. `stop()` signals shutdown, waits for the
//! loop and any running pass, then releases the pool.

pub mod autoscaler;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod lifecycle;
pub mod pool;
pub mod scaler;

pub use autoscaler::{Autoscaler, PassOutcome, PassReport};
pub use config::AutoscaleConfig;
pub use cooldown::ScaleHistory;
pub use error::{AutoscaleError, AutoscaleResult, ConfigError, PoolError};
pub use lifecycle::{Lifecycle, Phase};
pub use pool::{BoxFuture, EvaluateFn, WorkItem, WorkerPool};
pub use scaler::Scaler;
