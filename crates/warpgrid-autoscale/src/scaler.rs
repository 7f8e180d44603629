//! Scaler — the collaborator that gates and performs scale evaluations.
//!
//! The autoscaler never computes replica counts itself. It asks the
//! scaler whether a group is safe to touch, then hands whole jobs to the
//! scaler's evaluation entry point on a pool worker.

use std::future::Future;
use std::time::{Duration, SystemTime};

use warpgrid_policy::JobPolicies;

/// Answers gating questions about job groups and evaluates jobs.
///
/// Implementations talk to the orchestrator; all methods may be called
/// concurrently from the tick loop and from pool workers.
pub trait Scaler: Send + Sync + 'static {
    /// Whether `group` of `job` has a deployment in progress.
    fn job_group_is_deploying(&self, job: &str, group: &str) -> impl Future<Output = bool> + Send;

    /// Whether `group` of `job` scaled less than `cooldown` before `now`.
    fn job_group_is_in_cooldown(
        &self,
        job: &str,
        group: &str,
        cooldown: Duration,
        now: SystemTime,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// Evaluate and, if needed, scale the groups of `job`.
    ///
    /// Failures are the scaler's own concern; nothing is reported back.
    fn evaluate_job(
        &self,
        job: &str,
        policies: &JobPolicies,
        timestamp: SystemTime,
    ) -> impl Future<Output = ()> + Send;
}
