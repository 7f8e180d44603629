//! Autoscaler — the periodic scaling control loop.
//!
//! Every tick runs one evaluation pass: read all policies, gate each job
//! on its groups' deployment and cooldown state, and hand eligible jobs to
//! the worker pool. Passes never overlap; a tick that arrives while one is
//! still running is skipped.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use warpgrid_metrics::{MetricsSink, NoopSink};
use warpgrid_policy::{JobPolicies, PolicyBackend};

use crate::config::AutoscaleConfig;
use crate::error::AutoscaleResult;
use crate::lifecycle::{Lifecycle, PassGuard, Phase};
use crate::pool::{BoxFuture, EvaluateFn, WorkItem, WorkerPool};
use crate::scaler::Scaler;

const METRIC_EVALUATE_POLICIES: &[&str] = &["autoscale", "evaluate_policies"];

/// Result of a single evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Another pass was still running; nothing was read or submitted.
    Skipped,
    /// The policy backend could not be read.
    FetchFailed,
    /// The backend holds no policies.
    NoPolicies,
    Completed(PassReport),
}

/// What a completed pass did with each job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Jobs whose groups were checked.
    pub jobs_evaluated: usize,
    /// Jobs handed to the worker pool.
    pub submitted: Vec<String>,
    /// Jobs with no group safe to evaluate.
    pub gated: Vec<String>,
}

/// Policy-driven autoscaling loop over a bounded worker pool.
///
/// Share it behind an `Arc`: one task drives `run()` while the owner
/// calls `stop()` from another.
pub struct Autoscaler<B, S> {
    config: AutoscaleConfig,
    backend: Arc<B>,
    scaler: Arc<S>,
    pool: WorkerPool,
    lifecycle: Lifecycle,
    shutdown_tx: watch::Sender<bool>,
    metrics: Arc<dyn MetricsSink>,
}

impl<B: PolicyBackend, S: Scaler> Autoscaler<B, S> {
    /// Build the autoscaler and its worker pool.
    pub fn new(config: AutoscaleConfig, backend: Arc<B>, scaler: Arc<S>) -> AutoscaleResult<Self> {
        config.validate()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pool = WorkerPool::new(
            config.scaling_threads,
            config.worker_expiry,
            shutdown_rx,
            evaluate_fn(scaler.clone()),
        )?;

        Ok(Self {
            config,
            backend,
            scaler,
            pool,
            lifecycle: Lifecycle::new(),
            shutdown_tx,
            metrics: Arc::new(NoopSink),
        })
    }

    /// Report pass latency to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether the tick loop is currently active.
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn config(&self) -> &AutoscaleConfig {
        &self.config
    }

    /// Run the tick loop until `stop()` is called.
    ///
    /// Returns immediately if the loop already ran or a stop was requested
    /// first; an autoscaler cannot be restarted.
    pub async fn run(&self) {
        // Subscribe before entering Running so a stop issued right after
        // cannot slip past the loop.
        let mut shutdown = self.shutdown_tx.subscribe();
        if !self.lifecycle.mark_running() {
            warn!(phase = ?self.lifecycle.phase(), "autoscaler cannot start from its current phase");
            return;
        }

        let interval = self.config.scaling_interval;
        info!(
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            threads = self.config.scaling_threads,
            "starting internal auto-scaling engine"
        );

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    self.evaluate_policies().await;
                }
            }
        }

        self.lifecycle.mark_loop_exited();
        info!("autoscaler loop stopped");
    }

    /// Signal shutdown and wait until the loop and the pool have drained.
    ///
    /// Evaluations already running finish; queued ones are dropped. A
    /// second call logs a warning and returns `false`.
    pub async fn stop(&self) -> bool {
        if !self.lifecycle.request_stop() {
            warn!("autoscaler stop already requested, ignoring");
            return false;
        }
        self.shutdown_tx.send_replace(true);

        while !self.lifecycle.is_drained() {
            debug!("autoscaler still has in-flight workers, will continue to check");
            tokio::time::sleep(self.config.drain_poll_interval).await;
        }

        self.pool.release().await;
        self.lifecycle.mark_stopped();
        info!("successfully drained autoscaler worker pool");
        true
    }

    /// Run one evaluation pass.
    pub async fn evaluate_policies(&self) -> PassOutcome {
        // Backpressure: a slow orchestrator must not pile up passes.
        let Some(_pass) = PassGuard::acquire(&self.lifecycle) else {
            info!("scaling run in progress, skipping new assessment");
            return PassOutcome::Skipped;
        };
        let start = Instant::now();

        let policies = match self.backend.get_policies() {
            Ok(policies) => policies,
            Err(e) => {
                error!(error = %e, "autoscaler unable to get scaling policies");
                return PassOutcome::FetchFailed;
            }
        };
        if policies.is_empty() {
            debug!("no scaling policies found in storage backend");
            return PassOutcome::NoPolicies;
        }

        let now = SystemTime::now();
        let mut report = PassReport::default();

        for (job, groups) in &policies {
            let stopping = *self.shutdown_tx.borrow();
            if stopping {
                debug!(remaining_from = %job, "shutdown requested, abandoning rest of pass");
                break;
            }
            report.jobs_evaluated += 1;

            let safe = self.safe_groups(job, groups, now).await;
            if safe.is_empty() {
                report.gated.push(job.clone());
                continue;
            }

            // `safe` only decides whether the job goes out; the worker
            // receives the job's complete policy map.
            let item = WorkItem::new(job.clone(), groups.clone(), now);
            match self.pool.submit(item).await {
                Ok(()) => report.submitted.push(job.clone()),
                Err(e) => error!(%job, error = %e, "failed to invoke autoscaling worker thread"),
            }
        }

        self.metrics.measure_since(METRIC_EVALUATE_POLICIES, start);
        debug!(
            jobs = report.jobs_evaluated,
            submitted = report.submitted.len(),
            gated = report.gated.len(),
            "autoscaling pass complete"
        );
        PassOutcome::Completed(report)
    }

    /// Groups of `job` that may be evaluated at `now`.
    ///
    /// Groups are checked in sorted order and the first group that is
    /// deploying, cooling down, or whose cooldown cannot be determined
    /// ends the check for the whole job.
    async fn safe_groups(&self, job: &str, groups: &JobPolicies, now: SystemTime) -> JobPolicies {
        let mut safe = JobPolicies::new();

        for (group, policy) in groups {
            if self.scaler.job_group_is_deploying(job, group).await {
                debug!(%job, %group, "job group is currently in deployment, skipping autoscaler evaluation");
                break;
            }

            match self
                .scaler
                .job_group_is_in_cooldown(job, group, policy.cooldown, now)
                .await
            {
                Ok(false) => {}
                Ok(true) => {
                    debug!(%job, %group, "job group is currently in scaling cooldown, skipping autoscaler evaluation");
                    break;
                }
                Err(e) => {
                    error!(%job, %group, error = %e, "failed to determine if job group is in cooldown");
                    break;
                }
            }

            safe.insert(group.clone(), policy.clone());
        }

        safe
    }
}

/// Pool handler that forwards each work item to the scaler.
fn evaluate_fn<S: Scaler>(scaler: Arc<S>) -> EvaluateFn {
    Arc::new(move |item: WorkItem| -> BoxFuture {
        let scaler = scaler.clone();
        Box::pin(async move {
            scaler
                .evaluate_job(&item.job_id, &item.policies, item.timestamp)
                .await;
        })
    })
}
