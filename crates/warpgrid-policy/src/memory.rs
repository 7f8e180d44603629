//! MemoryBackend — in-process policy storage.
//!
//! A reader/writer lock guards the job map; readers never block each
//! other and a writer excludes everyone for its duration. Each job's group
//! map sits behind an `Arc`, so reads hand out snapshots by bumping
//! reference counts and writers copy-on-write only the job they touch.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tracing::debug;
use warpgrid_metrics::{MetricsSink, NoopSink};

use crate::backend::PolicyBackend;
use crate::error::PolicyResult;
use crate::types::{GroupScalingPolicy, JobId, JobPolicies, ScalingPolicySet};

const METRIC_GET_POLICIES: &[&str] = &["policy", "memory", "get_policies"];
const METRIC_GET_JOB_POLICY: &[&str] = &["policy", "memory", "get_job_policy"];
const METRIC_GET_JOB_GROUP_POLICY: &[&str] = &["policy", "memory", "get_job_group_policy"];
const METRIC_PUT_JOB_POLICY: &[&str] = &["policy", "memory", "put_job_policy"];
const METRIC_PUT_JOB_GROUP_POLICY: &[&str] = &["policy", "memory", "put_job_group_policy"];
const METRIC_DELETE_JOB_POLICY: &[&str] = &["policy", "memory", "delete_job_policy"];
const METRIC_DELETE_JOB_GROUP_POLICY: &[&str] = &["policy", "memory", "delete_job_group_policy"];

/// Thread-safe in-memory policy backend.
#[derive(Clone)]
pub struct MemoryBackend {
    policies: Arc<RwLock<BTreeMap<JobId, Arc<JobPolicies>>>>,
    metrics: Arc<dyn MetricsSink>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend that discards timing measurements.
    pub fn new() -> Self {
        Self {
            policies: Arc::new(RwLock::new(BTreeMap::new())),
            metrics: Arc::new(NoopSink),
        }
    }

    /// Report per-operation latency to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Number of jobs with a policy entry.
    pub fn job_count(&self) -> usize {
        self.read().len()
    }

    // Every mutation is a single insert or remove; a poisoned map is
    // still consistent.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<JobId, Arc<JobPolicies>>> {
        self.policies.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<JobId, Arc<JobPolicies>>> {
        self.policies.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn timed<T>(&self, key: &[&str], f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.metrics.measure_since(key, start);
        out
    }
}

impl PolicyBackend for MemoryBackend {
    fn get_policies(&self) -> PolicyResult<ScalingPolicySet> {
        Ok(self.timed(METRIC_GET_POLICIES, || self.read().clone()))
    }

    fn get_job_policy(&self, job: &str) -> PolicyResult<Option<Arc<JobPolicies>>> {
        Ok(self.timed(METRIC_GET_JOB_POLICY, || self.read().get(job).cloned()))
    }

    fn get_job_group_policy(
        &self,
        job: &str,
        group: &str,
    ) -> PolicyResult<Option<GroupScalingPolicy>> {
        Ok(self.timed(METRIC_GET_JOB_GROUP_POLICY, || {
            self.read()
                .get(job)
                .and_then(|groups| groups.get(group))
                .cloned()
        }))
    }

    fn put_job_policy(&self, job: &str, policies: JobPolicies) -> PolicyResult<()> {
        self.timed(METRIC_PUT_JOB_POLICY, || {
            let groups = policies.len();
            self.write().insert(job.to_string(), Arc::new(policies));
            debug!(%job, groups, "job scaling policy stored");
        });
        Ok(())
    }

    fn put_job_group_policy(
        &self,
        job: &str,
        group: &str,
        policy: GroupScalingPolicy,
    ) -> PolicyResult<()> {
        self.timed(METRIC_PUT_JOB_GROUP_POLICY, || {
            let mut policies = self.write();
            let groups = policies.entry(job.to_string()).or_default();
            Arc::make_mut(groups).insert(group.to_string(), policy);
            debug!(%job, %group, "job group scaling policy stored");
        });
        Ok(())
    }

    fn delete_job_group_policy(&self, job: &str, group: &str) -> PolicyResult<()> {
        self.timed(METRIC_DELETE_JOB_GROUP_POLICY, || {
            let mut policies = self.write();
            if let Some(groups) = policies.get_mut(job)
                && groups.contains_key(group)
            {
                Arc::make_mut(groups).remove(group);
                debug!(%job, %group, "job group scaling policy deleted");
            }
        });
        Ok(())
    }

    fn delete_job_policy(&self, job: &str) -> PolicyResult<()> {
        self.timed(METRIC_DELETE_JOB_POLICY, || {
            let existed = self.write().remove(job).is_some();
            debug!(%job, existed, "job scaling policy deleted");
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use warpgrid_metrics::TimingRecorder;

    use super::*;

    fn policy(cooldown_secs: u64) -> GroupScalingPolicy {
        GroupScalingPolicy::with_cooldown(Duration::from_secs(cooldown_secs))
    }

    fn groups(entries: &[(&str, u64)]) -> JobPolicies {
        entries
            .iter()
            .map(|(g, c)| (g.to_string(), policy(*c)))
            .collect()
    }

    #[test]
    fn empty_backend_returns_empty_set() {
        let backend = MemoryBackend::new();
        assert!(backend.get_policies().unwrap().is_empty());
        assert!(backend.get_job_policy("api").unwrap().is_none());
        assert!(backend.get_job_group_policy("api", "web").unwrap().is_none());
    }

    #[test]
    fn put_and_get_job_group_policy() {
        let backend = MemoryBackend::new();
        backend.put_job_group_policy("api", "web", policy(30)).unwrap();

        assert_eq!(
            backend.get_job_group_policy("api", "web").unwrap(),
            Some(policy(30))
        );

        backend.delete_job_group_policy("api", "web").unwrap();
        assert!(backend.get_job_group_policy("api", "web").unwrap().is_none());
    }

    #[test]
    fn put_job_group_policy_overwrites_only_that_group() {
        let backend = MemoryBackend::new();
        backend
            .put_job_policy("api", groups(&[("web", 30), ("worker", 60)]))
            .unwrap();
        backend.put_job_group_policy("api", "web", policy(90)).unwrap();

        let job = backend.get_job_policy("api").unwrap().unwrap();
        assert_eq!(job.len(), 2);
        assert_eq!(job["web"], policy(90));
        assert_eq!(job["worker"], policy(60));
    }

    #[test]
    fn put_job_policy_replaces_all_groups() {
        let backend = MemoryBackend::new();
        backend
            .put_job_policy("api", groups(&[("a", 30), ("b", 30)]))
            .unwrap();
        backend.put_job_policy("api", groups(&[("c", 45)])).unwrap();

        let job = backend.get_job_policy("api").unwrap().unwrap();
        assert_eq!(*job, groups(&[("c", 45)]));
        assert!(backend.get_job_group_policy("api", "a").unwrap().is_none());
    }

    #[test]
    fn delete_unknown_job_is_noop() {
        let backend = MemoryBackend::new();
        backend.put_job_policy("api", groups(&[("web", 30)])).unwrap();

        backend.delete_job_policy("missing").unwrap();
        backend.delete_job_group_policy("missing", "web").unwrap();
        backend.delete_job_group_policy("api", "missing").unwrap();

        let all = backend.get_policies().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(*all["api"], groups(&[("web", 30)]));
    }

    #[test]
    fn delete_job_policy_removes_job() {
        let backend = MemoryBackend::new();
        backend.put_job_policy("api", groups(&[("web", 30)])).unwrap();
        backend.put_job_policy("db", groups(&[("primary", 30)])).unwrap();

        backend.delete_job_policy("api").unwrap();

        assert!(backend.get_job_policy("api").unwrap().is_none());
        assert_eq!(backend.job_count(), 1);
    }

    #[test]
    fn deleting_last_group_keeps_empty_job_entry() {
        let backend = MemoryBackend::new();
        backend.put_job_group_policy("api", "web", policy(30)).unwrap();
        backend.delete_job_group_policy("api", "web").unwrap();

        let job = backend.get_job_policy("api").unwrap().unwrap();
        assert!(job.is_empty());
    }

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let backend = MemoryBackend::new();
        backend.put_job_policy("api", groups(&[("web", 30)])).unwrap();

        let before = backend.get_policies().unwrap();
        let job_before = backend.get_job_policy("api").unwrap().unwrap();

        backend.put_job_group_policy("api", "worker", policy(60)).unwrap();
        backend.put_job_group_policy("api", "web", policy(5)).unwrap();
        backend.delete_job_policy("api").unwrap();

        assert_eq!(*before["api"], groups(&[("web", 30)]));
        assert_eq!(*job_before, groups(&[("web", 30)]));
    }

    #[test]
    fn concurrent_writers_never_tear_reads() {
        let backend = MemoryBackend::new();
        backend
            .put_job_policy("api", groups(&[("a", 1), ("b", 1)]))
            .unwrap();

        // Writers always store both groups with the same cooldown, so any
        // consistent snapshot has matching values.
        let writers: Vec<_> = (0..4u64)
            .map(|w| {
                let b = backend.clone();
                std::thread::spawn(move || {
                    for i in 0..500u64 {
                        let c = w * 1000 + i;
                        b.put_job_policy("api", groups(&[("a", c), ("b", c)])).unwrap();
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let b = backend.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let all = b.get_policies().unwrap();
                        let job = &all["api"];
                        assert_eq!(job.len(), 2);
                        assert_eq!(job["a"].cooldown, job["b"].cooldown);
                    }
                })
            })
            .collect();

        for h in writers.into_iter().chain(readers) {
            h.join().unwrap();
        }
    }

    #[test]
    fn operations_report_timings() {
        let recorder = TimingRecorder::new();
        let backend = MemoryBackend::new().with_metrics(Arc::new(recorder.clone()));

        backend.put_job_group_policy("api", "web", policy(30)).unwrap();
        backend.get_policies().unwrap();
        backend.get_policies().unwrap();
        backend.delete_job_policy("api").unwrap();

        assert_eq!(recorder.stats("policy.memory.get_policies").unwrap().count, 2);
        assert_eq!(
            recorder.stats("policy.memory.put_job_group_policy").unwrap().count,
            1
        );
        assert_eq!(recorder.stats("policy.memory.delete_job_policy").unwrap().count, 1);
        assert!(recorder.stats("policy.memory.put_job_policy").is_none());
    }
}
