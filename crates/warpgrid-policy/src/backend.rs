//! The policy backend contract.

use std::sync::Arc;

use crate::error::PolicyResult;
use crate::types::{GroupScalingPolicy, JobPolicies, ScalingPolicySet};

/// Storage for job/group scaling policies.
///
/// Every method must be safe to call concurrently. Implementations keep
/// these semantics regardless of how they persist data:
///
/// - unknown jobs or groups read as `None`, never as an error;
/// - `put_job_policy` replaces the job's whole group map;
/// - `put_job_group_policy` upserts one group, creating the job if needed;
/// - deletes of absent jobs or groups are no-ops.
///
/// Errors are reserved for backends that can actually fail (I/O, remote
/// storage). The in-memory backend never returns one.
pub trait PolicyBackend: Send + Sync {
    /// Snapshot of every job's policies.
    fn get_policies(&self) -> PolicyResult<ScalingPolicySet>;

    /// Snapshot of one job's group policies.
    fn get_job_policy(&self, job: &str) -> PolicyResult<Option<Arc<JobPolicies>>>;

    /// A single group's policy.
    fn get_job_group_policy(
        &self,
        job: &str,
        group: &str,
    ) -> PolicyResult<Option<GroupScalingPolicy>>;

    /// Replace all group policies of `job` with `policies`.
    fn put_job_policy(&self, job: &str, policies: JobPolicies) -> PolicyResult<()>;

    /// Insert or overwrite the policy of a single group.
    fn put_job_group_policy(
        &self,
        job: &str,
        group: &str,
        policy: GroupScalingPolicy,
    ) -> PolicyResult<()>;

    /// Remove one group's policy.
    fn delete_job_group_policy(&self, job: &str, group: &str) -> PolicyResult<()>;

    /// Remove every policy of `job`.
    fn delete_job_policy(&self, job: &str) -> PolicyResult<()>;
}

impl<T: PolicyBackend + ?Sized> PolicyBackend for Arc<T> {
    fn get_policies(&self) -> PolicyResult<ScalingPolicySet> {
        (**self).get_policies()
    }

    fn get_job_policy(&self, job: &str) -> PolicyResult<Option<Arc<JobPolicies>>> {
        (**self).get_job_policy(job)
    }

    fn get_job_group_policy(
        &self,
        job: &str,
        group: &str,
    ) -> PolicyResult<Option<GroupScalingPolicy>> {
        (**self).get_job_group_policy(job, group)
    }

    fn put_job_policy(&self, job: &str, policies: JobPolicies) -> PolicyResult<()> {
        (**self).put_job_policy(job, policies)
    }

    fn put_job_group_policy(
        &self,
        job: &str,
        group: &str,
        policy: GroupScalingPolicy,
    ) -> PolicyResult<()> {
        (**self).put_job_group_policy(job, group, policy)
    }

    fn delete_job_group_policy(&self, job: &str, group: &str) -> PolicyResult<()> {
        (**self).delete_job_group_policy(job, group)
    }

    fn delete_job_policy(&self, job: &str) -> PolicyResult<()> {
        (**self).delete_job_policy(job)
    }
}
