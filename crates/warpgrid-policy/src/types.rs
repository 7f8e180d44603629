//! Policy domain types.
//!
//! A job owns one or more groups; each group carries its own scaling
//! policy. The autoscaler core only reads `cooldown`; every other field is
//! consumed by the scaler that computes and applies scaling actions.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier of a job tracked by the orchestrator.
pub type JobId = String;

/// Identifier of a group within a job.
pub type GroupId = String;

/// Policies for every group of a single job: group → policy.
pub type JobPolicies = BTreeMap<GroupId, GroupScalingPolicy>;

/// All known policies: job → group policies.
///
/// Job maps are shared with the store through `Arc`; holders of a
/// `ScalingPolicySet` see a fixed snapshot.
pub type ScalingPolicySet = BTreeMap<JobId, Arc<JobPolicies>>;

/// Default cooldown between two scaling actions on the same group.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(180);

/// Scaling policy for a single job group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroupScalingPolicy {
    /// Whether the scaler should act on this group at all.
    pub enabled: bool,
    /// Minimum time between scaling actions on this group.
    #[serde(with = "crate::duration::serde_str")]
    pub cooldown: Duration,
    /// Lower bound on the group count.
    pub min_count: u32,
    /// Upper bound on the group count.
    pub max_count: u32,
    /// Instances added per scale-out action.
    pub scale_out_count: u32,
    /// Instances removed per scale-in action.
    pub scale_in_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_out_cpu_percentage_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_out_memory_percentage_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_in_cpu_percentage_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_in_memory_percentage_threshold: Option<f64>,
}

impl Default for GroupScalingPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown: DEFAULT_COOLDOWN,
            min_count: 2,
            max_count: 10,
            scale_out_count: 1,
            scale_in_count: 1,
            scale_out_cpu_percentage_threshold: None,
            scale_out_memory_percentage_threshold: None,
            scale_in_cpu_percentage_threshold: None,
            scale_in_memory_percentage_threshold: None,
        }
    }
}

impl GroupScalingPolicy {
    /// Convenience constructor for a default policy with a given cooldown.
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown,
            ..Self::default()
        }
    }
}
