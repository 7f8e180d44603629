//! warpgrid-policy — per-job, per-group autoscaling policies.
//!
//! Defines the policy data model and the `PolicyBackend` contract the
//! autoscaler reads on every tick, plus the in-memory backend.
//!
//! # Architecture
//!
//! ```text
//! ScalingPolicySet   job   → Arc<JobPolicies>
//! JobPolicies        group → GroupScalingPolicy
//!
//! PolicyBackend (trait)
//!   └── MemoryBackend (RwLock + copy-on-write job maps)
//! ```
//!
//! Maps are `BTreeMap`s, so iteration over jobs and groups is sorted and
//! reproducible across runs.
//!
//! Reads return snapshots. A `ScalingPolicySet` obtained from
//! `get_policies()` is never changed by later writes; it shares the
//! unchanged job maps with the live store through `Arc`.

pub mod backend;
pub mod duration;
pub mod error;
pub mod memory;
pub mod types;

pub use backend::PolicyBackend;
pub use duration::{format_duration, parse_duration};
pub use error::{PolicyError, PolicyResult};
pub use memory::MemoryBackend;
pub use types::*;
