//! Scale history — last scaling action per job group.
//!
//! Scalers record every action they take here and answer cooldown
//! queries from it. A group is in cooldown while `now < last + cooldown`;
//! at exactly `last + cooldown` it is eligible again.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use tracing::debug;

use warpgrid_policy::{GroupId, JobId};

/// Thread-safe record of the most recent scale event per job group.
#[derive(Debug, Clone, Default)]
pub struct ScaleHistory {
    last: Arc<RwLock<HashMap<(JobId, GroupId), SystemTime>>>,
}

impl ScaleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scaling action on `group` of `job` at `at`.
    pub fn record_scale(&self, job: &str, group: &str, at: SystemTime) {
        self.last
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((job.to_string(), group.to_string()), at);
        debug!(%job, %group, "scale event recorded");
    }

    /// Time of the last recorded action, if any.
    pub fn last_scale(&self, job: &str, group: &str) -> Option<SystemTime> {
        self.last
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(job.to_string(), group.to_string()))
            .copied()
    }

    /// Drop every record for `job`.
    pub fn forget_job(&self, job: &str) {
        self.last
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(j, _), _| j != job);
    }

    /// Whether `group` of `job` is still inside its cooldown window at `now`.
    ///
    /// Groups that never scaled are never in cooldown.
    pub fn is_in_cooldown(&self, job: &str, group: &str, cooldown: Duration, now: SystemTime) -> bool {
        match self.last_scale(job, group) {
            None => false,
            Some(last) => match last.checked_add(cooldown) {
                Some(until) => now < until,
                None => true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn never_scaled_is_not_in_cooldown() {
        let history = ScaleHistory::new();
        assert!(!history.is_in_cooldown("api", "web", Duration::from_secs(60), at(1000)));
    }

    #[test]
    fn cooldown_boundary_is_exact() {
        let history = ScaleHistory::new();
        history.record_scale("api", "web", at(1000));
        let cooldown = Duration::from_secs(30);
        let elapse = at(1030);

        assert!(!history.is_in_cooldown("api", "web", cooldown, elapse));
        assert!(history.is_in_cooldown(
            "api",
            "web",
            cooldown,
            elapse - Duration::from_nanos(1)
        ));
    }

    #[test]
    fn latest_record_wins() {
        let history = ScaleHistory::new();
        history.record_scale("api", "web", at(1000));
        history.record_scale("api", "web", at(2000));

        assert_eq!(history.last_scale("api", "web"), Some(at(2000)));
        assert!(history.is_in_cooldown("api", "web", Duration::from_secs(60), at(2030)));
    }

    #[test]
    fn groups_are_tracked_independently() {
        let history = ScaleHistory::new();
        history.record_scale("api", "web", at(1000));

        assert!(history.is_in_cooldown("api", "web", Duration::from_secs(60), at(1010)));
        assert!(!history.is_in_cooldown("api", "worker", Duration::from_secs(60), at(1010)));
    }

    #[test]
    fn forget_job_clears_all_groups() {
        let history = ScaleHistory::new();
        history.record_scale("api", "web", at(1000));
        history.record_scale("api", "worker", at(1000));
        history.record_scale("db", "primary", at(1000));

        history.forget_job("api");

        assert!(history.last_scale("api", "web").is_none());
        assert!(history.last_scale("api", "worker").is_none());
        assert!(history.last_scale("db", "primary").is_some());
    }
}
