//! Loop lifecycle — the autoscaler's run phase and pass gate.
//!
//! One mutex-guarded value holds both the phase and the "pass in
//! progress" flag, so the tick routine and the drain routine always agree
//! on what they observe.
//!
//! ```text
//! Idle ──mark_running──▶ Running ──request_stop──▶ Draining ──mark_stopped──▶ Stopped
//!   └─────────────────request_stop────────────────────┘
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Phase of the autoscaling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, loop not started yet.
    Idle,
    /// Loop consuming ticks.
    Running,
    /// Stop requested; waiting for the loop and any pass to finish.
    Draining,
    /// Fully drained. Terminal.
    Stopped,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    loop_active: bool,
    in_progress: bool,
}

/// Shared lifecycle state of one autoscaler instance.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<State>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                phase: Phase::Idle,
                loop_active: false,
                in_progress: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Enter `Running`. Only succeeds once, from `Idle`.
    pub fn mark_running(&self) -> bool {
        let mut state = self.lock();
        if state.phase != Phase::Idle {
            return false;
        }
        state.phase = Phase::Running;
        state.loop_active = true;
        true
    }

    /// Record that the tick loop has returned.
    pub fn mark_loop_exited(&self) {
        self.lock().loop_active = false;
    }

    /// Enter `Draining`. Returns false if a stop was already requested.
    pub fn request_stop(&self) -> bool {
        let mut state = self.lock();
        match state.phase {
            Phase::Idle | Phase::Running => {
                state.phase = Phase::Draining;
                true
            }
            Phase::Draining | Phase::Stopped => false,
        }
    }

    /// Enter the terminal `Stopped` phase.
    pub fn mark_stopped(&self) {
        let mut state = self.lock();
        state.phase = Phase::Stopped;
        state.loop_active = false;
    }

    /// True while the tick loop is consuming ticks.
    pub fn is_running(&self) -> bool {
        self.lock().loop_active
    }

    /// Claim the pass gate. Returns false if a pass is already in progress.
    pub fn begin_pass(&self) -> bool {
        let mut state = self.lock();
        if state.in_progress {
            return false;
        }
        state.in_progress = true;
        true
    }

    /// Release the pass gate.
    pub fn end_pass(&self) {
        self.lock().in_progress = false;
    }

    pub fn pass_in_progress(&self) -> bool {
        self.lock().in_progress
    }

    /// True once the loop has exited and no pass is running.
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        !state.loop_active && !state.in_progress
    }
}

/// Releases the pass gate when dropped, so early returns cannot leak it.
pub(crate) struct PassGuard<'a> {
    lifecycle: &'a Lifecycle,
}

impl<'a> PassGuard<'a> {
    pub(crate) fn acquire(lifecycle: &'a Lifecycle) -> Option<Self> {
        lifecycle.begin_pass().then(|| Self { lifecycle })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.end_pass();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_not_running() {
        let lc = Lifecycle::new();
        assert_eq!(lc.phase(), Phase::Idle);
        assert!(!lc.is_running());
        assert!(lc.is_drained());
    }

    #[test]
    fn full_transition_sequence() {
        let lc = Lifecycle::new();
        assert!(lc.mark_running());
        assert_eq!(lc.phase(), Phase::Running);
        assert!(lc.is_running());

        assert!(lc.request_stop());
        assert_eq!(lc.phase(), Phase::Draining);
        assert!(!lc.is_drained());

        lc.mark_loop_exited();
        assert!(lc.is_drained());

        lc.mark_stopped();
        assert_eq!(lc.phase(), Phase::Stopped);
    }

    #[test]
    fn cannot_restart() {
        let lc = Lifecycle::new();
        assert!(lc.mark_running());
        assert!(!lc.mark_running());

        lc.request_stop();
        lc.mark_stopped();
        assert!(!lc.mark_running());
        assert!(!lc.is_running());
    }

    #[test]
    fn second_stop_request_is_rejected() {
        let lc = Lifecycle::new();
        lc.mark_running();
        assert!(lc.request_stop());
        assert!(!lc.request_stop());
        lc.mark_stopped();
        assert!(!lc.request_stop());
    }

    #[test]
    fn stop_before_run_blocks_later_run() {
        let lc = Lifecycle::new();
        assert!(lc.request_stop());
        assert!(!lc.mark_running());
    }

    #[test]
    fn pass_gate_is_exclusive() {
        let lc = Lifecycle::new();
        assert!(lc.begin_pass());
        assert!(!lc.begin_pass());
        assert!(lc.pass_in_progress());
        lc.end_pass();
        assert!(lc.begin_pass());
    }

    #[test]
    fn pass_guard_releases_on_drop() {
        let lc = Lifecycle::new();
        {
            let _guard = PassGuard::acquire(&lc).unwrap();
            assert!(PassGuard::acquire(&lc).is_none());
            assert!(!lc.is_drained());
        }
        assert!(!lc.pass_in_progress());
        assert!(lc.is_drained());
    }

    #[test]
    fn failed_acquire_keeps_running_pass_gated() {
        let lc = Lifecycle::new();
        let _running = PassGuard::acquire(&lc).unwrap();

        assert!(PassGuard::acquire(&lc).is_none());
        assert!(lc.pass_in_progress());
        assert!(PassGuard::acquire(&lc).is_none());
        assert!(lc.pass_in_progress());
    }
}
