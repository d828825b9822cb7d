use std::time::{Duration, Instant};

/// A single restartable deadline.
///
/// Arming an armed timer replaces its deadline; there is never more than one
/// pending expiry.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    idle: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            deadline: None,
        }
    }

    pub fn idle(&self) -> Duration {
        self.idle
    }

    /// Starts (or restarts) the idle window at `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.idle);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` once the idle window has fully elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}
