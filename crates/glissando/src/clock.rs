//! Output clock: seconds since the device was first resumed, minus time
//! spent suspended.

use std::time::Duration;

use tokio::time::Instant;

/// Suspendable monotonic clock.
///
/// A new clock is suspended at zero, the way an output device sits idle
/// until something resumes it.
#[derive(Debug, Clone, Default)]
pub struct OutputClock {
    /// When the clock was last resumed (None while suspended)
    resumed_at: Option<Instant>,

    /// Time accumulated before the last resume
    banked: Duration,
}

impl OutputClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    /// Start advancing from the current position.
    pub fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }

    /// Stop advancing without losing position.
    pub fn suspend(&mut self) {
        if let Some(resumed_at) = self.resumed_at.take() {
            self.banked += resumed_at.elapsed();
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self.resumed_at {
            Some(resumed_at) => self.banked + resumed_at.elapsed(),
            None => self.banked,
        }
    }

    /// Current position in seconds.
    pub fn now(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}
