//! Status polling timing.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Interval and overall bound of a status poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    /// Sleep between attempts
    pub interval: Duration,
    /// No attempt starts once this much time has elapsed
    pub max_wait: Duration,
}

impl PollSettings {
    /// `interval` must be non-zero; polling rejects a zero interval.
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    /// Upper bound on attempts, `ceil(max_wait / interval)` and at least one.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return u32::MAX;
        }
        let attempts = self.max_wait.as_nanos().div_ceil(self.interval.as_nanos()).max(1);
        u32::try_from(attempts).unwrap_or(u32::MAX)
    }
}

/// Time source for polling loops.
pub trait Clock: Send {
    /// Current instant.
    fn now(&self) -> Instant;
    /// Block (or pretend to) for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock with real blocking sleeps.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock whose `sleep` only advances time.
///
/// Clones share the same timeline, so a test can keep one copy to inspect
/// how long a poll "waited".
#[derive(Clone, Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Clock starting at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Move virtual time forward.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().unwrap_or_else(|p| p.into_inner()) += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
