use std::time::Duration;

use chrono::{DateTime, Utc};

/// Minimum-interval gate keyed on wall-clock time.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: chrono::Duration,
    last: Option<DateTime<Utc>>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX),
            last: None,
        }
    }

    /// Open when nothing was recorded yet, when at least `window` has
    /// passed, or when the clock moved backwards.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        match self.last {
            None => true,
            Some(last) => {
                let elapsed = now - last;
                elapsed < chrono::Duration::zero() || elapsed >= self.window
            }
        }
    }

    pub fn record(&mut self, now: DateTime<Utc>) {
        self.last = Some(now);
    }

    /// Record and return true if open, otherwise leave untouched.
    pub fn try_acquire(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_open(now) {
            self.record(now);
            true
        } else {
            false
        }
    }

    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.last
    }
}
