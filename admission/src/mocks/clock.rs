//! Settable mock clock.

use chrono::{DateTime, Duration, Utc};
use presence_core::clock::Clock;
use std::sync::{Arc, Mutex};

/// Controllable time source for tests.
#[derive(Clone, Debug)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// A clock frozen at `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    /// Move the clock forward (or backward, with a negative duration).
    pub fn advance(&self, delta: Duration) {
        match self.now.lock() {
            Ok(mut guard) => *guard = *guard + delta,
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                *guard = *guard + delta;
            }
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
