//! Injectable time source.
//!
//! "Today" drives both invariants (single presence, capacity), so the
//! orchestrators never call `Utc::now()` directly — they read an injected
//! clock, and tests substitute a controllable one.

use chrono::{DateTime, NaiveDate, Utc};

/// Time source for the admission pipeline.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day (UTC); the bucket both invariants are scoped to.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
