//! Time source for the turn engine.
//!
//! Every time-driven decision (turn expiry, cooldown checks, remaining
//! seconds) reads the current instant from a [`Clock`]. Production uses
//! [`SystemClock`]; tests drive a [`ManualClock`] forward explicitly so turn
//! expiry is deterministic and nothing ever sleeps.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync + core::fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move forward by `delta`, saturating at the maximum representable time.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Move forward by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(TimeDelta::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Round a duration up to whole seconds, clamping negatives to zero.
///
/// A remaining time of 0.2s reports as 1 so that an active window never
/// reads as "0 seconds left".
pub fn ceil_seconds(delta: TimeDelta) -> u64 {
    let millis = u64::try_from(delta.num_milliseconds()).unwrap_or(0);
    millis.div_ceil(1000)
}

/// `at + delta`, saturating instead of overflowing.
pub fn saturating_add(at: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
