// SPDX-License-Identifier: MIT
//! Clock seam — every wall-clock read in the engine goes through [`Clock`]
//! so streak transitions and trailing-window predicates are deterministic
//! under test.

use chrono::{DateTime, NaiveDate, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a fixed instant. Used by tests to drive streak
/// day-boundary transitions without sleeping.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Pin the clock to midday UTC on the given date.
    pub fn on_date(date: NaiveDate) -> Self {
        Self(
            date.and_hms_opt(12, 0, 0)
                .expect("midday is always a valid time")
                .and_utc(),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
