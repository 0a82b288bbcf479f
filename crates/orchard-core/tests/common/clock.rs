//! Controllable clock

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use parking_lot::Mutex;

use orchard_core::Clock;

/// Local operational offset used throughout the tests (+05:30)
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
}

/// A local wall-clock time in the operational offset, as UTC
pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    ist().with_ymd_and_hms(y, m, d, h, min, 0).unwrap().to_utc()
}

pub struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock() = now;
    }

    #[allow(dead_code)]
    pub fn advance(&self, duration: Duration) {
        *self.0.lock() += duration;
    }
}

impl Clock for TestClock {
    fn utc_now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}
