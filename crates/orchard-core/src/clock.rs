//! Wall-clock source

use chrono::{DateTime, Utc};

/// Source of "now" for every time-dependent rule
pub trait Clock: Send + Sync {
    fn utc_now(&self) -> DateTime<Utc>;
}

/// The system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
