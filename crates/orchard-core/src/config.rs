//! Scheduler configuration

use std::str::FromStr;
use std::sync::Arc;

use chrono::FixedOffset;
use thiserror::Error;

use crate::calendar::DEFAULT_CUTOFF_HOUR;
use crate::lifecycle::{SubscriptionLifecycle, DEFAULT_REACTIVATION_WINDOW_MONTHS};
use crate::schedule::{
    CadencePolicy, DailyCadence, FixedOffsetsCadence, ScheduleGenerator, ScheduleSettings,
    DEFAULT_UTC_OFFSET,
};

/// Days before the end date that the renewal reminder goes out
pub const DEFAULT_RENEWAL_NOTICE_DAYS: u32 = 7;

/// Notification queue capacity
pub const DEFAULT_NOTIFY_QUEUE_SIZE: usize = 256;

/// Errors parsing scheduler settings from strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigParseError {
    #[error("invalid UTC offset '{0}', expected +HH:MM or -HH:MM")]
    UtcOffset(String),

    #[error("invalid cadence '{0}', expected 'daily' or 'offsets:0,7,14'")]
    Cadence(String),
}

/// Monthly drop pattern as configured
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CadenceConfig {
    /// Every day except Sunday
    #[default]
    Daily,
    /// Fixed day offsets into each monthly window
    Offsets(Vec<u32>),
}

impl CadenceConfig {
    pub fn policy(&self) -> Arc<dyn CadencePolicy> {
        match self {
            Self::Daily => Arc::new(DailyCadence),
            Self::Offsets(offsets) => Arc::new(FixedOffsetsCadence::new(offsets.clone())),
        }
    }
}

impl FromStr for CadenceConfig {
    type Err = ConfigParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("daily") {
            return Ok(Self::Daily);
        }
        let invalid = || ConfigParseError::Cadence(s.to_string());
        let list = s.strip_prefix("offsets:").ok_or_else(invalid)?;
        let offsets = list
            .split(',')
            .map(|part| part.trim().parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        if offsets.is_empty() {
            return Err(invalid());
        }
        Ok(Self::Offsets(offsets))
    }
}

/// Parse `+05:30` / `-03:00` style offsets
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset, ConfigParseError> {
    let invalid = || ConfigParseError::UtcOffset(s.to_string());
    let s = s.trim();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Scheduling engine configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Operational time zone
    pub utc_offset: FixedOffset,
    /// Local hour after which next-day actions are too late
    pub cutoff_hour: u32,
    /// Months a paused subscription stays reactivatable
    pub reactivation_window_months: u32,
    /// Lead time for renewal reminders
    pub renewal_notice_days: u32,
    /// Monthly drop pattern
    pub cadence: CadenceConfig,
    /// Notification queue capacity
    pub notify_queue_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            utc_offset: DEFAULT_UTC_OFFSET,
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            reactivation_window_months: DEFAULT_REACTIVATION_WINDOW_MONTHS,
            renewal_notice_days: DEFAULT_RENEWAL_NOTICE_DAYS,
            cadence: CadenceConfig::Daily,
            notify_queue_size: DEFAULT_NOTIFY_QUEUE_SIZE,
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_cutoff_hour(mut self, hour: u32) -> Self {
        self.cutoff_hour = hour;
        self
    }

    pub fn with_reactivation_window_months(mut self, months: u32) -> Self {
        self.reactivation_window_months = months;
        self
    }

    pub fn with_renewal_notice_days(mut self, days: u32) -> Self {
        self.renewal_notice_days = days;
        self
    }

    pub fn with_cadence(mut self, cadence: CadenceConfig) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_notify_queue_size(mut self, size: usize) -> Self {
        self.notify_queue_size = size;
        self
    }

    pub fn schedule_settings(&self) -> ScheduleSettings {
        ScheduleSettings {
            utc_offset: self.utc_offset,
            cutoff_hour: self.cutoff_hour,
            cadence: self.cadence.policy(),
        }
    }

    pub fn generator(&self) -> ScheduleGenerator {
        ScheduleGenerator::new(self.schedule_settings())
    }

    pub fn lifecycle(&self) -> SubscriptionLifecycle {
        SubscriptionLifecycle::new(self.generator(), self.reactivation_window_months)
    }
}
