//! Delivery schedule generation
//!
//! A [`ScheduleGenerator`] turns a frequency, an anchor date and a span into
//! an ordered list of delivery dates. It holds no state beyond its settings,
//! so the same inputs always produce the same output. Callers persist the
//! result with delete-then-insert.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Utc};

use orchard_types::{AdminPause, DeliveryFrequency};

use crate::calendar::{
    add_months, at_delivery_time, earliest_serviceable_date, next_delivery_candidate,
    normalize_delivery_time, skip_if_sunday, DeliveryDates, DEFAULT_CUTOFF_HOUR,
};

/// India Standard Time, the default operational offset
pub const DEFAULT_UTC_OFFSET: FixedOffset = match FixedOffset::east_opt(5 * 3600 + 30 * 60) {
    Some(offset) => offset,
    None => panic!("default offset out of range"),
};

/// Which days of a monthly window receive a drop.
///
/// Offsets are whole days from the window start. Offsets past the window
/// end are ignored by the generator.
pub trait CadencePolicy: Send + Sync + fmt::Debug {
    fn day_offsets(&self, window_days: u32) -> Vec<u32>;
}

/// A drop every day; Sunday-skip turns this into Monday to Saturday
#[derive(Debug, Default, Clone, Copy)]
pub struct DailyCadence;

impl CadencePolicy for DailyCadence {
    fn day_offsets(&self, window_days: u32) -> Vec<u32> {
        (0..window_days).collect()
    }
}

/// A fixed set of day offsets per monthly window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedOffsetsCadence {
    offsets: Vec<u32>,
}

impl FixedOffsetsCadence {
    pub fn new(mut offsets: Vec<u32>) -> Self {
        offsets.sort_unstable();
        offsets.dedup();
        Self { offsets }
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }
}

impl CadencePolicy for FixedOffsetsCadence {
    fn day_offsets(&self, window_days: u32) -> Vec<u32> {
        self.offsets
            .iter()
            .copied()
            .filter(|offset| *offset < window_days)
            .collect()
    }
}

/// Everything the generator needs to know about local operations
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    /// Offset in which weekdays, cutoffs and 08:00 are evaluated
    pub utc_offset: FixedOffset,
    /// Local hour after which next-day actions are too late
    pub cutoff_hour: u32,
    /// Monthly drop pattern
    pub cadence: Arc<dyn CadencePolicy>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            utc_offset: DEFAULT_UTC_OFFSET,
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            cadence: Arc::new(DailyCadence),
        }
    }
}

/// First delivery for a new subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstDelivery {
    /// The date to deliver first
    pub date: DateTime<Utc>,
    /// Set when an admin pause moved the date
    pub advisory: Option<String>,
    /// Whole days the admin pause pushed the date back
    pub delayed_days: i64,
}

/// Computes delivery dates in the configured operational time
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator {
    settings: ScheduleSettings,
}

impl ScheduleGenerator {
    pub fn new(settings: ScheduleSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }

    /// View a UTC instant in local operational time
    pub fn to_local(&self, ts: DateTime<Utc>) -> DateTime<FixedOffset> {
        ts.with_timezone(&self.settings.utc_offset)
    }

    /// Tomorrow or the day after, depending on the cutoff
    pub fn earliest_serviceable(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        earliest_serviceable_date(self.to_local(now), self.settings.cutoff_hour).to_utc()
    }

    /// The single next delivery after `from`.
    ///
    /// Weekly plans step one week. Monthly plans start at the first cadence
    /// day on or after the earliest serviceable day.
    pub fn next_scheduled_delivery(
        &self,
        from: DateTime<Utc>,
        frequency: DeliveryFrequency,
    ) -> DateTime<Utc> {
        match frequency {
            DeliveryFrequency::Weekly => {
                skip_if_sunday(next_delivery_candidate(self.to_local(from), frequency)).to_utc()
            }
            DeliveryFrequency::Monthly => {
                let start = self.earliest_serviceable(from);
                self.generate_delivery_dates(frequency, 1, start)
                    .into_iter()
                    .next()
                    .unwrap_or(start)
            }
        }
    }

    /// Earliest date a delivery may land on for a user held by `pause`.
    ///
    /// The day after a known end, or the first 08:00 at least a week out for
    /// an indefinite pause. Sunday-skipped either way.
    pub fn admin_pause_floor(&self, pause: &AdminPause, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = match pause.end_date {
            Some(end) => {
                let day_after = self.to_local(end).date_naive() + Duration::days(1);
                at_delivery_time(day_after, self.settings.utc_offset)
            }
            None => {
                let week_out = self.to_local(now) + Duration::days(7);
                let normalized = normalize_delivery_time(week_out);
                if normalized < week_out {
                    normalized + Duration::days(1)
                } else {
                    normalized
                }
            }
        };
        skip_if_sunday(floor).to_utc()
    }

    /// Push `candidate` past `pause` when it is in effect.
    ///
    /// Returns the adjusted date and an advisory message for the caller.
    pub fn apply_admin_pause(
        &self,
        candidate: DateTime<Utc>,
        pause: Option<&AdminPause>,
        now: DateTime<Utc>,
    ) -> (DateTime<Utc>, Option<String>) {
        let Some(pause) = pause.filter(|p| p.is_in_effect(now)) else {
            return (candidate, None);
        };

        let floor = self.admin_pause_floor(pause, now);
        let date = candidate.max(floor);
        let until = match pause.end_date {
            Some(end) => format!("until {}", self.to_local(end).date_naive()),
            None => "until further notice".to_string(),
        };
        let advisory = format!(
            "Deliveries are paused {until} ({}). Your first delivery is scheduled for {}.",
            pause.reason,
            self.to_local(date).date_naive()
        );
        (date, Some(advisory))
    }

    /// First delivery for a subscription created at `now`
    pub fn first_delivery(
        &self,
        now: DateTime<Utc>,
        frequency: DeliveryFrequency,
        admin_pause: Option<&AdminPause>,
    ) -> FirstDelivery {
        let candidate = self.next_scheduled_delivery(now, frequency);
        let (date, advisory) = self.apply_admin_pause(candidate, admin_pause, now);
        FirstDelivery {
            date,
            advisory,
            delayed_days: (date - candidate).num_days().max(0),
        }
    }

    /// All delivery dates from `anchor` (inclusive) up to `end` (exclusive)
    pub fn generate_until(
        &self,
        frequency: DeliveryFrequency,
        anchor: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        let anchor = skip_if_sunday(normalize_delivery_time(self.to_local(anchor)));
        let end = self.to_local(end);

        match frequency {
            DeliveryFrequency::Weekly => std::iter::once(anchor)
                .chain(DeliveryDates::after(anchor, frequency))
                .take_while(|date| *date < end)
                .map(|date| date.to_utc())
                .collect(),
            DeliveryFrequency::Monthly => self.monthly_dates(anchor, end),
        }
    }

    /// Dates for a plan of `duration_months` starting at `anchor`
    pub fn generate_delivery_dates(
        &self,
        frequency: DeliveryFrequency,
        duration_months: u32,
        anchor: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        self.generate_until(frequency, anchor, add_months(anchor, duration_months))
    }

    fn monthly_dates(
        &self,
        anchor: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Vec<DateTime<Utc>> {
        let mut dates: Vec<DateTime<FixedOffset>> = Vec::new();

        for month in 0u32.. {
            let window_start = add_months(anchor, month);
            if window_start >= end {
                break;
            }
            let window_end = add_months(anchor, month + 1).min(end);
            // Count the end day too; a truncated window may end after 08:00
            let window_days = (window_end.date_naive() - window_start.date_naive()).num_days() + 1;
            let window_days = u32::try_from(window_days).unwrap_or(0);

            for offset in self.settings.cadence.day_offsets(window_days) {
                let day = window_start.date_naive() + Duration::days(i64::from(offset));
                let date = skip_if_sunday(at_delivery_time(day, self.settings.utc_offset));
                if date < window_start || date >= window_end {
                    continue;
                }
                if dates.last().is_some_and(|last| date <= *last) {
                    continue;
                }
                dates.push(date);
            }
        }

        dates.into_iter().map(|date| date.to_utc()).collect()
    }
}
