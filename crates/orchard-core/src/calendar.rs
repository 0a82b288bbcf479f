//! Calendar utilities
//!
//! Pure date arithmetic for delivery scheduling. Everything here works on
//! local operational time (`DateTime<FixedOffset>`); callers convert from and
//! to UTC at the edges.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Timelike,
    Weekday,
};

use orchard_types::DeliveryFrequency;

/// Hour of day every delivery is normalized to
pub const DELIVERY_HOUR: u32 = 8;

/// Local hour after which next-day actions are too late
pub const DEFAULT_CUTOFF_HOUR: u32 = 18;

const DELIVERY_TIME: NaiveTime = match NaiveTime::from_hms_opt(DELIVERY_HOUR, 0, 0) {
    Some(time) => time,
    None => panic!("DELIVERY_HOUR must be a valid hour"),
};

/// A local date at the fixed delivery hour
pub fn at_delivery_time(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(DELIVERY_TIME);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    offset.from_utc_datetime(&utc)
}

/// Same local day, moved to the fixed delivery hour with sub-hour fields zeroed
pub fn normalize_delivery_time(ts: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    at_delivery_time(ts.date_naive(), *ts.offset())
}

/// Add calendar months, clamping to the last day of shorter months
pub fn add_months<Tz: TimeZone>(ts: DateTime<Tz>, months: u32) -> DateTime<Tz> {
    // Only fails past the end of chrono's representable range.
    ts.clone().checked_add_months(Months::new(months)).unwrap_or(ts)
}

/// The raw next delivery after `from`: one week or one calendar month later,
/// at the delivery hour
pub fn next_delivery_candidate(
    from: DateTime<FixedOffset>,
    frequency: DeliveryFrequency,
) -> DateTime<FixedOffset> {
    let next = match frequency {
        DeliveryFrequency::Weekly => from + Duration::days(7),
        DeliveryFrequency::Monthly => add_months(from, 1),
    };
    normalize_delivery_time(next)
}

/// Roll a Sunday forward to Monday; other days are returned unchanged
pub fn skip_if_sunday(date: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    if date.weekday() == Weekday::Sun {
        date + Duration::days(1)
    } else {
        date
    }
}

/// Whether `now` is at or past the cutoff hour of its local day
pub fn is_past_cutoff(now: DateTime<FixedOffset>, cutoff_hour: u32) -> bool {
    now.hour() >= cutoff_hour
}

/// The first day a new or resumed delivery can be serviced.
///
/// Tomorrow, or the day after when `now` is past the cutoff, Sunday-skipped.
pub fn earliest_serviceable_date(
    now: DateTime<FixedOffset>,
    cutoff_hour: u32,
) -> DateTime<FixedOffset> {
    let lead_days = if is_past_cutoff(now, cutoff_hour) { 2 } else { 1 };
    let date = now.date_naive() + Duration::days(lead_days);
    skip_if_sunday(at_delivery_time(date, *now.offset()))
}

/// Iterator over successive delivery dates after a starting point.
///
/// Each step applies [`next_delivery_candidate`] then [`skip_if_sunday`] to
/// the previous output. The iterator is unbounded; take what you need.
#[derive(Debug, Clone)]
pub struct DeliveryDates {
    current: DateTime<FixedOffset>,
    frequency: DeliveryFrequency,
}

impl DeliveryDates {
    /// Dates following `start` (exclusive)
    pub fn after(start: DateTime<FixedOffset>, frequency: DeliveryFrequency) -> Self {
        Self {
            current: start,
            frequency,
        }
    }
}

impl Iterator for DeliveryDates {
    type Item = DateTime<FixedOffset>;

    fn next(&mut self) -> Option<Self::Item> {
        self.current = skip_if_sunday(next_delivery_candidate(self.current, self.frequency));
        Some(self.current)
    }
}

/// Exactly `count` delivery dates following `start`
pub fn generate_sequence(
    start: DateTime<FixedOffset>,
    frequency: DeliveryFrequency,
    count: usize,
) -> Vec<DateTime<FixedOffset>> {
    DeliveryDates::after(start, frequency).take(count).collect()
}
