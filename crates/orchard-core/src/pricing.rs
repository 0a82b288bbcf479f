//! Duration-based pricing
//!
//! Longer commitments earn a plateau discount. The tier for a duration is
//! the highest tier whose threshold does not exceed it.

use chrono::{DateTime, TimeZone};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use orchard_types::PricingSnapshot;

use crate::calendar::add_months;

/// Shortest subscription, in months
pub const MIN_DURATION_MONTHS: u32 = 1;

/// Longest subscription, in months
pub const MAX_DURATION_MONTHS: u32 = 12;

/// `(minimum duration, discount percent)`, ascending
const DISCOUNT_TIERS: [(u32, u32); 7] = [
    (1, 0),
    (2, 2),
    (3, 5),
    (4, 8),
    (6, 12),
    (9, 16),
    (12, 20),
];

/// Pricing input errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Duration outside 1..=12
    #[error("duration must be {MIN_DURATION_MONTHS} to {MAX_DURATION_MONTHS} months, got {0}")]
    InvalidDuration(u32),

    /// Non-positive base price
    #[error("base price must be positive, got {0}")]
    InvalidBasePrice(Decimal),
}

/// Result of a pricing calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub original_price: Decimal,
    pub discount_percentage: u32,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
}

impl PricingBreakdown {
    /// Snapshot stored on the subscription
    pub fn snapshot(&self, duration_months: u32) -> PricingSnapshot {
        PricingSnapshot {
            original_price: self.original_price,
            discount_percentage: self.discount_percentage,
            discount_amount: self.discount_amount,
            final_price: self.final_price,
            total_amount: self.final_price,
            subscription_duration: duration_months,
        }
    }
}

/// Discount percent for a duration already known to be in range
pub fn discount_percentage_for(duration_months: u32) -> u32 {
    DISCOUNT_TIERS
        .iter()
        .take_while(|(min, _)| *min <= duration_months)
        .last()
        .map_or(0, |(_, pct)| *pct)
}

/// Price a subscription of `duration_months` at `base_price` per month
pub fn calculate_subscription_pricing(
    base_price: Decimal,
    duration_months: u32,
) -> Result<PricingBreakdown, PricingError> {
    if !(MIN_DURATION_MONTHS..=MAX_DURATION_MONTHS).contains(&duration_months) {
        return Err(PricingError::InvalidDuration(duration_months));
    }
    if base_price <= Decimal::ZERO {
        return Err(PricingError::InvalidBasePrice(base_price));
    }

    let original_price = base_price * Decimal::from(duration_months);
    let discount_percentage = discount_percentage_for(duration_months);
    let discount_amount = (original_price * Decimal::from(discount_percentage)
        / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    Ok(PricingBreakdown {
        original_price,
        discount_percentage,
        discount_amount,
        final_price: original_price - discount_amount,
    })
}

/// End of the paid span: `start` plus `duration_months` calendar months
pub fn calculate_subscription_end_date<Tz: TimeZone>(
    start: DateTime<Tz>,
    duration_months: u32,
) -> DateTime<Tz> {
    add_months(start, duration_months)
}
