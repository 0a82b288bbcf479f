//! Pricing snapshot stored on a subscription

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Prices as they were quoted when the subscription was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    /// Base price multiplied by the duration
    pub original_price: Decimal,
    /// Duration discount tier, in whole percent
    pub discount_percentage: u32,
    /// Amount taken off the original price
    pub discount_amount: Decimal,
    /// Original price minus discount
    pub final_price: Decimal,
    /// Amount charged to the customer
    pub total_amount: Decimal,
    /// Number of billing periods (months) paid for, 1 to 12
    pub subscription_duration: u32,
}
