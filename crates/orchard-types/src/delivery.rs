//! Delivery types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeliveryId, DeliveryStatus, SubscriptionId, SubscriptionItem};

/// One scheduled drop belonging to a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Delivery ID
    pub id: DeliveryId,
    /// Owning subscription
    pub subscription_id: SubscriptionId,
    /// Day of the drop, always at the fixed delivery hour
    pub delivery_date: DateTime<Utc>,
    /// Delivery status
    pub status: DeliveryStatus,
    /// Items as they were when the schedule was generated
    pub items: Vec<SubscriptionItem>,
    /// When the row was written
    pub created_at: DateTime<Utc>,
}
