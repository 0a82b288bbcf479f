//! Subscription types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AdminPauseId, DeliveryFrequency, ItemId, PlanId, PricingSnapshot, SubscriptionId,
    SubscriptionStatus, UserId,
};

/// Kind of catalog item in a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Cold-pressed juice
    Juice,
    /// Cut fruit bowl
    FruitBowl,
}

/// A selected catalog item and how many of it are delivered per drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    /// Catalog item reference
    pub item_id: ItemId,
    /// Juice or fruit bowl
    pub kind: ItemKind,
    /// Display name at the time of selection
    pub name: String,
    /// Units per delivery
    pub quantity: u32,
}

/// Delivery address snapshot taken when the subscription was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    /// Recipient name
    pub recipient: String,
    /// First address line
    pub line1: String,
    /// Second address line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// Nearby landmark for the rider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    /// City
    pub city: String,
    /// State or region
    pub state: String,
    /// Postal code
    pub postal_code: String,
    /// Contact phone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Customer-initiated pause details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPause {
    /// When the pause took effect
    pub pause_date: DateTime<Utc>,
    /// Optional reason given by the customer
    pub pause_reason: Option<String>,
    /// Last moment the subscription can be reactivated
    pub reactivation_deadline: DateTime<Utc>,
}

/// Link from a subscription to the admin pause that holds it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPauseLink {
    /// The admin pause directive
    pub admin_pause_id: AdminPauseId,
    /// Copy of the directive's start
    pub admin_pause_start: DateTime<Utc>,
    /// Copy of the directive's end; `None` means indefinite
    pub admin_pause_end: Option<DateTime<Utc>>,
}

/// Which kind of pause, if any, a subscription carries.
///
/// A subscription is never user-paused and admin-paused at the same time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PauseState {
    /// No pause details recorded
    #[default]
    None,
    /// Paused by the customer
    User(UserPause),
    /// Held by an admin pause
    Admin(AdminPauseLink),
}

/// One recurring plan instance owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID
    pub id: SubscriptionId,
    /// Owner
    pub user_id: UserId,
    /// Catalog plan
    pub plan_id: PlanId,
    /// Where notifications are sent
    pub customer_email: Option<String>,
    /// Lifecycle status
    pub status: SubscriptionStatus,
    /// Weekly or monthly
    pub delivery_frequency: DeliveryFrequency,
    /// Selected juices and fruit bowls
    pub items: Vec<SubscriptionItem>,
    /// Address snapshot
    pub delivery_address: DeliveryAddress,
    /// Start of the paid span
    pub subscription_start_date: DateTime<Utc>,
    /// End of the paid span; extended on reactivation
    pub subscription_end_date: DateTime<Utc>,
    /// The next drop
    pub next_delivery_date: DateTime<Utc>,
    /// First drop of the current schedule; monthly windows are laid from here
    pub schedule_anchor: DateTime<Utc>,
    /// Prices quoted at creation
    pub pricing: PricingSnapshot,
    /// Current pause details
    pub pause: PauseState,
    /// When an admin pause was last lifted for this subscription
    pub admin_reactivated_at: Option<DateTime<Utc>>,
    /// Operator who lifted it
    pub admin_reactivated_by: Option<UserId>,
    /// Whether the renewal reminder has gone out
    pub renewal_notification_sent: bool,
    /// Optimistic concurrency version, bumped on every write
    pub version: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Customer pause details, if user-paused
    pub fn user_pause(&self) -> Option<&UserPause> {
        match &self.pause {
            PauseState::User(pause) => Some(pause),
            _ => None,
        }
    }

    /// Admin pause link, if held by an admin pause
    pub fn admin_pause(&self) -> Option<&AdminPauseLink> {
        match &self.pause {
            PauseState::Admin(link) => Some(link),
            _ => None,
        }
    }

    /// Whether the subscription is linked to the given admin pause
    pub fn is_held_by(&self, admin_pause_id: AdminPauseId) -> bool {
        self.admin_pause()
            .is_some_and(|link| link.admin_pause_id == admin_pause_id)
    }
}
