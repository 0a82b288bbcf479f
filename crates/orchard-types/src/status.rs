//! Status and frequency enums
//!
//! Every enum here is stored as a lowercase string column. `as_str` and
//! `FromStr` are the only places those strings are spelled out.

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Deliveries are being scheduled
    Active,
    /// Paused by the customer, resumable until the reactivation deadline
    Paused,
    /// Paused by an operator through an admin pause
    AdminPaused,
    /// Terminal state
    Expired,
}

impl SubscriptionStatus {
    /// Storage representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::AdminPaused => "admin_paused",
            Self::Expired => "expired",
        }
    }

    /// Whether no further transitions are possible
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "admin_paused" => Ok(Self::AdminPaused),
            "expired" => Ok(Self::Expired),
            _ => Err(ParseEnumError::new("subscription status", s)),
        }
    }
}

/// How often a subscription is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryFrequency {
    /// One drop roughly every seven days
    Weekly,
    /// Drops spread across each month according to the cadence policy
    Monthly,
}

impl DeliveryFrequency {
    /// Storage representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for DeliveryFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliveryFrequency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(ParseEnumError::new("delivery frequency", s)),
        }
    }
}

/// Status of a single scheduled drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Planned and not yet attempted
    Scheduled,
    /// Will not be delivered (subscription paused)
    Skipped,
    /// Handed to the customer
    Delivered,
    /// Attempted but not completed
    Failed,
}

impl DeliveryStatus {
    /// Storage representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Skipped => "skipped",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "skipped" => Ok(Self::Skipped),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseEnumError::new("delivery status", s)),
        }
    }
}

/// Scope of an admin pause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseType {
    /// Every subscription in the fleet
    All,
    /// Only subscriptions owned by the listed users
    Selected,
}

impl PauseType {
    /// Storage representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Selected => "selected",
        }
    }
}

impl std::fmt::Display for PauseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PauseType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "selected" => Ok(Self::Selected),
            _ => Err(ParseEnumError::new("pause type", s)),
        }
    }
}

/// Admin pause status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminPauseStatus {
    /// Currently suppressing deliveries
    Active,
    /// Lifted by an operator
    Reactivated,
}

impl AdminPauseStatus {
    /// Storage representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Reactivated => "reactivated",
        }
    }
}

impl std::fmt::Display for AdminPauseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminPauseStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "reactivated" => Ok(Self::Reactivated),
            _ => Err(ParseEnumError::new("admin pause status", s)),
        }
    }
}
