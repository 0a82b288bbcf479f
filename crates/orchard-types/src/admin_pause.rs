//! Admin pause directives

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AdminPauseId, AdminPauseStatus, PauseType, UserId};

/// Operator-initiated suspension of deliveries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminPause {
    /// Admin pause ID
    pub id: AdminPauseId,
    /// Whole fleet or selected users
    pub pause_type: PauseType,
    /// Users covered when `pause_type` is `Selected`
    pub affected_user_ids: Vec<UserId>,
    /// Operator-supplied reason
    pub reason: String,
    /// Start of the suspension window
    pub start_date: DateTime<Utc>,
    /// End of the window; `None` means indefinite
    pub end_date: Option<DateTime<Utc>>,
    /// Directive status
    pub status: AdminPauseStatus,
    /// Subscriptions moved to `admin_paused` when the directive was applied
    pub affected_subscription_count: u32,
    /// Operator who created the directive
    pub created_by: Option<UserId>,
    /// When the directive was lifted
    pub reactivated_at: Option<DateTime<Utc>>,
    /// Operator who lifted the directive
    pub reactivated_by: Option<UserId>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl AdminPause {
    /// Whether the directive applies to subscriptions owned by `user_id`
    pub fn covers_user(&self, user_id: &UserId) -> bool {
        match self.pause_type {
            PauseType::All => true,
            PauseType::Selected => self.affected_user_ids.contains(user_id),
        }
    }

    /// Whether the directive is suppressing deliveries at `now`
    pub fn is_in_effect(&self, now: DateTime<Utc>) -> bool {
        self.status == AdminPauseStatus::Active
            && self.start_date <= now
            && self.end_date.map_or(true, |end| end >= now)
    }

    /// Whether the directive has no known end
    pub fn is_indefinite(&self) -> bool {
        self.end_date.is_none()
    }
}
