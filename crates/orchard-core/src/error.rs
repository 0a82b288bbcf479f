//! Subscription errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use orchard_db::DbError;
use orchard_types::SubscriptionStatus;

use crate::pricing::PricingError;

/// Errors returned by the scheduling core
#[derive(Error, Debug)]
pub enum SubscriptionError {
    /// Bad input shape or range
    #[error("validation failed: {0}")]
    Validation(String),

    /// Subscription ID unknown
    #[error("subscription not found")]
    SubscriptionNotFound,

    /// Admin pause ID unknown
    #[error("admin pause not found")]
    AdminPauseNotFound,

    /// Operation not legal from the current status
    #[error("cannot {action} a subscription that is {from}")]
    InvalidStateTransition {
        /// Status the subscription was in
        from: SubscriptionStatus,
        /// What was attempted
        action: &'static str,
    },

    /// Pause requested too close to the next delivery
    #[error("notice period violation: {0}")]
    NoticePeriodViolation(String),

    /// Reactivation attempted after the deadline; the subscription is now expired
    #[error("reactivation window expired on {deadline}")]
    ReactivationWindowExpired {
        /// The missed deadline
        deadline: DateTime<Utc>,
    },

    /// Storage collaborator unreachable or failing
    #[error("datastore unavailable: {0}")]
    DatastoreUnavailable(String),

    /// Another writer updated the subscription first
    #[error("subscription was modified concurrently")]
    ConcurrentModification,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl SubscriptionError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::SubscriptionNotFound | Self::AdminPauseNotFound => 404,
            Self::InvalidStateTransition { .. }
            | Self::ConcurrentModification
            | Self::ReactivationWindowExpired { .. } => 409,
            Self::NoticePeriodViolation(_) => 423,
            Self::DatastoreUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            Self::AdminPauseNotFound => "ADMIN_PAUSE_NOT_FOUND",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::NoticePeriodViolation(_) => "NOTICE_PERIOD_VIOLATION",
            Self::ReactivationWindowExpired { .. } => "REACTIVATION_WINDOW_EXPIRED",
            Self::DatastoreUnavailable(_) => "DATASTORE_UNAVAILABLE",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SubscriptionNotFound | Self::AdminPauseNotFound)
    }

    pub(crate) fn invalid_transition(from: SubscriptionStatus, action: &'static str) -> Self {
        Self::InvalidStateTransition { from, action }
    }
}

impl From<DbError> for SubscriptionError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => Self::SubscriptionNotFound,
            DbError::VersionConflict { id, expected } => {
                tracing::warn!(subscription_id = %id, expected, "Version conflict");
                Self::ConcurrentModification
            }
            DbError::Decode(msg) => {
                tracing::error!("Corrupt row: {}", msg);
                Self::Internal(msg)
            }
            other => {
                tracing::error!("Database error: {}", other);
                Self::DatastoreUnavailable(other.to_string())
            }
        }
    }
}

impl From<PricingError> for SubscriptionError {
    fn from(err: PricingError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result alias for core operations
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;
