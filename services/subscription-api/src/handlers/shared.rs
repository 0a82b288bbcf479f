//! Shared handler utilities
//!
//! Identifier parsing, input bounds and metrics helpers used across handlers.

use std::time::Instant;

use serde::Serialize;

use orchard_core::{BulkFailure, BulkOutcome};
use orchard_types::{AdminPauseId, SubscriptionId, UserId};

use crate::error::ApiError;

// ============================================================================
// Input Validation
// ============================================================================

/// Maximum length for free-text reasons
pub const MAX_REASON_LEN: usize = 500;

/// Default page size for admin pause listings
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Largest page size for admin pause listings
pub const MAX_LIST_LIMIT: i64 = 200;

pub fn parse_subscription_id(raw: &str) -> Result<SubscriptionId, ApiError> {
    SubscriptionId::parse(raw)
        .map_err(|_| ApiError::BadRequest("Invalid subscription_id".into()))
}

pub fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    UserId::parse(raw).map_err(|_| ApiError::BadRequest("Invalid user_id".into()))
}

pub fn parse_admin_pause_id(raw: &str) -> Result<AdminPauseId, ApiError> {
    AdminPauseId::parse(raw).map_err(|_| ApiError::BadRequest("Invalid admin_pause_id".into()))
}

/// Parse an optional identifier, treating blank input as absent
pub fn parse_optional_user_id(raw: Option<&str>) -> Result<Option<UserId>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_user_id(raw).map(Some),
        None => Ok(None),
    }
}

/// Reject oversized free text before it reaches storage
pub fn validate_reason(value: &str) -> Result<(), ApiError> {
    if value.chars().count() > MAX_REASON_LEN {
        return Err(ApiError::BadRequest(format!(
            "reason too long (max {MAX_REASON_LEN} chars)"
        )));
    }
    Ok(())
}

/// Resolve a requested page size
pub fn list_limit(requested: Option<i64>) -> Result<i64, ApiError> {
    match requested {
        None => Ok(DEFAULT_LIST_LIMIT),
        Some(limit) if (1..=MAX_LIST_LIMIT).contains(&limit) => Ok(limit),
        Some(_) => Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        ))),
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Summary of a bulk run as returned over HTTP
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub processed_count: u32,
    pub skipped_count: u32,
    pub failed_count: usize,
    pub errors: Vec<BulkFailure>,
}

impl From<BulkOutcome> for BulkResponse {
    fn from(outcome: BulkOutcome) -> Self {
        Self {
            processed_count: outcome.processed_count,
            skipped_count: outcome.skipped_count,
            failed_count: outcome.failed_count(),
            errors: outcome.errors,
        }
    }
}

// ============================================================================
// Metrics Helpers
// ============================================================================

/// Record operation duration with result label.
///
/// Labels: operation, result (ok/err)
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "subscription_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

// ============================================================================
// Tests
// ============================================================================
