//! Maintenance handlers
//!
//! Triggered by an external scheduler (cron, k8s CronJob). Each run is
//! idempotent; re-running after a partial failure picks up what is left.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiResult;
use crate::handlers::shared::{parse_subscription_id, record_op_duration, BulkResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RegeneratedResponse {
    pub subscription_id: String,
    pub deliveries_written: u64,
}

/// POST /api/v1/maintenance/expire-pauses
#[instrument(skip(state))]
pub async fn expire_overdue_pauses(
    State(state): State<AppState>,
) -> ApiResult<Json<BulkResponse>> {
    let start = Instant::now();
    let result = state.subscriptions.expire_overdue_pauses().await;
    record_op_duration("expire_overdue_pauses", start, result.is_ok());
    Ok(Json(result?.into()))
}

/// POST /api/v1/maintenance/regenerate-schedules
#[instrument(skip(state))]
pub async fn regenerate_schedules(
    State(state): State<AppState>,
) -> ApiResult<Json<BulkResponse>> {
    let start = Instant::now();
    let result = state.subscriptions.regenerate_schedules().await;
    record_op_duration("regenerate_schedules", start, result.is_ok());
    Ok(Json(result?.into()))
}

/// POST /api/v1/maintenance/renewal-reminders
#[instrument(skip(state))]
pub async fn send_renewal_reminders(
    State(state): State<AppState>,
) -> ApiResult<Json<BulkResponse>> {
    let start = Instant::now();
    let result = state.subscriptions.send_renewal_reminders().await;
    record_op_duration("send_renewal_reminders", start, result.is_ok());
    Ok(Json(result?.into()))
}

/// POST /api/v1/subscriptions/{id}/schedule/regenerate
#[instrument(skip(state))]
pub async fn regenerate_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RegeneratedResponse>> {
    let start = Instant::now();
    let id = parse_subscription_id(&id)?;
    let result = state.subscriptions.regenerate_schedule(id).await;
    record_op_duration("regenerate_schedule", start, result.is_ok());

    Ok(Json(RegeneratedResponse {
        subscription_id: id.to_string(),
        deliveries_written: result?,
    }))
}
