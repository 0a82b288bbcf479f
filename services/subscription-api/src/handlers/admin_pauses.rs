//! Admin pause handlers
//!
//! Operator-initiated holds across many subscriptions. Both directions run
//! per subscription; partial failures come back in `errors` with a 200.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use orchard_core::CreateAdminPauseRequest;
use orchard_types::{AdminPause, PauseType};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::{
    list_limit, parse_admin_pause_id, parse_optional_user_id, parse_user_id, record_op_duration,
    validate_reason, BulkResponse,
};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAdminPauseBody {
    pub pause_type: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub reason: String,
    pub admin_user_id: Option<String>,
}

impl CreateAdminPauseBody {
    fn into_request(self) -> ApiResult<CreateAdminPauseRequest> {
        let pause_type: PauseType = self
            .pause_type
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid pause_type: {}", self.pause_type)))?;
        validate_reason(&self.reason)?;
        let user_ids = self
            .user_ids
            .iter()
            .map(|raw| parse_user_id(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CreateAdminPauseRequest {
            pause_type,
            user_ids,
            start_date: self.start_date,
            end_date: self.end_date,
            reason: self.reason,
            admin_user_id: parse_optional_user_id(self.admin_user_id.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReactivateAdminPauseBody {
    pub admin_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListAdminPausesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveAdminPauseQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminPauseCreatedResponse {
    pub admin_pause_id: String,
    pub affected_count: u32,
    pub admin_pause: AdminPause,
    #[serde(flatten)]
    pub outcome: BulkResponse,
}

#[derive(Debug, Serialize)]
pub struct AdminPauseLiftedResponse {
    pub admin_pause_id: String,
    #[serde(flatten)]
    pub outcome: BulkResponse,
}

#[derive(Debug, Serialize)]
pub struct AdminPauseListResponse {
    pub admin_pauses: Vec<AdminPause>,
}

#[derive(Debug, Serialize)]
pub struct ActiveAdminPauseResponse {
    pub admin_pause: Option<AdminPause>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/admin/pauses
#[instrument(skip(state, body), fields(pause_type = %body.pause_type))]
pub async fn create_admin_pause(
    State(state): State<AppState>,
    Json(body): Json<CreateAdminPauseBody>,
) -> ApiResult<(StatusCode, Json<AdminPauseCreatedResponse>)> {
    let start = Instant::now();
    let request = body.into_request()?;

    let result = state.subscriptions.create_admin_pause(request).await;
    record_op_duration("create_admin_pause", start, result.is_ok());
    let applied = result?;

    let affected = applied.outcome.processed_count;
    metrics::counter!("admin_pause_affected_total", "direction" => "pause")
        .increment(u64::from(affected));

    Ok((
        StatusCode::CREATED,
        Json(AdminPauseCreatedResponse {
            admin_pause_id: applied.admin_pause.id.to_string(),
            affected_count: affected,
            admin_pause: applied.admin_pause,
            outcome: applied.outcome.into(),
        }),
    ))
}

/// POST /api/v1/admin/pauses/{id}/reactivate
#[instrument(skip(state, body))]
pub async fn reactivate_admin_pause(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ReactivateAdminPauseBody>>,
) -> ApiResult<Json<AdminPauseLiftedResponse>> {
    let start = Instant::now();
    let id = parse_admin_pause_id(&id)?;
    let Json(body) = body.unwrap_or_default();
    let admin_user_id = parse_optional_user_id(body.admin_user_id.as_deref())?;

    let result = state
        .subscriptions
        .reactivate_admin_pause(id, admin_user_id)
        .await;
    record_op_duration("reactivate_admin_pause", start, result.is_ok());
    let lifted = result?;

    metrics::counter!("admin_pause_affected_total", "direction" => "reactivate")
        .increment(u64::from(lifted.outcome.processed_count));

    Ok(Json(AdminPauseLiftedResponse {
        admin_pause_id: lifted.admin_pause_id.to_string(),
        outcome: lifted.outcome.into(),
    }))
}

/// GET /api/v1/admin/pauses?limit=
pub async fn list_admin_pauses(
    State(state): State<AppState>,
    Query(query): Query<ListAdminPausesQuery>,
) -> ApiResult<Json<AdminPauseListResponse>> {
    let limit = list_limit(query.limit)?;
    let admin_pauses = state.subscriptions.list_admin_pauses(limit).await?;
    Ok(Json(AdminPauseListResponse { admin_pauses }))
}

/// GET /api/v1/admin/pauses/active?user_id=
pub async fn active_admin_pause(
    State(state): State<AppState>,
    Query(query): Query<ActiveAdminPauseQuery>,
) -> ApiResult<Json<ActiveAdminPauseResponse>> {
    let user_id = parse_optional_user_id(query.user_id.as_deref())?;
    let admin_pause = state.subscriptions.active_admin_pause(user_id).await?;
    Ok(Json(ActiveAdminPauseResponse { admin_pause }))
}
