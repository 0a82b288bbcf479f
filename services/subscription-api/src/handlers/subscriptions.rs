//! Subscription handlers

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use orchard_core::{
    CreateSubscriptionRequest, CreatedSubscription, PausedSubscription, PricingBreakdown,
    ReactivatedSubscription,
};
use orchard_types::{
    Delivery, DeliveryAddress, DeliveryFrequency, PlanId, Subscription, SubscriptionItem,
};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::{
    parse_subscription_id, parse_user_id, record_op_duration, validate_reason,
};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionBody {
    pub user_id: String,
    pub plan_id: String,
    pub customer_email: Option<String>,
    pub delivery_frequency: String,
    pub duration_months: u32,
    pub base_price: Decimal,
    pub items: Vec<SubscriptionItem>,
    pub delivery_address: DeliveryAddress,
}

impl CreateSubscriptionBody {
    fn into_request(self) -> ApiResult<CreateSubscriptionRequest> {
        let user_id = parse_user_id(&self.user_id)?;
        let plan_id = PlanId::parse(&self.plan_id)
            .map_err(|_| ApiError::BadRequest("Invalid plan_id".into()))?;
        let delivery_frequency: DeliveryFrequency =
            self.delivery_frequency.parse().map_err(|_| {
                ApiError::BadRequest(format!(
                    "Invalid delivery_frequency: {}",
                    self.delivery_frequency
                ))
            })?;

        Ok(CreateSubscriptionRequest {
            user_id,
            plan_id,
            customer_email: self.customer_email.filter(|e| !e.trim().is_empty()),
            delivery_frequency,
            duration_months: self.duration_months,
            base_price: self.base_price,
            items: self.items,
            delivery_address: self.delivery_address,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PauseBody {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReactivateBody {
    /// Requested resume day in operational local time
    pub reactivation_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteBody {
    pub base_price: Decimal,
    pub duration_months: u32,
}

#[derive(Debug, Serialize)]
pub struct DeliveriesResponse {
    pub subscription_id: String,
    pub deliveries: Vec<Delivery>,
}

#[derive(Debug, Serialize)]
pub struct UserSubscriptionsResponse {
    pub user_id: String,
    pub subscriptions: Vec<Subscription>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/subscriptions
#[instrument(skip(state, body), fields(user_id = %body.user_id))]
pub async fn create_subscription(
    State(state): State<AppState>,
    Json(body): Json<CreateSubscriptionBody>,
) -> ApiResult<(StatusCode, Json<CreatedSubscription>)> {
    let start = Instant::now();
    let request = body.into_request()?;
    let frequency = request.delivery_frequency;

    let result = state.subscriptions.create_subscription(request).await;
    record_op_duration("create_subscription", start, result.is_ok());
    let created = result?;

    metrics::counter!("subscriptions_created_total", "frequency" => frequency.as_str())
        .increment(1);

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/subscriptions/{id}
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Subscription>> {
    let id = parse_subscription_id(&id)?;
    let subscription = state.subscriptions.get_subscription(id).await?;
    Ok(Json(subscription))
}

/// POST /api/v1/subscriptions/{id}/pause
#[instrument(skip(state, body))]
pub async fn pause_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<PauseBody>>,
) -> ApiResult<Json<PausedSubscription>> {
    let start = Instant::now();
    let id = parse_subscription_id(&id)?;
    let Json(body) = body.unwrap_or_default();
    if let Some(reason) = body.reason.as_deref() {
        validate_reason(reason)?;
    }

    let result = state.subscriptions.pause_subscription(id, body.reason).await;
    record_op_duration("pause_subscription", start, result.is_ok());
    let paused = result?;

    metrics::counter!("subscriptions_paused_total").increment(1);

    Ok(Json(paused))
}

/// POST /api/v1/subscriptions/{id}/reactivate
#[instrument(skip(state, body))]
pub async fn reactivate_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ReactivateBody>>,
) -> ApiResult<Json<ReactivatedSubscription>> {
    let start = Instant::now();
    let id = parse_subscription_id(&id)?;
    let Json(body) = body.unwrap_or_default();

    let result = state
        .subscriptions
        .reactivate_subscription(id, body.reactivation_date)
        .await;
    record_op_duration("reactivate_subscription", start, result.is_ok());
    let reactivated = result?;

    metrics::counter!("subscriptions_reactivated_total").increment(1);

    Ok(Json(reactivated))
}

/// GET /api/v1/subscriptions/{id}/deliveries
pub async fn list_deliveries(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeliveriesResponse>> {
    let id = parse_subscription_id(&id)?;
    let deliveries = state.subscriptions.list_deliveries(id).await?;
    Ok(Json(DeliveriesResponse {
        subscription_id: id.to_string(),
        deliveries,
    }))
}

/// GET /api/v1/users/{user_id}/subscriptions
pub async fn list_user_subscriptions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserSubscriptionsResponse>> {
    let user_id = parse_user_id(&user_id)?;
    let subscriptions = state.subscriptions.list_user_subscriptions(user_id).await?;
    Ok(Json(UserSubscriptionsResponse {
        user_id: user_id.to_string(),
        subscriptions,
    }))
}

/// POST /api/v1/pricing/quote
pub async fn quote_pricing(
    State(state): State<AppState>,
    Json(body): Json<QuoteBody>,
) -> ApiResult<Json<PricingBreakdown>> {
    let pricing = state
        .subscriptions
        .quote_pricing(body.base_price, body.duration_months)?;
    Ok(Json(pricing))
}
