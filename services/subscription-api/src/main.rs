//! Orchard Subscription API
//!
//! HTTP front for the subscription lifecycle and delivery scheduling engine.
//!
//! ## Subscription Endpoints
//!
//! - `POST /api/v1/subscriptions` - Create a subscription
//! - `GET /api/v1/subscriptions/{id}` - Get a subscription
//! - `POST /api/v1/subscriptions/{id}/pause` - Customer pause
//! - `POST /api/v1/subscriptions/{id}/reactivate` - Customer reactivation
//! - `GET /api/v1/subscriptions/{id}/deliveries` - Delivery calendar
//! - `POST /api/v1/subscriptions/{id}/schedule/regenerate` - Rebuild one calendar
//! - `GET /api/v1/users/{user_id}/subscriptions` - A user's subscriptions
//! - `POST /api/v1/pricing/quote` - Price a plan without creating it
//!
//! ## Admin Endpoints
//!
//! - `POST /api/v1/admin/pauses` - Pause many subscriptions
//! - `GET /api/v1/admin/pauses` - Recent admin pauses
//! - `GET /api/v1/admin/pauses/active` - Pause currently in effect
//! - `POST /api/v1/admin/pauses/{id}/reactivate` - Lift an admin pause
//!
//! ## Maintenance Endpoints (external cron)
//!
//! - `POST /api/v1/maintenance/expire-pauses`
//! - `POST /api/v1/maintenance/regenerate-schedules`
//! - `POST /api/v1/maintenance/renewal-reminders`
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use orchard_core::{
    LogNotificationSender, NotificationDispatcher, NotificationSender, ServiceRepos,
    SubscriptionService, SystemClock, WebhookNotificationSender,
};
use orchard_db::{PoolOptions, Repositories};

use crate::config::Config;
use crate::handlers::{health, ready};
use crate::state::AppState;

/// How long queued notifications get to drain on shutdown
const NOTIFY_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("subscription_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Orchard Subscription API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        utc_offset = %config.scheduler.utc_offset,
        cutoff_hour = config.scheduler.cutoff_hour,
        webhook_notifications = config.notify_webhook_url.is_some(),
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool and apply migrations
    let pool = orchard_db::create_pool_with_options(
        &config.database_url,
        PoolOptions {
            max_connections: config.db_max_connections,
            ..PoolOptions::default()
        },
    )
    .await?;
    orchard_db::run_migrations(&pool).await?;
    tracing::info!("Database pool created, migrations applied");

    // Notifications run on a background task
    let sender: Arc<dyn NotificationSender> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotificationSender::new(url.clone())),
        None => Arc::new(LogNotificationSender),
    };
    let (dispatcher, dispatcher_handle) =
        NotificationDispatcher::new(sender, config.scheduler.notify_queue_size);

    // Create subscription service
    let repos = Repositories::new(pool.clone());
    let service = SubscriptionService::new(
        ServiceRepos {
            subscriptions: Arc::new(repos.subscriptions),
            deliveries: Arc::new(repos.deliveries),
            admin_pauses: Arc::new(repos.admin_pauses),
        },
        config.scheduler.clone(),
        Arc::new(SystemClock),
        dispatcher,
    );

    // Create application state
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(service, pool, config);

    // Build HTTP router
    let app = build_router(state, metrics_handle);

    if let Err(e) = run_http_server(app, http_addr).await {
        tracing::error!(error = ?e, "HTTP server error");
    }

    // Router and service are gone; let queued notifications drain
    if tokio::time::timeout(NOTIFY_DRAIN_TIMEOUT, dispatcher_handle.shutdown())
        .await
        .is_err()
    {
        tracing::warn!("Timed out draining notification queue");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // API v1 routes
    let api_v1 = Router::new()
        // Subscription routes
        .route("/subscriptions", post(handlers::create_subscription))
        .route("/subscriptions/{id}", get(handlers::get_subscription))
        .route("/subscriptions/{id}/pause", post(handlers::pause_subscription))
        .route(
            "/subscriptions/{id}/reactivate",
            post(handlers::reactivate_subscription),
        )
        .route("/subscriptions/{id}/deliveries", get(handlers::list_deliveries))
        .route(
            "/subscriptions/{id}/schedule/regenerate",
            post(handlers::regenerate_schedule),
        )
        .route(
            "/users/{user_id}/subscriptions",
            get(handlers::list_user_subscriptions),
        )
        .route("/pricing/quote", post(handlers::quote_pricing))
        // Admin pause routes
        .route(
            "/admin/pauses",
            post(handlers::create_admin_pause).get(handlers::list_admin_pauses),
        )
        .route("/admin/pauses/active", get(handlers::active_admin_pause))
        .route(
            "/admin/pauses/{id}/reactivate",
            post(handlers::reactivate_admin_pause),
        )
        // Maintenance routes
        .route(
            "/maintenance/expire-pauses",
            post(handlers::expire_overdue_pauses),
        )
        .route(
            "/maintenance/regenerate-schedules",
            post(handlers::regenerate_schedules),
        )
        .route(
            "/maintenance/renewal-reminders",
            post(handlers::send_renewal_reminders),
        );

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    // Combine all routes
    Router::new()
        .nest("/api/v1", api_v1)
        .layer(middleware)
        .merge(health_routes) // Health routes without timeout
        .merge(metrics_route) // Metrics route without timeout
        .with_state(state)
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Writes touch one subscription row plus its calendar; bulk runs take longer
    let operation_buckets = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("subscription_operation_duration_seconds".to_string()),
            operation_buckets,
        )?
        .install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!(
        "subscriptions_created_total",
        "Total subscriptions created by delivery frequency"
    );
    metrics::describe_counter!(
        "subscriptions_paused_total",
        "Total customer-initiated pauses"
    );
    metrics::describe_counter!(
        "subscriptions_reactivated_total",
        "Total customer-initiated reactivations"
    );
    metrics::describe_counter!(
        "admin_pause_affected_total",
        "Subscriptions moved by admin pauses, by direction"
    );
    metrics::describe_histogram!(
        "subscription_operation_duration_seconds",
        "Subscription operation latency in seconds by operation and result"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use orchard_core::SchedulerConfig;
    use rust_decimal::Decimal;
    use serde_json::Value;
    use std::str::FromStr;
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config {
            http_port: 0,
            database_url: "postgres://localhost/orchard_test".to_string(),
            db_max_connections: 1,
            scheduler: SchedulerConfig::new(),
            notify_webhook_url: None,
            request_timeout: Duration::from_secs(5),
            metrics_enabled: false,
        }
    }

    /// Router over a pool that never connects; only handlers that stop
    /// before storage can succeed.
    fn test_router() -> Router {
        let config = test_config();
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let (dispatcher, _handle) =
            NotificationDispatcher::new(Arc::new(LogNotificationSender), 8);
        let repos = Repositories::new(pool.clone());
        let service = SubscriptionService::new(
            ServiceRepos {
                subscriptions: Arc::new(repos.subscriptions),
                deliveries: Arc::new(repos.deliveries),
                admin_pauses: Arc::new(repos.admin_pauses),
            },
            config.scheduler.clone(),
            Arc::new(SystemClock),
            dispatcher,
        );
        build_router(AppState::new(service, pool, config), None)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(
            test_router(),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "subscription-api");
    }

    #[tokio::test]
    async fn test_quote_pricing() {
        let (status, body) = send(
            test_router(),
            post_json(
                "/api/v1/pricing/quote",
                serde_json::json!({ "base_price": "120.00", "duration_months": 3 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["discount_percentage"], 5);
        let final_price = Decimal::from_str(body["final_price"].as_str().unwrap()).unwrap();
        assert_eq!(final_price, Decimal::from(342));
    }

    #[tokio::test]
    async fn test_quote_out_of_range_duration() {
        let (status, body) = send(
            test_router(),
            post_json(
                "/api/v1/pricing/quote",
                serde_json::json!({ "base_price": "120.00", "duration_months": 13 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_subscription_id() {
        let (status, body) = send(
            test_router(),
            Request::get("/api/v1/subscriptions/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert_eq!(body["error"]["message"], "Bad request: Invalid subscription_id");
    }

    #[tokio::test]
    async fn test_list_limit_out_of_range() {
        let (status, body) = send(
            test_router(),
            Request::get("/api/v1/admin/pauses?limit=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_unknown_pause_type() {
        let (status, _) = send(
            test_router(),
            post_json(
                "/api/v1/admin/pauses",
                serde_json::json!({ "pause_type": "some", "reason": "monsoon" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = test_router()
            .oneshot(
                Request::get("/api/v1/subscriptions/not-a-uuid")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("x-request-id").unwrap(),
            "req-123"
        );
    }
}
