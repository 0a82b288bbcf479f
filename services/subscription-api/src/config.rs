//! Configuration for the Subscription API service.

use std::time::Duration;

use orchard_core::{parse_utc_offset, CadenceConfig, SchedulerConfig};

/// Subscription API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub db_max_connections: u32,
    /// Scheduling engine configuration
    pub scheduler: SchedulerConfig,
    /// Webhook receiving subscription events; log-only when unset
    pub notify_webhook_url: Option<String>,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Database
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10u32)?;
        if db_max_connections == 0 {
            return Err(ConfigError::Invalid("DB_MAX_CONNECTIONS"));
        }

        // Server
        let http_port = parse_or(&lookup, "HTTP_PORT", 8080u16)?;
        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;

        // Metrics
        let metrics_enabled = lookup("METRICS_ENABLED")
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        // Scheduling
        let mut scheduler = SchedulerConfig::new();
        if let Some(offset) = lookup("OPERATIONAL_UTC_OFFSET") {
            let offset = parse_utc_offset(&offset)
                .map_err(|_| ConfigError::Invalid("OPERATIONAL_UTC_OFFSET"))?;
            scheduler = scheduler.with_utc_offset(offset);
        }
        let cutoff_hour = parse_or(&lookup, "DELIVERY_CUTOFF_HOUR", scheduler.cutoff_hour)?;
        if cutoff_hour > 23 {
            return Err(ConfigError::Invalid("DELIVERY_CUTOFF_HOUR"));
        }
        scheduler = scheduler.with_cutoff_hour(cutoff_hour);

        if let Some(cadence) = lookup("MONTHLY_CADENCE") {
            let cadence: CadenceConfig = cadence
                .parse()
                .map_err(|_| ConfigError::Invalid("MONTHLY_CADENCE"))?;
            scheduler = scheduler.with_cadence(cadence);
        }
        let renewal_notice_days =
            parse_or(&lookup, "RENEWAL_NOTICE_DAYS", scheduler.renewal_notice_days)?;
        let notify_queue_size =
            parse_or(&lookup, "NOTIFY_QUEUE_SIZE", scheduler.notify_queue_size)?;
        if notify_queue_size == 0 {
            return Err(ConfigError::Invalid("NOTIFY_QUEUE_SIZE"));
        }
        scheduler = scheduler
            .with_renewal_notice_days(renewal_notice_days)
            .with_notify_queue_size(notify_queue_size);

        // Notifications
        let notify_webhook_url = lookup("NOTIFY_WEBHOOK_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            http_port,
            database_url,
            db_max_connections,
            scheduler,
            notify_webhook_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
