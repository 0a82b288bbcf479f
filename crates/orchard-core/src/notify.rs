//! Subscription event notifications
//!
//! Notifications are best-effort. Transitions hand events to a
//! [`NotificationDispatcher`], which queues them on a bounded channel and
//! delivers them from a background task, so a slow or failing channel never
//! delays or fails the transition that raised the event.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use orchard_types::{Subscription, SubscriptionId, UserId};

/// What happened to the subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    Pause,
    Reactivate,
    Expired,
    AdminPause,
    AdminReactivate,
    RenewalReminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Pause => "pause",
            Self::Reactivate => "reactivate",
            Self::Expired => "expired",
            Self::AdminPause => "admin_pause",
            Self::AdminReactivate => "admin_reactivate",
            Self::RenewalReminder => "renewal_reminder",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notification about one subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub kind: NotificationKind,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub user_email: Option<String>,
    /// Event-specific payload
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl SubscriptionEvent {
    /// Event for `sub` with empty details
    #[must_use]
    pub fn for_subscription(
        kind: NotificationKind,
        sub: &Subscription,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            subscription_id: sub.id,
            user_id: sub.user_id,
            user_email: sub.customer_email.clone(),
            details: serde_json::Value::Null,
            occurred_at,
        }
    }

    /// Attach a details payload
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Notification delivery errors
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Could not reach the channel
    #[error("transport error: {0}")]
    Transport(String),

    /// Channel answered with a failure status
    #[error("rejected with status {0}")]
    Rejected(u16),
}

/// Outbound notification channel
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, event: &SubscriptionEvent) -> Result<(), NotifyError>;
}

/// Writes events to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, event: &SubscriptionEvent) -> Result<(), NotifyError> {
        info!(
            kind = %event.kind,
            subscription_id = %event.subscription_id,
            user_id = %event.user_id,
            "Subscription notification"
        );
        Ok(())
    }
}

/// POSTs events as JSON to a webhook that fans out to email and WhatsApp
#[derive(Debug, Clone)]
pub struct WebhookNotificationSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotificationSender {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(url, client)
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookNotificationSender {
    async fn send(&self, event: &SubscriptionEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        debug!(kind = %event.kind, subscription_id = %event.subscription_id, "Notification sent");
        Ok(())
    }
}

/// Queues events for background delivery.
///
/// `dispatch` never blocks; when the queue is full the event is dropped
/// with a warning.
#[derive(Clone, Debug)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<SubscriptionEvent>,
}

impl NotificationDispatcher {
    /// Start the background task.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        buffer_size: usize,
    ) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));

        let handle = DispatcherHandle {
            task: tokio::spawn(Self::run_background(sender, rx)),
        };

        (Self { tx }, handle)
    }

    pub fn dispatch(&self, event: SubscriptionEvent) {
        if let Err(e) = self.tx.try_send(event) {
            let event = match &e {
                mpsc::error::TrySendError::Full(event)
                | mpsc::error::TrySendError::Closed(event) => event,
            };
            warn!(
                kind = %event.kind,
                subscription_id = %event.subscription_id,
                error = %e,
                "Dropping notification"
            );
        }
    }

    async fn run_background(
        sender: Arc<dyn NotificationSender>,
        mut rx: mpsc::Receiver<SubscriptionEvent>,
    ) {
        while let Some(event) = rx.recv().await {
            if let Err(e) = sender.send(&event).await {
                warn!(
                    error = %e,
                    kind = %event.kind,
                    subscription_id = %event.subscription_id,
                    "Failed to send notification"
                );
            }
        }
    }
}

/// Handle for the background dispatch task
pub struct DispatcherHandle {
    task: tokio::task::JoinHandle<()>,
}

impl DispatcherHandle {
    /// Wait for queued events to drain.
    ///
    /// Completes once every [`NotificationDispatcher`] clone has been dropped.
    pub async fn shutdown(self) {
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<NotificationKind>>);

    #[async_trait]
    impl NotificationSender for Recording {
        async fn send(&self, event: &SubscriptionEvent) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(event.kind);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl NotificationSender for Failing {
        async fn send(&self, _event: &SubscriptionEvent) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected(502))
        }
    }

    fn event(kind: NotificationKind) -> SubscriptionEvent {
        SubscriptionEvent {
            kind,
            subscription_id: SubscriptionId::new(),
            user_id: UserId::new(),
            user_email: Some("asha@example.com".to_string()),
            details: serde_json::json!({ "reason": "travel" }),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_order() {
        let sender = Arc::new(Recording::default());
        let (dispatcher, handle) = NotificationDispatcher::new(sender.clone(), 8);

        dispatcher.dispatch(event(NotificationKind::Pause));
        dispatcher.dispatch(event(NotificationKind::Reactivate));
        drop(dispatcher);
        handle.shutdown().await;

        assert_eq!(
            *sender.0.lock().unwrap(),
            vec![NotificationKind::Pause, NotificationKind::Reactivate]
        );
    }

    #[tokio::test]
    async fn test_sender_failure_is_swallowed() {
        let (dispatcher, handle) = NotificationDispatcher::new(Arc::new(Failing), 8);
        dispatcher.dispatch(event(NotificationKind::Expired));
        drop(dispatcher);
        handle.shutdown().await;
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&NotificationKind::RenewalReminder).unwrap();
        assert_eq!(json, "\"renewal_reminder\"");
        assert_eq!(NotificationKind::AdminPause.to_string(), "admin_pause");
    }
}
