//! Orchard Core - Subscription lifecycle and delivery scheduling
//!
//! Core scheduling functionality including pricing, delivery calendars,
//! the subscription state machine, admin pauses and notifications.
//!
//! # Example
//!
//! ```rust,ignore
//! use orchard_core::{
//!     LogNotificationSender, NotificationDispatcher, SchedulerConfig, SubscriptionService,
//!     SystemClock,
//! };
//! use orchard_db::Repositories;
//!
//! let config = SchedulerConfig::new().with_cutoff_hour(18);
//! let (dispatcher, handle) =
//!     NotificationDispatcher::new(Arc::new(LogNotificationSender), config.notify_queue_size);
//!
//! let service = SubscriptionService::new(repos, config, Arc::new(SystemClock), dispatcher);
//!
//! // Create a subscription
//! let created = service.create_subscription(request).await?;
//!
//! // Pause it
//! let paused = service.pause_subscription(created.subscription.id, None).await?;
//! ```

pub mod admin_pause;
pub mod bulk;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod planner;
pub mod pricing;
pub mod schedule;
pub mod service;
mod store;

pub use admin_pause::{
    AdminPauseApplied, AdminPauseCoordinator, AdminPauseLifted, CreateAdminPauseRequest,
};
pub use bulk::{BulkFailure, BulkOutcome, ItemOutcome};
pub use clock::{Clock, SystemClock};
pub use config::{parse_utc_offset, CadenceConfig, ConfigParseError, SchedulerConfig};
pub use error::{SubscriptionError, SubscriptionResult};
pub use lifecycle::{AdminReactivation, ReactivationOutcome, SubscriptionLifecycle};
pub use notify::{
    DispatcherHandle, LogNotificationSender, NotificationDispatcher, NotificationKind,
    NotificationSender, NotifyError, SubscriptionEvent, WebhookNotificationSender,
};
pub use planner::DeliveryPlanner;
pub use pricing::{calculate_subscription_pricing, PricingBreakdown, PricingError};
pub use schedule::{
    CadencePolicy, DailyCadence, FirstDelivery, FixedOffsetsCadence, ScheduleGenerator,
    ScheduleSettings,
};
pub use service::{
    CreateSubscriptionRequest, CreatedSubscription, PausedSubscription, ReactivatedSubscription,
    ServiceRepos, SubscriptionService,
};
