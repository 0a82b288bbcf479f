//! Service wiring and sample data

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use orchard_core::{
    Clock, CreateSubscriptionRequest, DispatcherHandle, NotificationDispatcher, NotificationKind,
    NotificationSender, NotifyError, SchedulerConfig, ServiceRepos, SubscriptionEvent,
    SubscriptionService,
};
use orchard_types::{
    DeliveryAddress, DeliveryFrequency, ItemId, ItemKind, PauseState, PlanId, PricingSnapshot,
    Subscription, SubscriptionId, SubscriptionItem, SubscriptionStatus, UserId,
};

use super::clock::TestClock;
use super::mock_repos::{
    MockAdminPauseRepository, MockDeliveryRepository, MockSubscriptionRepository,
};

pub type TestService = SubscriptionService<
    MockSubscriptionRepository,
    MockDeliveryRepository,
    MockAdminPauseRepository,
>;

/// Keeps every event it is handed
#[derive(Default)]
pub struct RecordingSender {
    events: Mutex<Vec<SubscriptionEvent>>,
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, event: &SubscriptionEvent) -> Result<(), NotifyError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// A service over in-memory repositories with a pinned clock
pub struct Harness {
    pub service: TestService,
    pub subscriptions: MockSubscriptionRepository,
    pub deliveries: MockDeliveryRepository,
    pub admin_pauses: MockAdminPauseRepository,
    pub clock: Arc<TestClock>,
    sender: Arc<RecordingSender>,
    handle: DispatcherHandle,
}

impl Harness {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_config(now, SchedulerConfig::default())
    }

    pub fn with_config(now: DateTime<Utc>, config: SchedulerConfig) -> Self {
        let subscriptions = MockSubscriptionRepository::new();
        let deliveries = MockDeliveryRepository::new();
        let admin_pauses = MockAdminPauseRepository::new();
        let clock = Arc::new(TestClock::at(now));
        let sender = Arc::new(RecordingSender::default());

        let (dispatcher, handle) =
            NotificationDispatcher::new(sender.clone(), config.notify_queue_size);
        let service = SubscriptionService::new(
            ServiceRepos {
                subscriptions: Arc::new(subscriptions.clone()),
                deliveries: Arc::new(deliveries.clone()),
                admin_pauses: Arc::new(admin_pauses.clone()),
            },
            config,
            clock.clone(),
            dispatcher,
        );

        Self {
            service,
            subscriptions,
            deliveries,
            admin_pauses,
            clock,
            sender,
            handle,
        }
    }

    /// Seed an active subscription directly into the repository
    pub fn seed_active(
        &self,
        user_id: UserId,
        frequency: DeliveryFrequency,
        next_delivery: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Subscription {
        let now = self.clock.utc_now();
        let sub = Subscription {
            id: SubscriptionId::new(),
            user_id,
            plan_id: PlanId::new(),
            customer_email: Some("customer@example.com".to_string()),
            status: SubscriptionStatus::Active,
            delivery_frequency: frequency,
            items: sample_items(),
            delivery_address: sample_address(),
            subscription_start_date: now,
            subscription_end_date: end,
            next_delivery_date: next_delivery,
            schedule_anchor: next_delivery,
            pricing: PricingSnapshot {
                original_price: Decimal::from(360),
                discount_percentage: 5,
                discount_amount: Decimal::from(18),
                final_price: Decimal::from(342),
                total_amount: Decimal::from(342),
                subscription_duration: 3,
            },
            pause: PauseState::None,
            admin_reactivated_at: None,
            admin_reactivated_by: None,
            renewal_notification_sent: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.subscriptions.insert_subscription(&sub);
        sub
    }

    pub fn stored(&self, id: SubscriptionId) -> Subscription {
        self.subscriptions.get(id).expect("subscription stored")
    }

    /// Stop the service and return the kinds of every notification sent
    pub async fn finish(self) -> Vec<NotificationKind> {
        drop(self.service);
        self.handle.shutdown().await;
        let events = self.sender.events.lock();
        events.iter().map(|e| e.kind).collect()
    }
}

pub fn sample_items() -> Vec<SubscriptionItem> {
    vec![SubscriptionItem {
        item_id: ItemId::new(),
        kind: ItemKind::Juice,
        name: "Beet & Carrot".to_string(),
        quantity: 1,
    }]
}

pub fn sample_address() -> DeliveryAddress {
    DeliveryAddress {
        recipient: "Asha Rao".to_string(),
        line1: "12 Park Street".to_string(),
        line2: None,
        landmark: Some("Opposite the metro gate".to_string()),
        city: "Kolkata".to_string(),
        state: "WB".to_string(),
        postal_code: "700016".to_string(),
        phone: None,
    }
}

pub fn create_request(
    user_id: UserId,
    frequency: DeliveryFrequency,
    duration_months: u32,
) -> CreateSubscriptionRequest {
    CreateSubscriptionRequest {
        user_id,
        plan_id: PlanId::new(),
        customer_email: Some("customer@example.com".to_string()),
        delivery_frequency: frequency,
        duration_months,
        base_price: Decimal::from(120),
        items: sample_items(),
        delivery_address: sample_address(),
    }
}
