//! Delivery calendar persistence
//!
//! Future `scheduled` rows are never edited: they are deleted and written
//! again from a freshly generated schedule. Transitions treat this as a
//! secondary effect, so the `*_best_effort` variants log failures instead
//! of returning them and leave the periodic regeneration to heal the gap.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};
use uuid::Uuid;

use orchard_db::{CreateDelivery, DeliveryRepository};
use orchard_types::{Subscription, SubscriptionId};

use crate::error::SubscriptionResult;
use crate::schedule::ScheduleGenerator;

/// Writes generated schedules to the delivery repository
pub struct DeliveryPlanner<D: DeliveryRepository> {
    deliveries: Arc<D>,
    generator: ScheduleGenerator,
}

impl<D: DeliveryRepository> Clone for DeliveryPlanner<D> {
    fn clone(&self) -> Self {
        Self {
            deliveries: Arc::clone(&self.deliveries),
            generator: self.generator.clone(),
        }
    }
}

impl<D: DeliveryRepository> DeliveryPlanner<D> {
    pub fn new(deliveries: Arc<D>, generator: ScheduleGenerator) -> Self {
        Self {
            deliveries,
            generator,
        }
    }

    /// Remaining delivery dates for `sub`, on or after `now`.
    ///
    /// Generated from `schedule_anchor` to the end of the paid span. The
    /// anchor only moves on resume, so repeated runs lay the same monthly
    /// windows while a stale `next_delivery_date` rolls forward.
    pub fn schedule_for(&self, sub: &Subscription, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        self.generator
            .generate_until(
                sub.delivery_frequency,
                sub.schedule_anchor,
                sub.subscription_end_date,
            )
            .into_iter()
            .filter(|date| *date >= now)
            .collect()
    }

    /// Replace future `scheduled` rows with `dates`; returns rows written
    pub async fn replace(
        &self,
        sub: &Subscription,
        dates: &[DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> SubscriptionResult<u64> {
        let batch = dates
            .iter()
            .map(|date| CreateDelivery {
                id: Uuid::new_v4(),
                subscription_id: sub.id.0,
                delivery_date: *date,
                items: sub.items.clone(),
            })
            .collect();

        let written = self
            .deliveries
            .replace_scheduled(sub.id.0, now, batch)
            .await?;
        debug!(subscription_id = %sub.id, written, "Replaced delivery schedule");
        Ok(written)
    }

    /// [`replace`](Self::replace) that logs instead of failing
    pub async fn replace_best_effort(
        &self,
        sub: &Subscription,
        dates: &[DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> Option<u64> {
        match self.replace(sub, dates, now).await {
            Ok(written) => Some(written),
            Err(e) => {
                error!(
                    subscription_id = %sub.id,
                    error = %e,
                    "Failed to replace delivery schedule; left for regeneration"
                );
                None
            }
        }
    }

    /// Mark future `scheduled` rows as `skipped`, logging failures
    pub async fn skip_future_best_effort(
        &self,
        subscription_id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> Option<u64> {
        match self.deliveries.skip_scheduled(subscription_id.0, now).await {
            Ok(skipped) => {
                debug!(subscription_id = %subscription_id, skipped, "Skipped future deliveries");
                Some(skipped)
            }
            Err(e) => {
                warn!(
                    subscription_id = %subscription_id,
                    error = %e,
                    "Failed to skip future deliveries"
                );
                None
            }
        }
    }
}
