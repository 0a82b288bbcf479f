//! Subscription lifecycle state machine
//!
//! Transitions are pure: they take a subscription and `now`, and return the
//! next subscription value or a typed error. Nothing here touches storage;
//! the service persists whatever comes back.
//!
//! ```text
//! active ──pause──▶ paused ──reactivate──▶ active
//!   │                  └──deadline passed──▶ expired
//!   └──admin pause──▶ admin_paused ──admin reactivate──▶ active
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};

use orchard_types::{
    AdminPause, AdminPauseLink, PauseState, Subscription, SubscriptionStatus, UserId, UserPause,
};

use crate::calendar::{add_months, at_delivery_time, is_past_cutoff, skip_if_sunday};
use crate::error::{SubscriptionError, SubscriptionResult};
use crate::schedule::ScheduleGenerator;

/// Months a paused subscription stays reactivatable
pub const DEFAULT_REACTIVATION_WINDOW_MONTHS: u32 = 3;

/// Result of a user reactivation attempt
#[derive(Debug, Clone)]
pub enum ReactivationOutcome {
    /// Back to active
    Reactivated {
        subscription: Subscription,
        /// Whole days the subscription was paused, added to its end date
        pause_days: i64,
        /// Set when an admin pause pushed the next delivery back
        advisory: Option<String>,
    },
    /// Deadline missed; the expired subscription must still be persisted
    Expired(Subscription),
}

/// Result of lifting an admin pause from one subscription
#[derive(Debug, Clone)]
pub enum AdminReactivation {
    /// Moved from `admin_paused` back to `active`
    Resumed {
        subscription: Subscription,
        /// Whole days spent admin-paused, added to the end date
        extended_days: i64,
    },
    /// Was `active` but still linked to the pause; link cleared
    Reconciled(Subscription),
    /// Nothing to do
    AlreadyActive,
}

/// Business rules for every status transition
#[derive(Debug, Clone)]
pub struct SubscriptionLifecycle {
    generator: ScheduleGenerator,
    reactivation_window_months: u32,
}

impl Default for SubscriptionLifecycle {
    fn default() -> Self {
        Self::new(ScheduleGenerator::default(), DEFAULT_REACTIVATION_WINDOW_MONTHS)
    }
}

impl SubscriptionLifecycle {
    pub fn new(generator: ScheduleGenerator, reactivation_window_months: u32) -> Self {
        Self {
            generator,
            reactivation_window_months,
        }
    }

    pub fn generator(&self) -> &ScheduleGenerator {
        &self.generator
    }

    /// Fail unless there is enough notice before `next_delivery` to pause.
    ///
    /// Today or overdue is always too late. Tomorrow is too late once the
    /// local cutoff has passed.
    pub fn check_notice_period(
        &self,
        next_delivery: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<()> {
        let local_now = self.generator.to_local(now);
        let today = local_now.date_naive();
        let delivery_day = self.generator.to_local(next_delivery).date_naive();

        if delivery_day <= today {
            return Err(SubscriptionError::NoticePeriodViolation(
                "the next delivery is today or already due".to_string(),
            ));
        }
        let cutoff = self.generator.settings().cutoff_hour;
        if delivery_day == today + Duration::days(1) && is_past_cutoff(local_now, cutoff) {
            return Err(SubscriptionError::NoticePeriodViolation(format!(
                "the next delivery is tomorrow and the {cutoff}:00 cutoff has passed"
            )));
        }
        Ok(())
    }

    pub fn can_pause(&self, next_delivery: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.check_notice_period(next_delivery, now).is_ok()
    }

    /// active → paused
    pub fn pause(
        &self,
        sub: &Subscription,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<Subscription> {
        if sub.status != SubscriptionStatus::Active {
            return Err(SubscriptionError::invalid_transition(sub.status, "pause"));
        }
        self.check_notice_period(sub.next_delivery_date, now)?;

        let mut paused = sub.clone();
        paused.status = SubscriptionStatus::Paused;
        paused.pause = PauseState::User(UserPause {
            pause_date: now,
            pause_reason: reason,
            reactivation_deadline: add_months(now, self.reactivation_window_months),
        });
        paused.updated_at = now;
        Ok(paused)
    }

    /// paused → active, or paused → expired when the deadline has passed.
    ///
    /// `explicit_date` must fall between the earliest serviceable day and
    /// the reactivation deadline. An admin pause covering the owner pushes
    /// the next delivery past its window either way.
    pub fn reactivate(
        &self,
        sub: &Subscription,
        now: DateTime<Utc>,
        explicit_date: Option<NaiveDate>,
        admin_pause: Option<&AdminPause>,
    ) -> SubscriptionResult<ReactivationOutcome> {
        if sub.status != SubscriptionStatus::Paused {
            return Err(SubscriptionError::invalid_transition(sub.status, "reactivate"));
        }
        let pause = sub.user_pause().ok_or_else(|| {
            SubscriptionError::Internal(format!(
                "subscription {} is paused without details",
                sub.id
            ))
        })?;

        if now > pause.reactivation_deadline {
            return Ok(ReactivationOutcome::Expired(self.expire(sub, now)?));
        }

        let candidate = match explicit_date {
            Some(date) => self.validate_explicit_date(date, pause, now)?,
            None => self
                .generator
                .next_scheduled_delivery(now, sub.delivery_frequency),
        };
        let admin_pause = admin_pause.filter(|p| p.covers_user(&sub.user_id));
        let (next_delivery, advisory) =
            self.generator.apply_admin_pause(candidate, admin_pause, now);

        let pause_days = (now - pause.pause_date).num_days().max(0);

        let mut active = sub.clone();
        active.status = SubscriptionStatus::Active;
        active.pause = PauseState::None;
        active.subscription_end_date = sub.subscription_end_date + Duration::days(pause_days);
        active.next_delivery_date = next_delivery;
        active.schedule_anchor = next_delivery;
        active.updated_at = now;

        Ok(ReactivationOutcome::Reactivated {
            subscription: active,
            pause_days,
            advisory,
        })
    }

    fn validate_explicit_date(
        &self,
        date: NaiveDate,
        pause: &UserPause,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<DateTime<Utc>> {
        let offset = self.generator.settings().utc_offset;
        let candidate = skip_if_sunday(at_delivery_time(date, offset)).to_utc();

        let earliest = self.generator.earliest_serviceable(now);
        if candidate < earliest {
            return Err(SubscriptionError::Validation(format!(
                "requested date {date} is before the earliest serviceable day {}",
                self.generator.to_local(earliest).date_naive()
            )));
        }
        if candidate > pause.reactivation_deadline {
            return Err(SubscriptionError::Validation(format!(
                "requested date {date} is after the reactivation deadline {}",
                self.generator.to_local(pause.reactivation_deadline).date_naive()
            )));
        }
        Ok(candidate)
    }

    /// paused → expired, once the reactivation deadline has passed
    pub fn expire(
        &self,
        sub: &Subscription,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<Subscription> {
        let deadline = sub
            .user_pause()
            .map(|p| p.reactivation_deadline)
            .filter(|_| sub.status == SubscriptionStatus::Paused)
            .ok_or_else(|| SubscriptionError::invalid_transition(sub.status, "expire"))?;
        if now <= deadline {
            return Err(SubscriptionError::Validation(format!(
                "reactivation deadline {deadline} has not passed"
            )));
        }

        let mut expired = sub.clone();
        expired.status = SubscriptionStatus::Expired;
        expired.pause = PauseState::None;
        expired.updated_at = now;
        Ok(expired)
    }

    /// active → admin_paused
    pub fn admin_pause(
        &self,
        sub: &Subscription,
        pause: &AdminPause,
        now: DateTime<Utc>,
    ) -> SubscriptionResult<Subscription> {
        if sub.status != SubscriptionStatus::Active {
            return Err(SubscriptionError::invalid_transition(sub.status, "admin-pause"));
        }

        let mut held = sub.clone();
        held.status = SubscriptionStatus::AdminPaused;
        held.pause = PauseState::Admin(AdminPauseLink {
            admin_pause_id: pause.id,
            admin_pause_start: pause.start_date,
            admin_pause_end: pause.end_date,
        });
        held.updated_at = now;
        Ok(held)
    }

    /// admin_paused → active, plus reconciliation of half-applied links
    pub fn admin_reactivate(
        &self,
        sub: &Subscription,
        now: DateTime<Utc>,
        reactivated_by: Option<UserId>,
    ) -> SubscriptionResult<AdminReactivation> {
        let link = sub.admin_pause().cloned();

        match (sub.status, link) {
            (SubscriptionStatus::AdminPaused, link) => {
                let extended_days = link
                    .as_ref()
                    .map_or(0, |l| (now - l.admin_pause_start).num_days().max(0));

                let mut active = self.clear_admin_link(sub, now, reactivated_by);
                active.status = SubscriptionStatus::Active;
                active.subscription_end_date =
                    sub.subscription_end_date + Duration::days(extended_days);
                active.next_delivery_date = self.resume_date(link.as_ref(), now);
                active.schedule_anchor = active.next_delivery_date;

                Ok(AdminReactivation::Resumed {
                    subscription: active,
                    extended_days,
                })
            }
            (SubscriptionStatus::Active, Some(link)) => {
                let mut active = self.clear_admin_link(sub, now, reactivated_by);
                if active.next_delivery_date < now {
                    active.next_delivery_date = self.resume_date(Some(&link), now);
                    active.schedule_anchor = active.next_delivery_date;
                }
                Ok(AdminReactivation::Reconciled(active))
            }
            (SubscriptionStatus::Active, None) => Ok(AdminReactivation::AlreadyActive),
            (status, _) => Err(SubscriptionError::invalid_transition(
                status,
                "admin-reactivate",
            )),
        }
    }

    fn clear_admin_link(
        &self,
        sub: &Subscription,
        now: DateTime<Utc>,
        reactivated_by: Option<UserId>,
    ) -> Subscription {
        let mut cleared = sub.clone();
        cleared.pause = PauseState::None;
        cleared.admin_reactivated_at = Some(now);
        cleared.admin_reactivated_by = reactivated_by;
        cleared.updated_at = now;
        cleared
    }

    /// Day after the admin window when it is still ahead, otherwise the
    /// earliest serviceable day
    fn resume_date(&self, link: Option<&AdminPauseLink>, now: DateTime<Utc>) -> DateTime<Utc> {
        let earliest = self.generator.earliest_serviceable(now);
        let after_window = link.and_then(|l| l.admin_pause_end).map(|end| {
            let day_after = self.generator.to_local(end).date_naive() + Duration::days(1);
            skip_if_sunday(at_delivery_time(day_after, self.generator.settings().utc_offset))
                .to_utc()
        });
        after_window.map_or(earliest, |date| date.max(earliest))
    }
}
