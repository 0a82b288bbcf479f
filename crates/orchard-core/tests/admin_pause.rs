//! Admin pause coordination
//!
//! Bulk hold and release of subscriptions, enrollment under a pause and
//! reconciliation of rows left behind by partial failures.

mod common;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use common::{create_request, local, Harness};
use orchard_core::{CreateAdminPauseRequest, NotificationKind, SubscriptionError};
use orchard_types::{
    AdminPauseId, AdminPauseLink, DeliveryFrequency, DeliveryStatus, PauseState, PauseType,
    Subscription, SubscriptionStatus, UserId,
};

fn pause_all(end_date: Option<DateTime<Utc>>) -> CreateAdminPauseRequest {
    CreateAdminPauseRequest {
        pause_type: PauseType::All,
        user_ids: vec![],
        start_date: None,
        end_date,
        reason: "Kitchen deep clean".to_string(),
        admin_user_id: Some(UserId::new()),
    }
}

fn seed(h: &Harness) -> Subscription {
    h.seed_active(
        UserId::new(),
        DeliveryFrequency::Weekly,
        local(2026, 3, 11, 8, 0),
        local(2026, 6, 4, 10, 0),
    )
}

// ============================================================================
// Bulk pause and reactivate
// ============================================================================

#[tokio::test]
async fn test_pause_all_then_reactivate_all() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    let subs: Vec<Subscription> = (0..3).map(|_| seed(&h)).collect();
    let paused = seed(&h);
    h.service.pause_subscription(paused.id, None).await.unwrap();

    let applied = h.service.create_admin_pause(pause_all(None)).await.unwrap();
    assert_eq!(applied.outcome.processed_count, 3);
    assert!(applied.outcome.is_complete());
    assert_eq!(applied.admin_pause.affected_subscription_count, 3);

    let row = h.admin_pauses.get(applied.admin_pause.id.0).unwrap();
    assert_eq!(row.affected_subscription_count, 3);
    assert_eq!(row.status, "active");

    for sub in &subs {
        let stored = h.stored(sub.id);
        assert_eq!(stored.status, SubscriptionStatus::AdminPaused);
        assert!(stored.is_held_by(applied.admin_pause.id));
    }
    // User-paused subscriptions are left alone
    assert_eq!(h.stored(paused.id).status, SubscriptionStatus::Paused);

    // Ten days later, a Saturday evening
    h.clock.set(local(2026, 3, 14, 19, 0));
    let lifted = h
        .service
        .reactivate_admin_pause(applied.admin_pause.id, None)
        .await
        .unwrap();
    assert_eq!(lifted.outcome.processed_count, 3);
    assert!(lifted.outcome.is_complete());

    for sub in &subs {
        let stored = h.stored(sub.id);
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert_eq!(stored.pause, PauseState::None);
        assert_eq!(stored.admin_reactivated_at, Some(local(2026, 3, 14, 19, 0)));
        assert_eq!(
            stored.subscription_end_date,
            sub.subscription_end_date + Duration::days(10)
        );
        // Saturday past the cutoff, so Monday
        assert_eq!(stored.next_delivery_date, local(2026, 3, 16, 8, 0));
        let scheduled = h.deliveries.dates_with_status(sub.id, DeliveryStatus::Scheduled);
        assert_eq!(scheduled.first(), Some(&local(2026, 3, 16, 8, 0)));
    }

    let row = h.admin_pauses.get(applied.admin_pause.id.0).unwrap();
    assert_eq!(row.status, "reactivated");
    assert!(row.reactivated_at.is_some());

    let kinds = h.finish().await;
    let count = |kind| kinds.iter().filter(|k| **k == kind).count();
    assert_eq!(count(NotificationKind::AdminPause), 3);
    assert_eq!(count(NotificationKind::AdminReactivate), 3);
}

#[tokio::test]
async fn test_reactivate_is_idempotent() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    seed(&h);
    seed(&h);
    let applied = h.service.create_admin_pause(pause_all(None)).await.unwrap();

    let first = h
        .service
        .reactivate_admin_pause(applied.admin_pause.id, None)
        .await
        .unwrap();
    assert_eq!(first.outcome.processed_count, 2);

    let second = h
        .service
        .reactivate_admin_pause(applied.admin_pause.id, None)
        .await
        .unwrap();
    assert_eq!(second.outcome.processed_count, 0);
    assert!(second.outcome.is_complete());
}

#[tokio::test]
async fn test_selected_pause_only_holds_listed_users() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    let held = seed(&h);
    let free = seed(&h);

    let request = CreateAdminPauseRequest {
        pause_type: PauseType::Selected,
        user_ids: vec![held.user_id],
        ..pause_all(None)
    };
    let applied = h.service.create_admin_pause(request).await.unwrap();

    assert_eq!(applied.outcome.processed_count, 1);
    assert_eq!(h.stored(held.id).status, SubscriptionStatus::AdminPaused);
    assert_eq!(h.stored(free.id).status, SubscriptionStatus::Active);
    assert!(h
        .deliveries
        .dates_with_status(held.id, DeliveryStatus::Scheduled)
        .is_empty());
}

#[tokio::test]
async fn test_invalid_admin_pause_requests() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));

    let request = CreateAdminPauseRequest {
        pause_type: PauseType::Selected,
        ..pause_all(None)
    };
    let err = h.service.create_admin_pause(request).await.unwrap_err();
    assert!(matches!(err, SubscriptionError::Validation(_)));

    let request = CreateAdminPauseRequest {
        start_date: Some(local(2026, 3, 10, 0, 0)),
        ..pause_all(Some(local(2026, 3, 9, 0, 0)))
    };
    assert!(h.service.create_admin_pause(request).await.is_err());
}

#[tokio::test]
async fn test_reactivate_unknown_admin_pause() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    let err = h
        .service
        .reactivate_admin_pause(AdminPauseId::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SubscriptionError::AdminPauseNotFound));
    assert_eq!(err.status_code(), 404);
}

// ============================================================================
// Enrollment under a pause
// ============================================================================

#[tokio::test]
async fn test_create_under_indefinite_pause_is_not_blocked() {
    let now = local(2026, 3, 4, 10, 0);
    let h = Harness::new(now);
    h.service.create_admin_pause(pause_all(None)).await.unwrap();

    let created = h
        .service
        .create_subscription(create_request(UserId::new(), DeliveryFrequency::Weekly, 3))
        .await
        .unwrap();

    assert_eq!(created.subscription.status, SubscriptionStatus::Active);
    assert!(created.first_delivery_date >= now + Duration::days(7));
    assert_eq!(created.first_delivery_date, local(2026, 3, 12, 8, 0));
    assert!(created.advisory_message.is_some());
    // The day lost to the pause is added back
    assert_eq!(
        created.subscription.subscription_end_date,
        local(2026, 6, 5, 10, 0)
    );
}

#[tokio::test]
async fn test_create_under_dated_pause_starts_day_after_end() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    h.service
        .create_admin_pause(pause_all(Some(local(2026, 3, 19, 23, 0))))
        .await
        .unwrap();

    let created = h
        .service
        .create_subscription(create_request(UserId::new(), DeliveryFrequency::Weekly, 1))
        .await
        .unwrap();

    assert_eq!(created.first_delivery_date, local(2026, 3, 20, 8, 0));
    let advisory = created.advisory_message.unwrap();
    assert!(advisory.contains("2026-03-19"));
    assert!(advisory.contains("2026-03-20"));

    let scheduled = h
        .deliveries
        .dates_with_status(created.subscription.id, DeliveryStatus::Scheduled);
    assert!(scheduled.iter().all(|d| *d > local(2026, 3, 19, 23, 0)));
}

#[tokio::test]
async fn test_pause_for_other_user_does_not_move_first_delivery() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    let request = CreateAdminPauseRequest {
        pause_type: PauseType::Selected,
        user_ids: vec![UserId::new()],
        ..pause_all(None)
    };
    h.service.create_admin_pause(request).await.unwrap();

    let created = h
        .service
        .create_subscription(create_request(UserId::new(), DeliveryFrequency::Weekly, 1))
        .await
        .unwrap();
    assert_eq!(created.first_delivery_date, local(2026, 3, 11, 8, 0));
    assert!(created.advisory_message.is_none());
}

#[tokio::test]
async fn test_pause_starting_later_does_not_move_first_delivery() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    let user = UserId::new();
    let request = CreateAdminPauseRequest {
        start_date: Some(local(2026, 3, 20, 0, 0)),
        ..pause_all(Some(local(2026, 3, 25, 23, 0)))
    };
    let scheduled = h.service.create_admin_pause(request).await.unwrap();
    assert!(h.service.active_admin_pause(Some(user)).await.unwrap().is_none());

    let created = h
        .service
        .create_subscription(create_request(user, DeliveryFrequency::Weekly, 1))
        .await
        .unwrap();
    assert_eq!(created.first_delivery_date, local(2026, 3, 11, 8, 0));
    assert!(created.advisory_message.is_none());

    h.clock.set(local(2026, 3, 21, 10, 0));
    let active = h.service.active_admin_pause(Some(user)).await.unwrap().unwrap();
    assert_eq!(active.id, scheduled.admin_pause.id);
}

// ============================================================================
// Partial failures
// ============================================================================

#[tokio::test]
async fn test_bulk_pause_reports_partial_failure() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    let ok_a = seed(&h);
    let broken = seed(&h);
    let ok_b = seed(&h);
    h.subscriptions.fail_updates_for(broken.id);

    let applied = h.service.create_admin_pause(pause_all(None)).await.unwrap();

    assert_eq!(applied.outcome.processed_count, 2);
    assert_eq!(applied.outcome.failed_count(), 1);
    let failure = &applied.outcome.errors[0];
    assert_eq!(failure.subscription_id, broken.id);
    assert_eq!(failure.code, "DATASTORE_UNAVAILABLE");

    assert_eq!(h.stored(ok_a.id).status, SubscriptionStatus::AdminPaused);
    assert_eq!(h.stored(ok_b.id).status, SubscriptionStatus::AdminPaused);
    assert_eq!(h.stored(broken.id).status, SubscriptionStatus::Active);
    assert_eq!(
        h.admin_pauses
            .get(applied.admin_pause.id.0)
            .unwrap()
            .affected_subscription_count,
        2
    );
}

#[tokio::test]
async fn test_affected_count_failure_does_not_fail_pause() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    seed(&h);
    h.admin_pauses.set_fail_count_updates(true);

    let applied = h.service.create_admin_pause(pause_all(None)).await.unwrap();
    assert_eq!(applied.outcome.processed_count, 1);
    assert_eq!(applied.admin_pause.affected_subscription_count, 1);
}

#[tokio::test]
async fn test_reactivate_reconciles_half_applied_rows() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    let held = seed(&h);
    let request = CreateAdminPauseRequest {
        pause_type: PauseType::Selected,
        user_ids: vec![held.user_id],
        ..pause_all(None)
    };
    let applied = h.service.create_admin_pause(request).await.unwrap();
    let admin_pause_id = applied.admin_pause.id;

    // Active but still linked, as left by an interrupted run
    let mut linked = seed(&h);
    linked.pause = PauseState::Admin(AdminPauseLink {
        admin_pause_id,
        admin_pause_start: local(2026, 3, 4, 10, 0),
        admin_pause_end: None,
    });
    h.subscriptions.insert_subscription(&linked);

    // Admin-paused with the link lost
    let mut orphan = seed(&h);
    orphan.status = SubscriptionStatus::AdminPaused;
    h.subscriptions.insert_subscription(&orphan);

    h.clock.set(local(2026, 3, 6, 10, 0));
    let lifted = h
        .service
        .reactivate_admin_pause(admin_pause_id, None)
        .await
        .unwrap();
    assert_eq!(lifted.outcome.processed_count, 3);

    let linked = h.stored(linked.id);
    assert_eq!(linked.status, SubscriptionStatus::Active);
    assert_eq!(linked.pause, PauseState::None);
    assert_eq!(linked.next_delivery_date, local(2026, 3, 11, 8, 0));
    assert_eq!(linked.subscription_end_date, local(2026, 6, 4, 10, 0));
    assert!(!h
        .deliveries
        .dates_with_status(linked.id, DeliveryStatus::Scheduled)
        .is_empty());

    let orphan = h.stored(orphan.id);
    assert_eq!(orphan.status, SubscriptionStatus::Active);
    // No link means no known start, so nothing to extend
    assert_eq!(orphan.subscription_end_date, local(2026, 6, 4, 10, 0));

    assert_eq!(h.stored(held.id).status, SubscriptionStatus::Active);
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_list_and_active_admin_pause() {
    let h = Harness::new(local(2026, 3, 4, 10, 0));
    let user = UserId::new();
    assert!(h.service.active_admin_pause(Some(user)).await.unwrap().is_none());

    let request = CreateAdminPauseRequest {
        pause_type: PauseType::Selected,
        user_ids: vec![user],
        ..pause_all(None)
    };
    let selected = h.service.create_admin_pause(request).await.unwrap();

    let active = h.service.active_admin_pause(Some(user)).await.unwrap().unwrap();
    assert_eq!(active.id, selected.admin_pause.id);
    assert!(h.service.active_admin_pause(None).await.unwrap().is_none());

    let fleet = h.service.create_admin_pause(pause_all(None)).await.unwrap();
    let active = h.service.active_admin_pause(Some(user)).await.unwrap().unwrap();
    assert_eq!(active.id, fleet.admin_pause.id);

    let listed = h.service.list_admin_pauses(10).await.unwrap();
    assert_eq!(listed.len(), 2);
    let ids: Vec<Uuid> = listed.iter().map(|p| p.id.0).collect();
    assert!(ids.contains(&selected.admin_pause.id.0));
    assert!(ids.contains(&fleet.admin_pause.id.0));
}
