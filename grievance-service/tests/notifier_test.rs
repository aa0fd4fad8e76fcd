mod common;

use common::{FlakyStore, TestApp};
use grievance_service::{
    models::{Notification, Role},
    services::{repository::*, Actor, DispatchReport, NotificationDispatcher, ServiceError},
};
use std::sync::Arc;
use uuid::Uuid;

async fn resolved_complaint(app: &TestApp) -> (Uuid, Uuid) {
    let citizen = app.seed_user(Role::User).await;
    let employee = app.seed_user(Role::Employee).await;
    let complaint = app.seed_complaint(citizen.id).await;
    app.state
        .lifecycle
        .assign(complaint.id, employee.id)
        .await
        .unwrap();
    app.state
        .lifecycle
        .update_status(complaint.id, "RESOLVED", None, Actor::Staff(employee.id))
        .await
        .unwrap();
    (citizen.id, employee.id)
}

#[tokio::test]
async fn each_event_becomes_one_notification() {
    let app = TestApp::new();
    let (citizen_id, employee_id) = resolved_complaint(&app).await;

    let first = app.state.dispatcher.dispatch_pending().await.unwrap();
    let second = app.state.dispatcher.dispatch_pending().await.unwrap();

    assert_eq!(
        first,
        DispatchReport {
            delivered: 2,
            skipped: 0,
            failed: 0
        }
    );
    assert_eq!(second, DispatchReport::default());

    let citizen_inbox = app.state.notifications.list_for_user(citizen_id).await.unwrap();
    assert_eq!(citizen_inbox.len(), 1);
    assert!(citizen_inbox[0].message.contains("resolved"));
    assert!(!citizen_inbox[0].read);

    let employee_inbox = app.state.notifications.list_for_user(employee_id).await.unwrap();
    assert_eq!(employee_inbox.len(), 1);
    assert!(employee_inbox[0].message.starts_with("Task assigned"));
}

#[tokio::test]
async fn two_dispatchers_do_not_duplicate() {
    let app = TestApp::new();
    let (citizen_id, _) = resolved_complaint(&app).await;

    let other: Arc<dyn Repositories> = app.store.clone();
    let competing = NotificationDispatcher::new(other, 10);

    let (a, b) = tokio::join!(
        app.state.dispatcher.dispatch_pending(),
        competing.dispatch_pending()
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.delivered + b.delivered, 2);
    assert_eq!(a.failed + b.failed, 0);
    assert_eq!(
        app.state
            .notifications
            .list_for_user(citizen_id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn replaying_a_dispatched_event_is_skipped() {
    let app = TestApp::new();
    resolved_complaint(&app).await;

    let event = app.store.outbox_events().remove(0);
    assert!(app
        .store
        .insert_notification(&Notification::from_event(&event))
        .await
        .unwrap());
    assert!(!app
        .store
        .insert_notification(&Notification::from_event(&event))
        .await
        .unwrap());
}

#[tokio::test]
async fn batch_size_limits_one_pass() {
    let app = TestApp::new();
    resolved_complaint(&app).await;
    let dispatcher = NotificationDispatcher::new(app.store.clone(), 1);

    assert_eq!(dispatcher.dispatch_pending().await.unwrap().delivered, 1);
    assert_eq!(dispatcher.dispatch_pending().await.unwrap().delivered, 1);
    assert_eq!(dispatcher.dispatch_pending().await.unwrap().delivered, 0);
}

#[tokio::test]
async fn only_the_recipient_can_mark_read() {
    let app = TestApp::new();
    let (citizen_id, employee_id) = resolved_complaint(&app).await;
    app.state.dispatcher.dispatch_pending().await.unwrap();
    let notification = app
        .state
        .notifications
        .list_for_user(citizen_id)
        .await
        .unwrap()
        .remove(0);

    let err = app
        .state
        .notifications
        .mark_read(notification.id, employee_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotificationNotFound));

    app.state
        .notifications
        .mark_read(notification.id, citizen_id)
        .await
        .unwrap();
    let inbox = app.state.notifications.list_for_user(citizen_id).await.unwrap();
    assert!(inbox[0].read);
}

/// Assigns one complaint to each of `count` new employees, oldest event first.
async fn assignment_events(app: &TestApp, count: usize) -> Vec<(Uuid, Uuid)> {
    let citizen = app.seed_user(Role::User).await;
    let mut events = Vec::new();
    for _ in 0..count {
        let employee = app.seed_user(Role::Employee).await;
        let complaint = app.seed_complaint(citizen.id).await;
        app.state
            .lifecycle
            .assign(complaint.id, employee.id)
            .await
            .unwrap();
        let event = app.store.outbox_events().pop().expect("assignment event");
        events.push((event.id, employee.id));
    }
    events
}

#[tokio::test]
async fn failed_delivery_is_recorded_and_retried() {
    let app = TestApp::new();
    let events = assignment_events(&app, 1).await;
    let (event_id, employee_id) = events[0];

    let flaky = Arc::new(FlakyStore::new(app.store.clone()));
    flaky.fail_event(event_id);
    let dispatcher = NotificationDispatcher::new(flaky.clone(), 10);

    let report = dispatcher.dispatch_pending().await.unwrap();
    assert_eq!(
        report,
        DispatchReport {
            delivered: 0,
            skipped: 0,
            failed: 1
        }
    );
    let record = app
        .store
        .outbox_events()
        .into_iter()
        .find(|e| e.id == event_id)
        .unwrap();
    assert_eq!(record.attempts, 1);
    assert!(record.last_error.unwrap().contains("injected failure"));
    assert!(record.dispatched_at.is_none());

    flaky.heal_event(event_id);
    assert_eq!(dispatcher.dispatch_pending().await.unwrap().delivered, 1);
    assert_eq!(dispatcher.dispatch_pending().await.unwrap(), DispatchReport::default());
    assert_eq!(
        app.state
            .notifications
            .list_for_user(employee_id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn failing_events_do_not_block_newer_ones() {
    let app = TestApp::new();
    let events = assignment_events(&app, 3).await;

    let flaky = Arc::new(FlakyStore::new(app.store.clone()));
    flaky.fail_event(events[0].0);
    flaky.fail_event(events[1].0);
    let dispatcher = NotificationDispatcher::new(flaky.clone(), 2).with_max_attempts(5);

    for _ in 0..5 {
        dispatcher.dispatch_pending().await.unwrap();
    }

    let healthy_recipient = events[2].1;
    assert_eq!(
        app.state
            .notifications
            .list_for_user(healthy_recipient)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn events_past_max_attempts_leave_the_queue() {
    let app = TestApp::new();
    let events = assignment_events(&app, 2).await;

    let flaky = Arc::new(FlakyStore::new(app.store.clone()));
    flaky.fail_event(events[0].0);
    let dispatcher = NotificationDispatcher::new(flaky.clone(), 10).with_max_attempts(3);

    for _ in 0..3 {
        dispatcher.dispatch_pending().await.unwrap();
    }
    assert_eq!(dispatcher.dispatch_pending().await.unwrap(), DispatchReport::default());

    let abandoned = app
        .store
        .outbox_events()
        .into_iter()
        .find(|e| e.id == events[0].0)
        .unwrap();
    assert_eq!(abandoned.attempts, 3);
    assert!(abandoned.dispatched_at.is_none());
    assert!(app
        .state
        .notifications
        .list_for_user(events[0].1)
        .await
        .unwrap()
        .is_empty());
}
