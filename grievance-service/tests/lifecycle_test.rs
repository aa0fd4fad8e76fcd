mod common;

use common::TestApp;
use grievance_service::{
    models::{ComplaintStatus, DomainEvent, Role},
    services::{repository::*, Actor, RepositoryError, ServiceError},
};
use std::time::Duration;

#[tokio::test]
async fn resolving_assigned_complaint_notifies_citizen_once() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let employee = app.seed_user(Role::Employee).await;
    let complaint = app.seed_complaint(citizen.id).await;

    app.state
        .lifecycle
        .assign(complaint.id, employee.id)
        .await
        .unwrap();
    let before = app.complaint(complaint.id).await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let resolved = app
        .state
        .lifecycle
        .update_status(
            complaint.id,
            "resolved",
            Some("Fixed the bulb".to_string()),
            Actor::Staff(employee.id),
        )
        .await
        .unwrap();

    assert_eq!(resolved.status, ComplaintStatus::Resolved);
    assert_eq!(resolved.notes.as_deref(), Some("Fixed the bulb"));
    assert!(resolved.updated_at > before.updated_at);
    assert_eq!(resolved.assigned_at, before.assigned_at);
    assert_eq!(resolved.version, before.version + 1);

    let citizen_events: Vec<_> = app
        .store
        .outbox_events()
        .into_iter()
        .filter(|e| e.event.recipient() == citizen.id)
        .collect();
    assert_eq!(citizen_events.len(), 1);
    assert!(matches!(
        citizen_events[0].event,
        DomainEvent::ComplaintResolved { .. }
    ));
}

#[tokio::test]
async fn manual_escalation_notifies_citizen() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let employee = app.seed_user(Role::Employee).await;
    let complaint = app.seed_complaint(citizen.id).await;
    app.state
        .lifecycle
        .assign(complaint.id, employee.id)
        .await
        .unwrap();

    let escalated = app
        .state
        .lifecycle
        .update_status(complaint.id, "ESCALATED", None, Actor::Admin)
        .await
        .unwrap();

    assert_eq!(escalated.status, ComplaintStatus::Escalated);
    assert_eq!(app.events_for(citizen.id), 1);
    // Only the assignment notice reaches the employee.
    assert_eq!(app.events_for(employee.id), 1);
}

#[tokio::test]
async fn resolved_complaint_rejects_every_status_change_without_writing() {
    let app = TestApp::new();
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
        .update_status(complaint.id, "RESOLVED", None, Actor::Admin)
        .await
        .unwrap();

    let writes = app.store.write_count();
    let outbox = app.store.outbox_events().len();

    for target in ["OPEN", "ASSIGNED", "ESCALATED", "RESOLVED"] {
        let err = app
            .state
            .lifecycle
            .update_status(complaint.id, target, None, Actor::Admin)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::InvalidTransition { .. }),
            "RESOLVED -> {target} should be rejected"
        );
    }

    let err = app
        .state
        .lifecycle
        .assign(complaint.id, employee.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));

    assert_eq!(app.store.write_count(), writes);
    assert_eq!(app.store.outbox_events().len(), outbox);
}

#[tokio::test]
async fn non_assignee_staff_is_refused() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let assignee = app.seed_user(Role::Employee).await;
    let other = app.seed_user(Role::Manager).await;
    let complaint = app.seed_complaint(citizen.id).await;

    app.state
        .lifecycle
        .assign(complaint.id, assignee.id)
        .await
        .unwrap();

    let err = app
        .state
        .lifecycle
        .update_status(complaint.id, "RESOLVED", None, Actor::Staff(other.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotAssignee));
    assert_eq!(
        app.complaint(complaint.id).await.status,
        ComplaintStatus::Assigned
    );
}

#[tokio::test]
async fn update_with_absent_note_clears_previous_note() {
    let app = TestApp::new();
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
        .update_status(
            complaint.id,
            "ASSIGNED",
            Some("Crew dispatched".to_string()),
            Actor::Admin,
        )
        .await
        .unwrap();
    let cleared = app
        .state
        .lifecycle
        .update_status(complaint.id, "ASSIGNED", None, Actor::Admin)
        .await
        .unwrap();

    assert!(cleared.notes.is_none());
    // Same-status updates carry no event.
    assert_eq!(app.events_for(citizen.id), 0);
}

#[tokio::test]
async fn stale_version_is_rejected_by_store() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let complaint = app.seed_complaint(citizen.id).await;

    let mut first = app.complaint(complaint.id).await;
    let mut second = first.clone();

    first.status = ComplaintStatus::Escalated;
    app.store.update_complaint(&first, &[]).await.unwrap();

    let writes = app.store.write_count();
    second.notes = Some("late writer".to_string());
    let err = app.store.update_complaint(&second, &[]).await.unwrap_err();

    assert!(matches!(err, RepositoryError::VersionConflict));
    assert_eq!(app.store.write_count(), writes);
    let stored = app.complaint(complaint.id).await;
    assert_eq!(stored.status, ComplaintStatus::Escalated);
    assert!(stored.notes.is_none());
}

#[tokio::test]
async fn open_complaint_cannot_be_escalated_by_hand() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let complaint = app.seed_complaint(citizen.id).await;

    let err = app
        .state
        .lifecycle
        .update_status(complaint.id, "ESCALATED", None, Actor::Admin)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: ComplaintStatus::Open,
            to: ComplaintStatus::Escalated
        }
    ));
    assert_eq!(app.events_for(citizen.id), 0);
}

#[tokio::test]
async fn unknown_complaint_is_not_found() {
    let app = TestApp::new();
    let err = app
        .state
        .lifecycle
        .update_status(uuid::Uuid::new_v4(), "ESCALATED", None, Actor::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ComplaintNotFound));
}
