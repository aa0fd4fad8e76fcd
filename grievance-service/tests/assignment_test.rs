mod common;

use common::TestApp;
use grievance_service::{
    models::{ComplaintStatus, DomainEvent, Role},
    services::{Actor, ServiceError},
};
use uuid::Uuid;

#[tokio::test]
async fn assigning_open_complaint_sets_assignee_and_timestamp() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let employee = app.seed_user(Role::Employee).await;
    let complaint = app.seed_complaint(citizen.id).await;

    let assigned = app
        .state
        .lifecycle
        .assign(complaint.id, employee.id)
        .await
        .unwrap();

    assert_eq!(assigned.status, ComplaintStatus::Assigned);
    assert_eq!(assigned.employee_id, Some(employee.id));
    let assigned_at = assigned.assigned_at.expect("assigned_at set");
    assert_eq!(assigned.updated_at, assigned_at);

    let events = app.store.outbox_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0].event,
        DomainEvent::ComplaintAssigned { employee_id, .. } if employee_id == employee.id
    ));
}

#[tokio::test]
async fn assigning_escalated_complaint_keeps_status() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let employee = app.seed_user(Role::Employee).await;
    let manager = app.seed_user(Role::Manager).await;
    let complaint = app.seed_complaint(citizen.id).await;

    app.state
        .lifecycle
        .assign(complaint.id, employee.id)
        .await
        .unwrap();
    app.state
        .lifecycle
        .update_status(complaint.id, "ESCALATED", None, Actor::Admin)
        .await
        .unwrap();

    let reassigned = app
        .state
        .lifecycle
        .assign(complaint.id, manager.id)
        .await
        .unwrap();

    assert_eq!(reassigned.status, ComplaintStatus::Escalated);
    assert_eq!(reassigned.employee_id, Some(manager.id));
}

#[tokio::test]
async fn missing_complaint_or_employee_writes_nothing() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let employee = app.seed_user(Role::Employee).await;
    let complaint = app.seed_complaint(citizen.id).await;
    let writes = app.store.write_count();

    let err = app
        .state
        .lifecycle
        .assign(Uuid::new_v4(), employee.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ComplaintNotFound));

    let err = app
        .state
        .lifecycle
        .assign(complaint.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::EmployeeNotFound));

    assert_eq!(app.store.write_count(), writes);
    let stored = app.complaint(complaint.id).await;
    assert_eq!(stored.status, ComplaintStatus::Open);
    assert!(stored.employee_id.is_none());
    assert!(stored.assigned_at.is_none());
}

#[tokio::test]
async fn plain_user_cannot_be_assigned() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let complaint = app.seed_complaint(citizen.id).await;
    let writes = app.store.write_count();

    let err = app
        .state
        .lifecycle
        .assign(complaint.id, citizen.id)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotStaff));
    assert_eq!(app.store.write_count(), writes);
}

#[tokio::test]
async fn assignee_sees_complaint_in_worklist() {
    let app = TestApp::new();
    let citizen = app.seed_user(Role::User).await;
    let employee = app.seed_user(Role::SeniorManager).await;
    let complaint = app.seed_complaint(citizen.id).await;
    app.seed_complaint(citizen.id).await;

    app.state
        .lifecycle
        .assign(complaint.id, employee.id)
        .await
        .unwrap();

    let worklist = app.state.complaints.list_assigned(employee.id).await.unwrap();
    assert_eq!(worklist.len(), 1);
    assert_eq!(worklist[0].id, complaint.id);

    let seen = app.state.complaints.get(complaint.id, &employee).await.unwrap();
    assert_eq!(seen.id, complaint.id);
}
