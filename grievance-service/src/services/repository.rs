//! Persistence contract.
//!
//! Two implementations exist: [`Database`](super::postgres::Database) on
//! PostgreSQL and [`InMemoryStore`](super::memory::InMemoryStore) for tests
//! and local development. Every mutating call that takes `events` must append
//! them to the outbox in the same atomic write as the state change.

use async_trait::async_trait;
use uuid::Uuid;

use super::error::RepositoryError;
use crate::models::{
    Complaint, ComplaintStatus, DomainEvent, EmployeeRequest, Notification, OutboxEvent,
    RequestStatus, Role, User,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    /// Oldest account holding `role`.
    async fn find_first_user_by_role(&self, role: Role) -> Result<Option<User>, RepositoryError>;
    async fn find_users_by_roles(&self, roles: &[Role]) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
pub trait ComplaintRepository: Send + Sync {
    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), RepositoryError>;
    async fn find_complaint_by_id(&self, id: Uuid) -> Result<Option<Complaint>, RepositoryError>;
    async fn find_complaints_by_citizen(
        &self,
        citizen_id: Uuid,
    ) -> Result<Vec<Complaint>, RepositoryError>;
    async fn find_complaints_by_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<Complaint>, RepositoryError>;
    async fn find_complaints_by_status(
        &self,
        status: ComplaintStatus,
    ) -> Result<Vec<Complaint>, RepositoryError>;
    /// All complaints, newest first.
    async fn list_complaints(&self) -> Result<Vec<Complaint>, RepositoryError>;
    /// Writes `complaint` if the stored version still equals `complaint.version`
    /// and returns the stored row with the bumped version. A stale version yields
    /// [`RepositoryError::VersionConflict`] and nothing is written.
    async fn update_complaint(
        &self,
        complaint: &Complaint,
        events: &[DomainEvent],
    ) -> Result<Complaint, RepositoryError>;
}

#[async_trait]
pub trait EmployeeRequestRepository: Send + Sync {
    /// Fails with [`RepositoryError::Duplicate`] when the user already has a pending request.
    async fn insert_request(&self, request: &EmployeeRequest) -> Result<(), RepositoryError>;
    async fn find_request_by_id(&self, id: Uuid)
        -> Result<Option<EmployeeRequest>, RepositoryError>;
    async fn find_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<EmployeeRequest>, RepositoryError>;
    async fn find_request_by_user_and_status(
        &self,
        user_id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<EmployeeRequest>, RepositoryError>;
    /// Persists the decided request, the optionally promoted user and the events
    /// together, provided the stored request is still PENDING.
    async fn decide_request(
        &self,
        request: &EmployeeRequest,
        promoted_user: Option<&User>,
        events: &[DomainEvent],
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Stores the notification and marks its source event dispatched. Returns
    /// `false` without writing if that event was already dispatched.
    async fn insert_notification(
        &self,
        notification: &Notification,
    ) -> Result<bool, RepositoryError>;
    /// Newest first.
    async fn find_notifications_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, RepositoryError>;
    /// Returns `false` if no notification with that id belongs to `user_id`.
    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid)
        -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Undispatched events with fewer than `max_attempts` failed deliveries,
    /// least attempted first, then oldest first.
    async fn pending_events(
        &self,
        limit: i64,
        max_attempts: i32,
    ) -> Result<Vec<OutboxEvent>, RepositoryError>;
    async fn record_delivery_failure(
        &self,
        event_id: Uuid,
        error: &str,
    ) -> Result<(), RepositoryError>;
}

/// Everything the services need from storage.
#[async_trait]
pub trait Repositories:
    UserRepository
    + ComplaintRepository
    + EmployeeRequestRepository
    + NotificationRepository
    + OutboxRepository
{
    async fn health_check(&self) -> Result<(), RepositoryError>;
}
