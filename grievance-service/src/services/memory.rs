//! In-memory store used by tests and by dev mode when no database is configured.
//!
//! A single mutex guards all tables, so each trait call is atomic exactly like
//! a database transaction.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::error::RepositoryError;
use super::repository::{
    ComplaintRepository, EmployeeRequestRepository, NotificationRepository, OutboxRepository,
    Repositories, UserRepository,
};
use crate::models::{
    Complaint, ComplaintStatus, DomainEvent, EmployeeRequest, Notification, OutboxEvent,
    RequestStatus, Role, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    complaints: HashMap<Uuid, Complaint>,
    requests: HashMap<Uuid, EmployeeRequest>,
    notifications: HashMap<Uuid, Notification>,
    outbox: Vec<OutboxEvent>,
}

impl Tables {
    fn append_events(&mut self, events: &[DomainEvent]) {
        self.outbox
            .extend(events.iter().cloned().map(OutboxEvent::new));
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    writes: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful mutating calls so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every event ever appended, dispatched or not.
    pub fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.lock().map(|t| t.outbox.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".into()))
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let email = user.email.to_lowercase();
        if tables.users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(RepositoryError::Duplicate("User with this email".into()));
        }
        tables.users.insert(user.id, user.clone());
        self.wrote();
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = email.to_lowercase();
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn find_first_user_by_role(&self, role: Role) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()?
            .users
            .values()
            .filter(|u| u.role == role)
            .min_by_key(|u| (u.created_at, u.id))
            .cloned())
    }

    async fn find_users_by_roles(&self, roles: &[Role]) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self
            .lock()?
            .users
            .values()
            .filter(|u| roles.contains(&u.role))
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}

fn newest_first(mut complaints: Vec<Complaint>) -> Vec<Complaint> {
    complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    complaints
}

#[async_trait]
impl ComplaintRepository for InMemoryStore {
    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), RepositoryError> {
        self.lock()?
            .complaints
            .insert(complaint.id, complaint.clone());
        self.wrote();
        Ok(())
    }

    async fn find_complaint_by_id(&self, id: Uuid) -> Result<Option<Complaint>, RepositoryError> {
        Ok(self.lock()?.complaints.get(&id).cloned())
    }

    async fn find_complaints_by_citizen(
        &self,
        citizen_id: Uuid,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        let tables = self.lock()?;
        Ok(newest_first(
            tables
                .complaints
                .values()
                .filter(|c| c.citizen_id == citizen_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_complaints_by_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        let tables = self.lock()?;
        Ok(newest_first(
            tables
                .complaints
                .values()
                .filter(|c| c.employee_id == Some(employee_id))
                .cloned()
                .collect(),
        ))
    }

    async fn find_complaints_by_status(
        &self,
        status: ComplaintStatus,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        let tables = self.lock()?;
        Ok(newest_first(
            tables
                .complaints
                .values()
                .filter(|c| c.status == status)
                .cloned()
                .collect(),
        ))
    }

    async fn list_complaints(&self) -> Result<Vec<Complaint>, RepositoryError> {
        let tables = self.lock()?;
        Ok(newest_first(tables.complaints.values().cloned().collect()))
    }

    async fn update_complaint(
        &self,
        complaint: &Complaint,
        events: &[DomainEvent],
    ) -> Result<Complaint, RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables
            .complaints
            .get_mut(&complaint.id)
            .ok_or(RepositoryError::VersionConflict)?;
        if stored.version != complaint.version {
            return Err(RepositoryError::VersionConflict);
        }

        let mut updated = complaint.clone();
        updated.version += 1;
        *stored = updated.clone();
        tables.append_events(events);
        self.wrote();
        Ok(updated)
    }
}

#[async_trait]
impl EmployeeRequestRepository for InMemoryStore {
    async fn insert_request(&self, request: &EmployeeRequest) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let has_pending = tables
            .requests
            .values()
            .any(|r| r.user_id == request.user_id && r.is_pending());
        if request.is_pending() && has_pending {
            return Err(RepositoryError::Duplicate("Pending request".into()));
        }
        tables.requests.insert(request.id, request.clone());
        self.wrote();
        Ok(())
    }

    async fn find_request_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<EmployeeRequest>, RepositoryError> {
        Ok(self.lock()?.requests.get(&id).cloned())
    }

    async fn find_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<EmployeeRequest>, RepositoryError> {
        let mut requests: Vec<EmployeeRequest> = self
            .lock()?
            .requests
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn find_request_by_user_and_status(
        &self,
        user_id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<EmployeeRequest>, RepositoryError> {
        Ok(self
            .lock()?
            .requests
            .values()
            .filter(|r| r.user_id == user_id && r.status == status)
            .min_by_key(|r| r.created_at)
            .cloned())
    }

    async fn decide_request(
        &self,
        request: &EmployeeRequest,
        promoted_user: Option<&User>,
        events: &[DomainEvent],
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.requests.get(&request.id) {
            Some(stored) if stored.is_pending() => {}
            _ => return Err(RepositoryError::AlreadyDecided),
        }

        tables.requests.insert(request.id, request.clone());
        if let Some(user) = promoted_user {
            tables.users.insert(user.id, user.clone());
        }
        tables.append_events(events);
        self.wrote();
        Ok(())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn insert_notification(
        &self,
        notification: &Notification,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        let Some(event) = tables
            .outbox
            .iter_mut()
            .find(|e| e.id == notification.source_event_id)
        else {
            return Err(RepositoryError::Corrupt(format!(
                "unknown outbox event {}",
                notification.source_event_id
            )));
        };
        if event.dispatched_at.is_some() {
            return Ok(false);
        }
        event.dispatched_at = Some(Utc::now());
        tables
            .notifications
            .insert(notification.id, notification.clone());
        self.wrote();
        Ok(true)
    }

    async fn find_notifications_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let mut notifications: Vec<Notification> = self
            .lock()?
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        match tables.notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.read = true;
                self.wrote();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl OutboxRepository for InMemoryStore {
    async fn pending_events(
        &self,
        limit: i64,
        max_attempts: i32,
    ) -> Result<Vec<OutboxEvent>, RepositoryError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut pending: Vec<OutboxEvent> = self
            .lock()?
            .outbox
            .iter()
            .filter(|e| e.dispatched_at.is_none() && e.attempts < max_attempts)
            .cloned()
            .collect();
        // Stable, so events with equal attempts stay in append order.
        pending.sort_by_key(|e| e.attempts);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn record_delivery_failure(
        &self,
        event_id: Uuid,
        error: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if let Some(event) = tables.outbox.iter_mut().find(|e| e.id == event_id) {
            event.attempts += 1;
            event.last_error = Some(error.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl Repositories for InMemoryStore {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.lock().map(|_| ())
    }
}
