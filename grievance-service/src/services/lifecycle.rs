//! Status updates and assignment of complaints.
//!
//! Both operations read the complaint, check the move against
//! [`ComplaintStatus::can_transition`], and persist the new state together
//! with its domain events in one versioned write.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::error::ServiceError;
use super::metrics;
use super::repository::{ComplaintRepository, Repositories, UserRepository};
use crate::models::{Complaint, ComplaintStatus, DomainEvent, TransitionKind, User};

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Admin,
    /// A staff member, allowed to touch only complaints assigned to them.
    Staff(Uuid),
}

impl Actor {
    pub fn for_user(user: &User) -> Self {
        if user.is_admin() {
            Actor::Admin
        } else {
            Actor::Staff(user.id)
        }
    }
}

#[derive(Clone)]
pub struct ComplaintLifecycle {
    repos: Arc<dyn Repositories>,
}

impl ComplaintLifecycle {
    pub fn new(repos: Arc<dyn Repositories>) -> Self {
        Self { repos }
    }

    /// Sets the status and overwrites the notes of a complaint.
    pub async fn update_status(
        &self,
        complaint_id: Uuid,
        new_status: &str,
        note: Option<String>,
        actor: Actor,
    ) -> Result<Complaint, ServiceError> {
        let to: ComplaintStatus = new_status.parse().map_err(ServiceError::InvalidStatus)?;

        let mut complaint = self
            .repos
            .find_complaint_by_id(complaint_id)
            .await?
            .ok_or(ServiceError::ComplaintNotFound)?;

        if let Actor::Staff(user_id) = actor {
            if complaint.employee_id != Some(user_id) {
                metrics::record_status_update(to.as_str(), "forbidden");
                return Err(ServiceError::NotAssignee);
            }
        }

        let from = complaint.status;
        if !from.can_transition(to, TransitionKind::StatusUpdate) {
            metrics::record_status_update(to.as_str(), "rejected");
            return Err(ServiceError::InvalidTransition { from, to });
        }

        complaint.status = to;
        complaint.notes = note;
        complaint.updated_at = Utc::now();

        let events = match to {
            _ if from == to => vec![],
            ComplaintStatus::Resolved => vec![DomainEvent::ComplaintResolved {
                complaint_id: complaint.id,
                citizen_id: complaint.citizen_id,
                title: complaint.title.clone(),
            }],
            ComplaintStatus::Escalated => vec![DomainEvent::ComplaintEscalated {
                complaint_id: complaint.id,
                citizen_id: complaint.citizen_id,
                title: complaint.title.clone(),
            }],
            _ => vec![],
        };

        let saved = self.repos.update_complaint(&complaint, &events).await?;
        metrics::record_status_update(to.as_str(), "ok");

        tracing::info!(
            complaint_id = %saved.id,
            from = %from,
            to = %to,
            actor = ?actor,
            "Complaint status updated"
        );
        Ok(saved)
    }

    /// Attaches an employee. Escalated complaints keep their status.
    pub async fn assign(
        &self,
        complaint_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Complaint, ServiceError> {
        let mut complaint = self
            .repos
            .find_complaint_by_id(complaint_id)
            .await?
            .ok_or(ServiceError::ComplaintNotFound)?;

        let employee = self
            .repos
            .find_user_by_id(employee_id)
            .await?
            .ok_or(ServiceError::EmployeeNotFound)?;

        if !employee.role.is_staff() {
            metrics::record_assignment("not_staff");
            return Err(ServiceError::NotStaff);
        }

        let from = complaint.status;
        let to = from.after_assignment();
        if !from.can_transition(to, TransitionKind::Assignment) {
            metrics::record_assignment("rejected");
            return Err(ServiceError::InvalidTransition { from, to });
        }

        let now = Utc::now();
        complaint.employee_id = Some(employee.id);
        complaint.status = to;
        complaint.assigned_at = Some(now);
        complaint.updated_at = now;

        let event = DomainEvent::ComplaintAssigned {
            complaint_id: complaint.id,
            employee_id: employee.id,
            title: complaint.title.clone(),
        };

        let saved = self.repos.update_complaint(&complaint, &[event]).await?;
        metrics::record_assignment("ok");

        tracing::info!(
            complaint_id = %saved.id,
            employee_id = %employee.id,
            status = %saved.status,
            "Complaint assigned"
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::memory::InMemoryStore;
    use crate::services::repository::*;

    async fn seeded() -> (Arc<InMemoryStore>, ComplaintLifecycle, Complaint, User) {
        let store = Arc::new(InMemoryStore::new());
        let employee = User::new("e@x.test".into(), None, String::new(), Role::Employee);
        store.insert_user(&employee).await.unwrap();
        let complaint = Complaint::new(Uuid::new_v4(), "Leak".into(), "Water main".into(), None);
        store.insert_complaint(&complaint).await.unwrap();
        let lifecycle = ComplaintLifecycle::new(store.clone());
        (store, lifecycle, complaint, employee)
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_before_lookup() {
        let (_, lifecycle, _, _) = seeded().await;
        let err = lifecycle
            .update_status(Uuid::new_v4(), "archived", None, Actor::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStatus(_)));
    }

    #[tokio::test]
    async fn open_complaint_cannot_be_resolved_directly() {
        let (store, lifecycle, complaint, _) = seeded().await;
        let writes = store.write_count();
        let err = lifecycle
            .update_status(complaint.id, "RESOLVED", None, Actor::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn staff_cannot_update_unassigned_complaint() {
        let (_, lifecycle, complaint, employee) = seeded().await;
        let err = lifecycle
            .update_status(complaint.id, "OPEN", Some("note".into()), Actor::Staff(employee.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotAssignee));
    }

    #[tokio::test]
    async fn note_only_update_emits_nothing() {
        let (store, lifecycle, complaint, employee) = seeded().await;
        lifecycle.assign(complaint.id, employee.id).await.unwrap();
        let before = store.outbox_events().len();

        let saved = lifecycle
            .update_status(complaint.id, "assigned", Some("on it".into()), Actor::Staff(employee.id))
            .await
            .unwrap();
        assert_eq!(saved.notes.as_deref(), Some("on it"));
        assert_eq!(store.outbox_events().len(), before);
    }

    #[tokio::test]
    async fn assigning_a_citizen_is_rejected() {
        let (store, lifecycle, complaint, _) = seeded().await;
        let citizen = User::new("c@x.test".into(), None, String::new(), Role::User);
        store.insert_user(&citizen).await.unwrap();

        let err = lifecycle.assign(complaint.id, citizen.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotStaff));
    }
}
