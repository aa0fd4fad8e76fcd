//! Domain events and the outbox records that carry them.
//!
//! Events are appended in the same write as the state change that caused
//! them; the notification dispatcher later turns each one into exactly one
//! [`Notification`](super::Notification).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ComplaintResolved {
        complaint_id: Uuid,
        citizen_id: Uuid,
        title: String,
    },
    ComplaintEscalated {
        complaint_id: Uuid,
        citizen_id: Uuid,
        title: String,
    },
    ComplaintAssigned {
        complaint_id: Uuid,
        employee_id: Uuid,
        title: String,
    },
    ComplaintAutoEscalated {
        complaint_id: Uuid,
        manager_id: Uuid,
        title: String,
    },
    RoleRequestApproved {
        request_id: Uuid,
        user_id: Uuid,
    },
    RoleRequestRejected {
        request_id: Uuid,
        user_id: Uuid,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::ComplaintResolved { .. } => "complaint_resolved",
            DomainEvent::ComplaintEscalated { .. } => "complaint_escalated",
            DomainEvent::ComplaintAssigned { .. } => "complaint_assigned",
            DomainEvent::ComplaintAutoEscalated { .. } => "complaint_auto_escalated",
            DomainEvent::RoleRequestApproved { .. } => "role_request_approved",
            DomainEvent::RoleRequestRejected { .. } => "role_request_rejected",
        }
    }

    /// User who gets notified.
    pub fn recipient(&self) -> Uuid {
        match self {
            DomainEvent::ComplaintResolved { citizen_id, .. }
            | DomainEvent::ComplaintEscalated { citizen_id, .. } => *citizen_id,
            DomainEvent::ComplaintAssigned { employee_id, .. } => *employee_id,
            DomainEvent::ComplaintAutoEscalated { manager_id, .. } => *manager_id,
            DomainEvent::RoleRequestApproved { user_id, .. }
            | DomainEvent::RoleRequestRejected { user_id, .. } => *user_id,
        }
    }

    pub fn message(&self) -> String {
        match self {
            DomainEvent::ComplaintResolved { title, .. } => {
                format!("Your complaint '{}' has been resolved!", title)
            }
            DomainEvent::ComplaintEscalated { title, .. } => {
                format!("Your complaint '{}' has been escalated.", title)
            }
            DomainEvent::ComplaintAssigned { title, .. } => format!("Task assigned: {}", title),
            DomainEvent::ComplaintAutoEscalated { title, .. } => {
                format!("Escalated task assigned: {}", title)
            }
            DomainEvent::RoleRequestApproved { .. } => {
                "Your request for the EMPLOYEE role has been approved.".to_string()
            }
            DomainEvent::RoleRequestRejected { .. } => {
                "Your request for the EMPLOYEE role has been rejected.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub event: DomainEvent,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

impl OutboxEvent {
    pub fn new(event: DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            created_at: Utc::now(),
            dispatched_at: None,
            attempts: 0,
            last_error: None,
        }
    }
}
