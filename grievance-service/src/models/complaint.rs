//! Complaint model and its status state machine.
//!
//! Every status change goes through [`ComplaintStatus::can_transition`], which
//! encodes the full table of allowed moves per kind of operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintStatus {
    Open,
    Assigned,
    Resolved,
    Escalated,
}

/// The operation asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Staff or admin setting a status (optionally with a note).
    StatusUpdate,
    /// Admin attaching an employee.
    Assignment,
    /// The periodic escalation sweep.
    Sweep,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Open => "OPEN",
            ComplaintStatus::Assigned => "ASSIGNED",
            ComplaintStatus::Resolved => "RESOLVED",
            ComplaintStatus::Escalated => "ESCALATED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == ComplaintStatus::Resolved
    }

    pub fn can_transition(self, to: ComplaintStatus, via: TransitionKind) -> bool {
        use ComplaintStatus::*;
        use TransitionKind::*;

        matches!(
            (self, to, via),
            (Open, Assigned, Assignment)
                | (Assigned, Assigned, Assignment | StatusUpdate)
                | (Escalated, Escalated, Assignment | StatusUpdate)
                | (Assigned, Resolved | Escalated, StatusUpdate)
                | (Escalated, Resolved, StatusUpdate)
                | (Assigned, Escalated, Sweep)
                | (Open, Open, StatusUpdate)
        )
    }

    /// Status a complaint lands in when an employee is attached.
    /// Escalated complaints keep their status.
    pub fn after_assignment(self) -> ComplaintStatus {
        match self {
            ComplaintStatus::Escalated => ComplaintStatus::Escalated,
            _ => ComplaintStatus::Assigned,
        }
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OPEN" => Ok(ComplaintStatus::Open),
            "ASSIGNED" => Ok(ComplaintStatus::Assigned),
            "RESOLVED" => Ok(ComplaintStatus::Resolved),
            "ESCALATED" => Ok(ComplaintStatus::Escalated),
            _ => Err(format!("Invalid complaint status: {}", s)),
        }
    }
}

/// Metadata of an uploaded file. The content itself is not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    pub file_name: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Complaint {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub notes: Option<String>,
    pub attachment: Option<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency counter, bumped by every persisted update.
    pub version: i64,
}

impl Complaint {
    pub fn new(
        citizen_id: Uuid,
        title: String,
        description: String,
        attachment: Option<Attachment>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            citizen_id,
            employee_id: None,
            title,
            description,
            status: ComplaintStatus::Open,
            notes: None,
            attachment,
            created_at: now,
            updated_at: now,
            assigned_at: None,
            version: 0,
        }
    }

    /// Owner, current assignee and admins may read a complaint.
    pub fn is_visible_to(&self, user: &User) -> bool {
        user.is_admin() || self.citizen_id == user.id || self.employee_id == Some(user.id)
    }
}
