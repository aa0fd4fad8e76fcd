use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::events::OutboxEvent;

/// A message addressed to one user. Only the read flag ever changes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    /// Outbox event this notification was produced from.
    pub source_event_id: Uuid,
}

impl Notification {
    pub fn from_event(event: &OutboxEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: event.event.recipient(),
            message: event.event.message(),
            read: false,
            created_at: Utc::now(),
            source_event_id: event.id,
        }
    }
}
