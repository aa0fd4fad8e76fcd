use std::sync::Arc;
use uuid::Uuid;

use super::error::ServiceError;
use super::repository::{NotificationRepository, Repositories};
use crate::models::Notification;

/// Recipient-side access to notifications.
#[derive(Clone)]
pub struct NotificationService {
    repos: Arc<dyn Repositories>,
}

impl NotificationService {
    pub fn new(repos: Arc<dyn Repositories>) -> Self {
        Self { repos }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, ServiceError> {
        Ok(self.repos.find_notifications_by_user(user_id).await?)
    }

    /// Someone else's notification is reported as missing.
    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        if self.repos.mark_notification_read(id, user_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotificationNotFound)
        }
    }
}
