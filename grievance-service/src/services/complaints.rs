use std::sync::Arc;
use uuid::Uuid;

use super::error::ServiceError;
use super::repository::{ComplaintRepository, Repositories, UserRepository};
use crate::models::{Attachment, Complaint, Role, User};

/// Complaint intake and read-side queries.
#[derive(Clone)]
pub struct ComplaintService {
    repos: Arc<dyn Repositories>,
}

impl ComplaintService {
    pub fn new(repos: Arc<dyn Repositories>) -> Self {
        Self { repos }
    }

    pub async fn create(
        &self,
        citizen_id: Uuid,
        title: String,
        description: String,
        attachment: Option<Attachment>,
    ) -> Result<Complaint, ServiceError> {
        let title = title.trim().to_string();
        let description = description.trim().to_string();
        if title.is_empty() || description.is_empty() {
            return Err(ServiceError::ValidationError(
                "title and description are required".to_string(),
            ));
        }

        let complaint = Complaint::new(citizen_id, title, description, attachment);
        self.repos.insert_complaint(&complaint).await?;

        tracing::info!(
            complaint_id = %complaint.id,
            citizen_id = %citizen_id,
            has_attachment = complaint.attachment.is_some(),
            "Complaint filed"
        );
        Ok(complaint)
    }

    pub async fn list_for_citizen(&self, citizen_id: Uuid) -> Result<Vec<Complaint>, ServiceError> {
        Ok(self.repos.find_complaints_by_citizen(citizen_id).await?)
    }

    pub async fn list_assigned(&self, employee_id: Uuid) -> Result<Vec<Complaint>, ServiceError> {
        Ok(self.repos.find_complaints_by_employee(employee_id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Complaint>, ServiceError> {
        Ok(self.repos.list_complaints().await?)
    }

    /// Complaints the viewer may not see are reported as missing.
    pub async fn get(&self, id: Uuid, viewer: &User) -> Result<Complaint, ServiceError> {
        match self.repos.find_complaint_by_id(id).await? {
            Some(complaint) if complaint.is_visible_to(viewer) => Ok(complaint),
            _ => Err(ServiceError::ComplaintNotFound),
        }
    }

    pub async fn list_staff(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.repos.find_users_by_roles(&Role::STAFF).await?)
    }
}
