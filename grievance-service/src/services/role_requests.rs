use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{RepositoryError, ServiceError};
use super::metrics;
use super::repository::{EmployeeRequestRepository, Repositories, UserRepository};
use crate::models::{DomainEvent, EmployeeRequest, RequestStatus, Role};

/// Submission and admin review of requests for the EMPLOYEE role.
#[derive(Clone)]
pub struct RoleRequestService {
    repos: Arc<dyn Repositories>,
}

impl RoleRequestService {
    pub fn new(repos: Arc<dyn Repositories>) -> Self {
        Self { repos }
    }

    pub async fn submit(
        &self,
        user_id: Uuid,
        level: String,
        reason: Option<String>,
    ) -> Result<EmployeeRequest, ServiceError> {
        let user = self
            .repos
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if user.role != Role::User {
            return Err(ServiceError::NotEligible);
        }

        if self
            .repos
            .find_request_by_user_and_status(user_id, RequestStatus::Pending)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicatePendingRequest);
        }

        let request = EmployeeRequest::new(user_id, level, reason);
        // Two concurrent submissions can both pass the check above; the store rejects the second.
        self.repos
            .insert_request(&request)
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate(_) => ServiceError::DuplicatePendingRequest,
                other => other.into(),
            })?;

        tracing::info!(request_id = %request.id, user_id = %user_id, level = %request.level, "Role request submitted");
        Ok(request)
    }

    pub async fn pending_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EmployeeRequest>, ServiceError> {
        Ok(self
            .repos
            .find_request_by_user_and_status(user_id, RequestStatus::Pending)
            .await?)
    }

    pub async fn list_pending(&self) -> Result<Vec<EmployeeRequest>, ServiceError> {
        Ok(self
            .repos
            .find_requests_by_status(RequestStatus::Pending)
            .await?)
    }

    /// Promotes the requesting user to EMPLOYEE.
    pub async fn approve(&self, request_id: Uuid) -> Result<EmployeeRequest, ServiceError> {
        self.decide(request_id, RequestStatus::Approved).await
    }

    /// Closes the request; the user's role is left unchanged.
    pub async fn reject(&self, request_id: Uuid) -> Result<EmployeeRequest, ServiceError> {
        self.decide(request_id, RequestStatus::Rejected).await
    }

    async fn decide(
        &self,
        request_id: Uuid,
        decision: RequestStatus,
    ) -> Result<EmployeeRequest, ServiceError> {
        let mut request = self
            .repos
            .find_request_by_id(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound)?;

        if !request.is_pending() {
            return Err(ServiceError::RequestAlreadyDecided);
        }

        let mut user = self
            .repos
            .find_user_by_id(request.user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        request.status = decision;
        request.decided_at = Some(Utc::now());

        let (promoted, event) = match decision {
            RequestStatus::Approved => {
                user.role = request.requested_role;
                (
                    Some(&user),
                    DomainEvent::RoleRequestApproved {
                        request_id: request.id,
                        user_id: user.id,
                    },
                )
            }
            _ => (
                None,
                DomainEvent::RoleRequestRejected {
                    request_id: request.id,
                    user_id: user.id,
                },
            ),
        };

        self.repos
            .decide_request(&request, promoted, &[event])
            .await
            .map_err(|e| match e {
                RepositoryError::AlreadyDecided => ServiceError::RequestAlreadyDecided,
                other => other.into(),
            })?;

        metrics::record_role_decision(&decision.as_str().to_lowercase());
        tracing::info!(
            request_id = %request.id,
            user_id = %user.id,
            decision = %decision.as_str(),
            "Role request decided"
        );
        Ok(request)
    }
}
