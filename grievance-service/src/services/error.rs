use service_core::error::AppError;
use thiserror::Error;

use crate::models::ComplaintStatus;

/// Errors raised by the persistence layer.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The row changed since it was read.
    #[error("Record was modified concurrently")]
    VersionConflict,

    /// The request was no longer PENDING when the decision was written.
    #[error("Request has already been decided")]
    AlreadyDecided,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Maps a Postgres unique violation (SQLSTATE 23505) onto `Duplicate`.
    pub fn from_sqlx(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                RepositoryError::Duplicate(what.to_string())
            }
            _ => RepositoryError::Database(err),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Complaint not found")]
    ComplaintNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Employee not found")]
    EmployeeNotFound,

    #[error("Request not found")]
    RequestNotFound,

    #[error("Notification not found")]
    NotificationNotFound,

    #[error("{0}")]
    InvalidStatus(String),

    #[error("Cannot move complaint from {from} to {to}")]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },

    #[error("Complaint is not assigned to you")]
    NotAssignee,

    #[error("User is not a staff member")]
    NotStaff,

    #[error("Only users with the USER role can request promotion")]
    NotEligible,

    #[error("A pending request already exists")]
    DuplicatePendingRequest,

    #[error("Request has already been decided")]
    RequestAlreadyDecided,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Repository(e) => match e {
                RepositoryError::VersionConflict => {
                    AppError::Conflict(anyhow::anyhow!("Complaint was modified concurrently"))
                }
                RepositoryError::AlreadyDecided => {
                    AppError::Conflict(anyhow::anyhow!("Request has already been decided"))
                }
                RepositoryError::Duplicate(what) => {
                    AppError::Conflict(anyhow::anyhow!("{} already exists", what))
                }
                RepositoryError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
                other => AppError::InternalError(anyhow::Error::new(other)),
            },
            ServiceError::Internal(e) => AppError::InternalError(e),
            e @ (ServiceError::ComplaintNotFound
            | ServiceError::UserNotFound
            | ServiceError::EmployeeNotFound
            | ServiceError::RequestNotFound
            | ServiceError::NotificationNotFound) => AppError::NotFound(anyhow::anyhow!(e.to_string())),
            e @ (ServiceError::InvalidStatus(_)
            | ServiceError::NotStaff
            | ServiceError::ValidationError(_)) => AppError::BadRequest(anyhow::anyhow!(e.to_string())),
            e @ (ServiceError::InvalidTransition { .. }
            | ServiceError::DuplicatePendingRequest
            | ServiceError::RequestAlreadyDecided
            | ServiceError::EmailAlreadyRegistered) => AppError::Conflict(anyhow::anyhow!(e.to_string())),
            e @ (ServiceError::NotAssignee
            | ServiceError::NotEligible
            | ServiceError::Forbidden(_)) => AppError::Forbidden(anyhow::anyhow!(e.to_string())),
            e @ (ServiceError::InvalidCredentials | ServiceError::InvalidToken) => {
                AppError::Unauthorized(anyhow::anyhow!(e.to_string()))
            }
        }
    }
}
