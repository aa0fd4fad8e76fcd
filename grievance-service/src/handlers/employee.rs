//! Endpoints for staff working their assigned complaints.

use axum::extract::{Json, Path, State};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::complaints::UpdateStatusRequest;
use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::Complaint;
use crate::services::Actor;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/employee/complaints",
    responses(
        (status = 200, description = "Complaints assigned to the caller", body = [Complaint]),
        (status = 403, description = "Staff role required", body = ErrorResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_assigned_complaints(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Complaint>>, AppError> {
    Ok(Json(state.complaints.list_assigned(user.id).await?))
}

#[utoipa::path(
    put,
    path = "/employee/complaints/{id}/status",
    params(("id" = Uuid, Path, description = "Complaint ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Complaint),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 403, description = "Complaint is not assigned to the caller", body = ErrorResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed or concurrent update", body = ErrorResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_assigned_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Complaint>, AppError> {
    req.validate()?;

    let complaint = state
        .lifecycle
        .update_status(id, &req.status, req.note, Actor::Staff(user.id))
        .await?;

    Ok(Json(complaint))
}
