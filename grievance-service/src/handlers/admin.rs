//! Admin oversight: complaint assignment, role approval and manual escalation.

use axum::extract::{Json, Path, State};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::complaints::UpdateStatusRequest;
use crate::dtos::ErrorResponse;
use crate::models::{Complaint, EmployeeRequest, UserResponse};
use crate::services::{Actor, SweepReport};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/admin/complaints",
    responses(
        (status = 200, description = "All complaints, newest first", body = [Complaint]),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn list_all_complaints(
    State(state): State<AppState>,
) -> Result<Json<Vec<Complaint>>, AppError> {
    Ok(Json(state.complaints.list_all().await?))
}

#[utoipa::path(
    get,
    path = "/admin/employees",
    responses(
        (status = 200, description = "Employees, managers and senior managers", body = [UserResponse]),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let staff = state.complaints.list_staff().await?;
    Ok(Json(staff.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/admin/complaints/{id}/status",
    params(("id" = Uuid, Path, description = "Complaint ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Complaint),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed or concurrent update", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn admin_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Complaint>, AppError> {
    req.validate()?;

    let complaint = state
        .lifecycle
        .update_status(id, &req.status, req.note, Actor::Admin)
        .await?;

    Ok(Json(complaint))
}

#[utoipa::path(
    post,
    path = "/admin/complaints/{id}/assign/{employee_id}",
    params(
        ("id" = Uuid, Path, description = "Complaint ID"),
        ("employee_id" = Uuid, Path, description = "Staff user ID")
    ),
    responses(
        (status = 200, description = "Complaint assigned", body = Complaint),
        (status = 400, description = "User is not a staff member", body = ErrorResponse),
        (status = 404, description = "Complaint or employee not found", body = ErrorResponse),
        (status = 409, description = "Complaint is resolved", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn assign_complaint(
    State(state): State<AppState>,
    Path((complaint_id, employee_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Complaint>, AppError> {
    Ok(Json(state.lifecycle.assign(complaint_id, employee_id).await?))
}

#[utoipa::path(
    get,
    path = "/admin/role-requests",
    responses(
        (status = 200, description = "Pending role requests, oldest first", body = [EmployeeRequest])
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn list_role_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<EmployeeRequest>>, AppError> {
    Ok(Json(state.role_requests.list_pending().await?))
}

#[utoipa::path(
    post,
    path = "/admin/role-requests/{id}/approve",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request approved", body = EmployeeRequest),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Request already decided", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn approve_role_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmployeeRequest>, AppError> {
    Ok(Json(state.role_requests.approve(id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/role-requests/{id}/reject",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request rejected", body = EmployeeRequest),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Request already decided", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn reject_role_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmployeeRequest>, AppError> {
    Ok(Json(state.role_requests.reject(id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/escalations/run",
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn run_escalation(State(state): State<AppState>) -> Result<Json<SweepReport>, AppError> {
    Ok(Json(state.escalation.run_once().await?))
}
