use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::role_requests::SubmitRoleRequest;
use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::EmployeeRequest;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/role-requests",
    request_body = SubmitRoleRequest,
    responses(
        (status = 201, description = "Request submitted", body = EmployeeRequest),
        (status = 403, description = "Only USER accounts may apply", body = ErrorResponse),
        (status = 409, description = "A pending request already exists", body = ErrorResponse)
    ),
    tag = "Role Requests",
    security(("bearer_auth" = []))
)]
pub async fn submit_role_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<SubmitRoleRequest>,
) -> Result<(StatusCode, Json<EmployeeRequest>), AppError> {
    req.validate()?;

    let request = state
        .role_requests
        .submit(user.id, req.level.trim().to_uppercase(), req.reason)
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/role-requests/pending",
    responses(
        (status = 200, description = "The caller's pending request, or null", body = EmployeeRequest)
    ),
    tag = "Role Requests",
    security(("bearer_auth" = []))
)]
pub async fn my_pending_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Option<EmployeeRequest>>, AppError> {
    Ok(Json(state.role_requests.pending_for_user(user.id).await?))
}
