use axum::extract::{Json, Path, State};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::UserResponse;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 403, description = "Not your profile", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.auth.get_user(id, &viewer).await?;
    Ok(Json(user.sanitized()))
}
