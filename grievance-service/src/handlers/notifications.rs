use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::Notification;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "The caller's notifications, newest first", body = [Notification])
    ),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.notifications.list_for_user(user.id).await?))
}

#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Marked as read"),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    ),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.notifications.mark_read(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
