//! Citizen-facing complaint endpoints.

use axum::{
    extract::{Json, Multipart, Path, State},
    http::StatusCode,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::complaints::CreateComplaintForm;
use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::{Attachment, Complaint};
use crate::AppState;

#[derive(Default)]
struct ComplaintForm {
    title: Option<String>,
    description: Option<String>,
    attachment: Option<Attachment>,
}

async fn read_form(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<ComplaintForm, AppError> {
    let mut form = ComplaintForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                form.title = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Invalid title field: {}", e))
                })?)
            }
            "description" => {
                form.description = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Invalid description field: {}", e))
                })?)
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(str::to_string);
                // Only the size is kept, so the body is counted chunk by chunk and dropped.
                let mut size: usize = 0;
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
                })? {
                    size += chunk.len();
                    if size > max_upload_bytes {
                        return Err(AppError::BadRequest(anyhow::anyhow!(
                            "File too large (max {} bytes)",
                            max_upload_bytes
                        )));
                    }
                }
                // An empty file part means no attachment was chosen.
                if size > 0 {
                    form.attachment = Some(Attachment {
                        file_name: file_name.unwrap_or_else(|| "unnamed".to_string()),
                        file_size: size as i64,
                    });
                }
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

#[utoipa::path(
    post,
    path = "/complaints",
    request_body(content = CreateComplaintForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Complaint filed", body = Complaint),
        (status = 400, description = "Missing fields or file too large", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Complaints",
    security(("bearer_auth" = []))
)]
pub async fn create_complaint(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Complaint>), AppError> {
    let form = read_form(multipart, state.settings.max_upload_bytes).await?;

    let title = form
        .title
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("title is required")))?;
    let description = form
        .description
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("description is required")))?;

    let complaint = state
        .complaints
        .create(user.id, title, description, form.attachment)
        .await?;

    Ok((StatusCode::CREATED, Json(complaint)))
}

#[utoipa::path(
    get,
    path = "/complaints",
    responses(
        (status = 200, description = "Complaints filed by the caller, newest first", body = [Complaint]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Complaints",
    security(("bearer_auth" = []))
)]
pub async fn list_my_complaints(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Complaint>>, AppError> {
    Ok(Json(state.complaints.list_for_citizen(user.id).await?))
}

#[utoipa::path(
    get,
    path = "/complaints/{id}",
    params(("id" = Uuid, Path, description = "Complaint ID")),
    responses(
        (status = 200, description = "Complaint", body = Complaint),
        (status = 404, description = "Complaint not found or not visible", body = ErrorResponse)
    ),
    tag = "Complaints",
    security(("bearer_auth" = []))
)]
pub async fn get_complaint(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Complaint>, AppError> {
    Ok(Json(state.complaints.get(id, &user).await?))
}
