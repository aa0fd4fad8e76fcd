use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of OPEN, ASSIGNED, RESOLVED, ESCALATED (case-insensitive).
    #[validate(length(min = 1, message = "Status is required"))]
    #[schema(example = "RESOLVED")]
    pub status: String,

    #[validate(length(max = 4000, message = "Note must be at most 4000 characters"))]
    #[schema(example = "Pothole filled on Tuesday")]
    pub note: Option<String>,
}

/// Multipart form accepted by `POST /complaints`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateComplaintForm {
    #[schema(example = "Broken streetlight")]
    pub title: String,
    #[schema(example = "The light at Main St and 3rd has been out for a week")]
    pub description: String,
    /// Optional attachment. Only its name and size are recorded.
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<Vec<u8>>,
}
