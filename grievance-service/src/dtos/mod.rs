pub mod auth;
pub mod complaints;
pub mod role_requests;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Complaint not found")]
    pub error: String,
    pub details: Option<String>,
}
