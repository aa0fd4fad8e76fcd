use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitRoleRequest {
    #[validate(length(min = 1, max = 50, message = "Level must be 1-50 characters"))]
    #[schema(example = "BEGINNER")]
    pub level: String,

    #[validate(length(max = 2000, message = "Reason must be at most 2000 characters"))]
    #[schema(example = "I work in the city maintenance department")]
    pub reason: Option<String>,
}
