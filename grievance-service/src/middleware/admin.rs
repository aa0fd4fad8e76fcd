use crate::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

pub const ADMIN_API_KEY_HEADER: &str = "X-Admin-Api-Key";

/// Guards bootstrap endpoints with the static admin API key.
pub async fn admin_api_key_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let api_key = headers
        .get(ADMIN_API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match api_key {
        Some(key) if !key.is_empty() && key == state.settings.admin_api_key => {
            next.run(request).await
        }
        _ => {
            tracing::warn!("Failed admin API key authentication attempt");
            AppError::Unauthorized(anyhow::anyhow!("Invalid or missing admin API key"))
                .into_response()
        }
    }
}
