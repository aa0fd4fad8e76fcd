use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::models::User;
use crate::AppState;

/// Validates the bearer token and loads the caller's current user record.
///
/// The role is read from storage rather than from the token, so approvals
/// take effect on the next request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let user = state.auth.authenticate(token).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Must be layered inside [`auth_middleware`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<User>() {
        Some(user) if user.is_admin() => Ok(next.run(req).await),
        Some(_) => Err(AppError::Forbidden(anyhow::anyhow!("Admin role required"))),
        None => Err(AppError::Unauthorized(anyhow::anyhow!("Authentication required"))),
    }
}

/// Must be layered inside [`auth_middleware`].
pub async fn require_staff(req: Request, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<User>() {
        Some(user) if user.role.is_staff() => Ok(next.run(req).await),
        Some(_) => Err(AppError::Forbidden(anyhow::anyhow!("Staff role required"))),
        None => Err(AppError::Unauthorized(anyhow::anyhow!("Authentication required"))),
    }
}

/// Extractor for the authenticated user
pub struct AuthUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Authenticated user missing from request extensions"
                ))
            })
    }
}
