use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::dtos::ErrorResponse;
use crate::models::UserResponse;
use crate::utils::password::Password;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate()?;

    let user = state
        .auth
        .signup(&req.email, Password::new(req.password), req.name)
        .await?;

    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    req.validate()?;

    let (user, token) = state
        .auth
        .login(&req.email, Password::new(req.password))
        .await?;

    Ok(Json(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.auth.jwt().expiry_seconds(),
        user: user.sanitized(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/admin/create",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Admin account created", body = UserResponse),
        (status = 401, description = "Invalid or missing admin API key", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("admin_api_key" = []))
)]
pub async fn create_admin(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate()?;

    let admin = state
        .auth
        .create_admin(&req.email, Password::new(req.password), req.name)
        .await?;

    Ok((StatusCode::CREATED, Json(admin.sanitized())))
}
