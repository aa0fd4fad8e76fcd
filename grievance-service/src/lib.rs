//! Grievance tracking service: complaint lifecycle, assignment, role approval
//! and scheduled escalation.

pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Json, Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GrievanceConfig;
use crate::services::{
    AuthService, ComplaintLifecycle, ComplaintService, EscalationSweep, JwtService,
    NotificationDispatcher, NotificationService, Repositories, RoleRequestService,
};
use crate::utils::password::PasswordHashing;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::create_admin,
        handlers::users::get_user,
        handlers::complaints::create_complaint,
        handlers::complaints::list_my_complaints,
        handlers::complaints::get_complaint,
        handlers::employee::list_assigned_complaints,
        handlers::employee::update_assigned_status,
        handlers::role_requests::submit_role_request,
        handlers::role_requests::my_pending_request,
        handlers::notifications::list_notifications,
        handlers::notifications::mark_notification_read,
        handlers::admin::list_all_complaints,
        handlers::admin::list_employees,
        handlers::admin::admin_update_status,
        handlers::admin::assign_complaint,
        handlers::admin::list_role_requests,
        handlers::admin::approve_role_request,
        handlers::admin::reject_role_request,
        handlers::admin::run_escalation,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::SignupRequest,
            dtos::auth::LoginRequest,
            dtos::auth::AuthResponse,
            dtos::complaints::UpdateStatusRequest,
            dtos::complaints::CreateComplaintForm,
            dtos::role_requests::SubmitRoleRequest,
            models::Role,
            models::UserResponse,
            models::Complaint,
            models::ComplaintStatus,
            models::Attachment,
            models::EmployeeRequest,
            models::RequestStatus,
            models::Notification,
            services::SweepReport,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Signup, login and admin bootstrap"),
        (name = "Users", description = "User profiles"),
        (name = "Complaints", description = "Filing and tracking complaints"),
        (name = "Employee", description = "Working assigned complaints"),
        (name = "Role Requests", description = "Applying for the EMPLOYEE role"),
        (name = "Notifications", description = "User notifications"),
        (name = "Admin", description = "Assignment, approval and escalation"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "admin_api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-admin-api-key"))),
            );
        }
    }
}

/// HTTP-facing settings, split out of [`GrievanceConfig`] so tests can build a router without
/// loading the environment.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub admin_api_key: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub swagger_enabled: bool,
    pub escalation_threshold_days: i64,
    pub notifier_batch_size: i64,
    pub notifier_max_attempts: i32,
}

impl ApiSettings {
    pub fn from_config(config: &GrievanceConfig) -> Self {
        Self {
            admin_api_key: config.security.admin_api_key.clone(),
            allowed_origins: config.security.allowed_origins.clone(),
            max_upload_bytes: config.uploads.max_upload_bytes,
            swagger_enabled: config.swagger_enabled,
            escalation_threshold_days: config.escalation.threshold_days,
            notifier_batch_size: config.notifier.batch_size,
            notifier_max_attempts: config.notifier.max_attempts,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: ApiSettings,
    pub repos: Arc<dyn Repositories>,
    pub auth: AuthService,
    pub complaints: ComplaintService,
    pub lifecycle: ComplaintLifecycle,
    pub role_requests: RoleRequestService,
    pub notifications: NotificationService,
    pub escalation: Arc<EscalationSweep>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl AppState {
    pub fn new(
        repos: Arc<dyn Repositories>,
        hasher: Arc<dyn PasswordHashing>,
        jwt: JwtService,
        settings: ApiSettings,
    ) -> Self {
        Self {
            auth: AuthService::new(repos.clone(), hasher, jwt),
            complaints: ComplaintService::new(repos.clone()),
            lifecycle: ComplaintLifecycle::new(repos.clone()),
            role_requests: RoleRequestService::new(repos.clone()),
            notifications: NotificationService::new(repos.clone()),
            escalation: Arc::new(EscalationSweep::new(
                repos.clone(),
                settings.escalation_threshold_days,
            )),
            dispatcher: Arc::new(
                NotificationDispatcher::new(repos.clone(), settings.notifier_batch_size)
                    .with_max_attempts(settings.notifier_max_attempts),
            ),
            repos,
            settings,
        }
    }
}

/// Slack for multipart framing and the text fields on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-admin-api-key"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub fn build_router(state: AppState) -> Router {
    let auth_layer = from_fn_with_state(state.clone(), middleware::auth_middleware);

    let bootstrap_routes = Router::new()
        .route("/auth/admin/create", post(handlers::auth::create_admin))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::admin_api_key_middleware,
        ));

    let user_routes = Router::new()
        .route("/users/:id", get(handlers::users::get_user))
        .route(
            "/complaints",
            post(handlers::complaints::create_complaint)
                .layer(DefaultBodyLimit::max(
                    state.settings.max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
                ))
                .get(handlers::complaints::list_my_complaints),
        )
        .route("/complaints/:id", get(handlers::complaints::get_complaint))
        .route(
            "/role-requests",
            post(handlers::role_requests::submit_role_request),
        )
        .route(
            "/role-requests/pending",
            get(handlers::role_requests::my_pending_request),
        )
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/:id/read",
            post(handlers::notifications::mark_notification_read),
        )
        .route_layer(auth_layer.clone());

    let staff_routes = Router::new()
        .route(
            "/employee/complaints",
            get(handlers::employee::list_assigned_complaints),
        )
        .route(
            "/employee/complaints/:id/status",
            put(handlers::employee::update_assigned_status),
        )
        .route_layer(from_fn(middleware::require_staff))
        .route_layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/admin/complaints", get(handlers::admin::list_all_complaints))
        .route("/admin/employees", get(handlers::admin::list_employees))
        .route(
            "/admin/complaints/:id/status",
            put(handlers::admin::admin_update_status),
        )
        .route(
            "/admin/complaints/:id/assign/:employee_id",
            post(handlers::admin::assign_complaint),
        )
        .route("/admin/role-requests", get(handlers::admin::list_role_requests))
        .route(
            "/admin/role-requests/:id/approve",
            post(handlers::admin::approve_role_request),
        )
        .route(
            "/admin/role-requests/:id/reject",
            post(handlers::admin::reject_role_request),
        )
        .route("/admin/escalations/run", post(handlers::admin::run_escalation))
        .route_layer(from_fn(middleware::require_admin))
        .route_layer(auth_layer);

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login));

    if state.settings.swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    app.merge(bootstrap_routes)
        .merge(user_routes)
        .merge(staff_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.settings.allowed_origins))
}
