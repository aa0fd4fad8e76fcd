//! Shared setup for grievance-service integration tests.
//!
//! Everything runs against the in-memory store, so no database is needed.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use grievance_service::{
    build_router,
    config::JwtConfig,
    models::{
        Complaint, ComplaintStatus, DomainEvent, EmployeeRequest, Notification, OutboxEvent,
        RequestStatus, Role, User,
    },
    services::{repository::*, InMemoryStore, JwtService, RepositoryError},
    utils::password::Argon2Hasher,
    ApiSettings, AppState,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_ADMIN_API_KEY: &str = "test-admin-key-12345";
pub const TEST_MAX_UPLOAD_BYTES: usize = 1024;

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_threshold_days(3)
    }

    pub fn with_threshold_days(days: i64) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let jwt = JwtService::new(&JwtConfig {
            secret: "integration-test-secret-that-is-long-enough".to_string(),
            expiry_minutes: 15,
        });
        let settings = ApiSettings {
            admin_api_key: TEST_ADMIN_API_KEY.to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
            swagger_enabled: false,
            escalation_threshold_days: days,
            notifier_batch_size: 100,
            notifier_max_attempts: 5,
        };
        let state = AppState::new(
            store.clone(),
            Arc::new(Argon2Hasher::insecure_fast()),
            jwt,
            settings,
        );
        Self { store, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Inserts a user straight into the store. The password hash is not usable for login.
    pub async fn seed_user(&self, role: Role) -> User {
        let email = format!("{}@example.test", Uuid::new_v4().simple());
        let user = User::new(email, Some("Test User".to_string()), String::new(), role);
        self.store.insert_user(&user).await.expect("insert user");
        user
    }

    pub async fn seed_user_with_token(&self, role: Role) -> (User, String) {
        let user = self.seed_user(role).await;
        let token = self.token_for(&user);
        (user, token)
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state
            .auth
            .jwt()
            .generate_access_token(user)
            .expect("token")
    }

    pub async fn seed_complaint(&self, citizen_id: Uuid) -> Complaint {
        let complaint = Complaint::new(
            citizen_id,
            "Broken streetlight".to_string(),
            "Out for a week".to_string(),
            None,
        );
        self.store
            .insert_complaint(&complaint)
            .await
            .expect("insert complaint");
        complaint
    }

    pub async fn complaint(&self, id: Uuid) -> Complaint {
        self.store
            .find_complaint_by_id(id)
            .await
            .expect("lookup")
            .expect("complaint exists")
    }

    /// Outbox events addressed to `user_id`.
    pub fn events_for(&self, user_id: Uuid) -> usize {
        self.store
            .outbox_events()
            .iter()
            .filter(|e| e.event.recipient() == user_id)
            .count()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }
}

/// Builds a `multipart/form-data` body. Fields with a file name are sent as file parts.
pub fn multipart_body(boundary: &str, fields: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in fields {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

/// Wraps the in-memory store and fails chosen writes with `Unavailable`.
pub struct FlakyStore {
    pub inner: Arc<InMemoryStore>,
    failing_events: Mutex<HashSet<Uuid>>,
    failing_complaints: Mutex<HashSet<Uuid>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            failing_events: Mutex::new(HashSet::new()),
            failing_complaints: Mutex::new(HashSet::new()),
        }
    }

    /// Makes notification delivery for `event_id` fail until [`heal_event`](Self::heal_event).
    pub fn fail_event(&self, event_id: Uuid) {
        self.failing_events.lock().unwrap().insert(event_id);
    }

    pub fn heal_event(&self, event_id: Uuid) {
        self.failing_events.lock().unwrap().remove(&event_id);
    }

    pub fn fail_complaint(&self, complaint_id: Uuid) {
        self.failing_complaints.lock().unwrap().insert(complaint_id);
    }

    fn unavailable() -> RepositoryError {
        RepositoryError::Unavailable("injected failure".to_string())
    }
}

#[async_trait]
impl UserRepository for FlakyStore {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
        self.inner.insert_user(user).await
    }
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        self.inner.find_user_by_id(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.inner.find_user_by_email(email).await
    }
    async fn find_first_user_by_role(&self, role: Role) -> Result<Option<User>, RepositoryError> {
        self.inner.find_first_user_by_role(role).await
    }
    async fn find_users_by_roles(&self, roles: &[Role]) -> Result<Vec<User>, RepositoryError> {
        self.inner.find_users_by_roles(roles).await
    }
}

#[async_trait]
impl ComplaintRepository for FlakyStore {
    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), RepositoryError> {
        self.inner.insert_complaint(complaint).await
    }
    async fn find_complaint_by_id(&self, id: Uuid) -> Result<Option<Complaint>, RepositoryError> {
        self.inner.find_complaint_by_id(id).await
    }
    async fn find_complaints_by_citizen(
        &self,
        citizen_id: Uuid,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        self.inner.find_complaints_by_citizen(citizen_id).await
    }
    async fn find_complaints_by_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        self.inner.find_complaints_by_employee(employee_id).await
    }
    async fn find_complaints_by_status(
        &self,
        status: ComplaintStatus,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        self.inner.find_complaints_by_status(status).await
    }
    async fn list_complaints(&self) -> Result<Vec<Complaint>, RepositoryError> {
        self.inner.list_complaints().await
    }
    async fn update_complaint(
        &self,
        complaint: &Complaint,
        events: &[DomainEvent],
    ) -> Result<Complaint, RepositoryError> {
        if self.failing_complaints.lock().unwrap().contains(&complaint.id) {
            return Err(Self::unavailable());
        }
        self.inner.update_complaint(complaint, events).await
    }
}

#[async_trait]
impl EmployeeRequestRepository for FlakyStore {
    async fn insert_request(&self, request: &EmployeeRequest) -> Result<(), RepositoryError> {
        self.inner.insert_request(request).await
    }
    async fn find_request_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<EmployeeRequest>, RepositoryError> {
        self.inner.find_request_by_id(id).await
    }
    async fn find_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<EmployeeRequest>, RepositoryError> {
        self.inner.find_requests_by_status(status).await
    }
    async fn find_request_by_user_and_status(
        &self,
        user_id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<EmployeeRequest>, RepositoryError> {
        self.inner
            .find_request_by_user_and_status(user_id, status)
            .await
    }
    async fn decide_request(
        &self,
        request: &EmployeeRequest,
        promoted_user: Option<&User>,
        events: &[DomainEvent],
    ) -> Result<(), RepositoryError> {
        self.inner
            .decide_request(request, promoted_user, events)
            .await
    }
}

#[async_trait]
impl NotificationRepository for FlakyStore {
    async fn insert_notification(
        &self,
        notification: &Notification,
    ) -> Result<bool, RepositoryError> {
        if self
            .failing_events
            .lock()
            .unwrap()
            .contains(&notification.source_event_id)
        {
            return Err(Self::unavailable());
        }
        self.inner.insert_notification(notification).await
    }
    async fn find_notifications_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.find_notifications_by_user(user_id).await
    }
    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        self.inner.mark_notification_read(id, user_id).await
    }
}

#[async_trait]
impl OutboxRepository for FlakyStore {
    async fn pending_events(
        &self,
        limit: i64,
        max_attempts: i32,
    ) -> Result<Vec<OutboxEvent>, RepositoryError> {
        self.inner.pending_events(limit, max_attempts).await
    }
    async fn record_delivery_failure(
        &self,
        event_id: Uuid,
        error: &str,
    ) -> Result<(), RepositoryError> {
        self.inner.record_delivery_failure(event_id, error).await
    }
}

#[async_trait]
impl Repositories for FlakyStore {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.inner.health_check().await
    }
}
