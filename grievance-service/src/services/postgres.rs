//! PostgreSQL implementation of the repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::error::RepositoryError;
use super::repository::{
    ComplaintRepository, EmployeeRequestRepository, NotificationRepository, OutboxRepository,
    Repositories, UserRepository,
};
use crate::models::{
    Attachment, Complaint, ComplaintStatus, DomainEvent, EmployeeRequest, Notification,
    OutboxEvent, RequestStatus, Role, User,
};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn append_events(
        tx: &mut Transaction<'_, Postgres>,
        events: &[DomainEvent],
    ) -> Result<(), RepositoryError> {
        for event in events {
            let record = OutboxEvent::new(event.clone());
            sqlx::query(
                r#"
                INSERT INTO outbox_events (event_id, event_type, payload, created_utc, attempts)
                VALUES ($1, $2, $3, $4, 0)
                "#,
            )
            .bind(record.id)
            .bind(event.event_type())
            .bind(sqlx::types::Json(event))
            .bind(record.created_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

// ==================== Row mapping ====================

fn parse_code<T>(value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(RepositoryError::Corrupt)
}

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    display_name: Option<String>,
    password_hash: String,
    role_code: String,
    created_utc: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.user_id,
            email: row.email,
            name: row.display_name,
            password_hash: row.password_hash,
            role: parse_code(&row.role_code)?,
            created_at: row.created_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct ComplaintRow {
    complaint_id: Uuid,
    citizen_id: Uuid,
    employee_id: Option<Uuid>,
    title: String,
    description: String,
    status_code: String,
    notes: Option<String>,
    file_name: Option<String>,
    file_size: Option<i64>,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
    assigned_utc: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<ComplaintRow> for Complaint {
    type Error = RepositoryError;

    fn try_from(row: ComplaintRow) -> Result<Self, Self::Error> {
        let attachment = match (row.file_name, row.file_size) {
            (Some(file_name), Some(file_size)) => Some(Attachment {
                file_name,
                file_size,
            }),
            _ => None,
        };
        Ok(Complaint {
            id: row.complaint_id,
            citizen_id: row.citizen_id,
            employee_id: row.employee_id,
            title: row.title,
            description: row.description,
            status: parse_code(&row.status_code)?,
            notes: row.notes,
            attachment,
            created_at: row.created_utc,
            updated_at: row.updated_utc,
            assigned_at: row.assigned_utc,
            version: row.version,
        })
    }
}

#[derive(Debug, FromRow)]
struct EmployeeRequestRow {
    request_id: Uuid,
    user_id: Uuid,
    requested_role: String,
    level: String,
    reason: Option<String>,
    status_code: String,
    created_utc: DateTime<Utc>,
    decided_utc: Option<DateTime<Utc>>,
}

impl TryFrom<EmployeeRequestRow> for EmployeeRequest {
    type Error = RepositoryError;

    fn try_from(row: EmployeeRequestRow) -> Result<Self, Self::Error> {
        Ok(EmployeeRequest {
            id: row.request_id,
            user_id: row.user_id,
            requested_role: parse_code(&row.requested_role)?,
            level: row.level,
            reason: row.reason,
            status: parse_code(&row.status_code)?,
            created_at: row.created_utc,
            decided_at: row.decided_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    notification_id: Uuid,
    user_id: Uuid,
    message: String,
    is_read: bool,
    created_utc: DateTime<Utc>,
    source_event_id: Uuid,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.notification_id,
            user_id: row.user_id,
            message: row.message,
            read: row.is_read,
            created_at: row.created_utc,
            source_event_id: row.source_event_id,
        }
    }
}

#[derive(Debug, FromRow)]
struct OutboxRow {
    event_id: Uuid,
    payload: sqlx::types::Json<DomainEvent>,
    created_utc: DateTime<Utc>,
    dispatched_utc: Option<DateTime<Utc>>,
    attempts: i32,
    last_error: Option<String>,
}

impl From<OutboxRow> for OutboxEvent {
    fn from(row: OutboxRow) -> Self {
        OutboxEvent {
            id: row.event_id,
            event: row.payload.0,
            created_at: row.created_utc,
            dispatched_at: row.dispatched_utc,
            attempts: row.attempts,
            last_error: row.last_error,
        }
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const COMPLAINT_COLUMNS: &str = "complaint_id, citizen_id, employee_id, title, description, \
    status_code, notes, file_name, file_size, created_utc, updated_utc, assigned_utc, version";

// ==================== User Operations ====================

#[async_trait]
impl UserRepository for Database {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, display_name, password_hash, role_code, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "User with this email"))?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE user_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_first_user_by_role(&self, role: Role) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE role_code = $1 ORDER BY created_utc ASC, user_id ASC LIMIT 1",
        )
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_users_by_roles(&self, roles: &[Role]) -> Result<Vec<User>, RepositoryError> {
        let codes: Vec<&str> = roles.iter().map(Role::as_str).collect();
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE role_code = ANY($1) ORDER BY created_utc ASC",
        )
        .bind(&codes)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }
}

// ==================== Complaint Operations ====================

#[async_trait]
impl ComplaintRepository for Database {
    async fn insert_complaint(&self, complaint: &Complaint) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO complaints (complaint_id, citizen_id, employee_id, title, description,
                status_code, notes, file_name, file_size, created_utc, updated_utc, assigned_utc, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(complaint.id)
        .bind(complaint.citizen_id)
        .bind(complaint.employee_id)
        .bind(&complaint.title)
        .bind(&complaint.description)
        .bind(complaint.status.as_str())
        .bind(&complaint.notes)
        .bind(complaint.attachment.as_ref().map(|a| a.file_name.clone()))
        .bind(complaint.attachment.as_ref().map(|a| a.file_size))
        .bind(complaint.created_at)
        .bind(complaint.updated_at)
        .bind(complaint.assigned_at)
        .bind(complaint.version)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_complaint_by_id(&self, id: Uuid) -> Result<Option<Complaint>, RepositoryError> {
        sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {} FROM complaints WHERE complaint_id = $1",
            COMPLAINT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Complaint::try_from)
        .transpose()
    }

    async fn find_complaints_by_citizen(
        &self,
        citizen_id: Uuid,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {} FROM complaints WHERE citizen_id = $1 ORDER BY created_utc DESC",
            COMPLAINT_COLUMNS
        ))
        .bind(citizen_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn find_complaints_by_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {} FROM complaints WHERE employee_id = $1 ORDER BY created_utc DESC",
            COMPLAINT_COLUMNS
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn find_complaints_by_status(
        &self,
        status: ComplaintStatus,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {} FROM complaints WHERE status_code = $1 ORDER BY created_utc DESC",
            COMPLAINT_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn list_complaints(&self) -> Result<Vec<Complaint>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {} FROM complaints ORDER BY created_utc DESC",
            COMPLAINT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn update_complaint(
        &self,
        complaint: &Complaint,
        events: &[DomainEvent],
    ) -> Result<Complaint, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ComplaintRow>(&format!(
            r#"
            UPDATE complaints
            SET employee_id = $3, status_code = $4, notes = $5, updated_utc = $6,
                assigned_utc = $7, version = version + 1
            WHERE complaint_id = $1 AND version = $2
            RETURNING {}
            "#,
            COMPLAINT_COLUMNS
        ))
        .bind(complaint.id)
        .bind(complaint.version)
        .bind(complaint.employee_id)
        .bind(complaint.status.as_str())
        .bind(&complaint.notes)
        .bind(complaint.updated_at)
        .bind(complaint.assigned_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::VersionConflict)?;

        Self::append_events(&mut tx, events).await?;
        tx.commit().await?;

        Complaint::try_from(row)
    }
}

// ==================== Employee Request Operations ====================

#[async_trait]
impl EmployeeRequestRepository for Database {
    async fn insert_request(&self, request: &EmployeeRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO employee_requests (request_id, user_id, requested_role, level, reason,
                status_code, created_utc, decided_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(request.id)
        .bind(request.user_id)
        .bind(request.requested_role.as_str())
        .bind(&request.level)
        .bind(&request.reason)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.decided_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "Pending request"))?;
        Ok(())
    }

    async fn find_request_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<EmployeeRequest>, RepositoryError> {
        sqlx::query_as::<_, EmployeeRequestRow>(
            "SELECT * FROM employee_requests WHERE request_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(EmployeeRequest::try_from)
        .transpose()
    }

    async fn find_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<EmployeeRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, EmployeeRequestRow>(
            "SELECT * FROM employee_requests WHERE status_code = $1 ORDER BY created_utc ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn find_request_by_user_and_status(
        &self,
        user_id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<EmployeeRequest>, RepositoryError> {
        sqlx::query_as::<_, EmployeeRequestRow>(
            r#"
            SELECT * FROM employee_requests
            WHERE user_id = $1 AND status_code = $2
            ORDER BY created_utc ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(EmployeeRequest::try_from)
        .transpose()
    }

    async fn decide_request(
        &self,
        request: &EmployeeRequest,
        promoted_user: Option<&User>,
        events: &[DomainEvent],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let decided = sqlx::query(
            r#"
            UPDATE employee_requests
            SET status_code = $2, decided_utc = $3
            WHERE request_id = $1 AND status_code = 'PENDING'
            "#,
        )
        .bind(request.id)
        .bind(request.status.as_str())
        .bind(request.decided_at)
        .execute(&mut *tx)
        .await?;

        if decided.rows_affected() == 0 {
            return Err(RepositoryError::AlreadyDecided);
        }

        if let Some(user) = promoted_user {
            sqlx::query("UPDATE users SET role_code = $2 WHERE user_id = $1")
                .bind(user.id)
                .bind(user.role.as_str())
                .execute(&mut *tx)
                .await?;
        }

        Self::append_events(&mut tx, events).await?;
        tx.commit().await?;
        Ok(())
    }
}

// ==================== Notification Operations ====================

#[async_trait]
impl NotificationRepository for Database {
    async fn insert_notification(
        &self,
        notification: &Notification,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Claiming the event first serialises concurrent dispatchers on its row.
        let claimed = sqlx::query(
            r#"
            UPDATE outbox_events
            SET dispatched_utc = $2
            WHERE event_id = $1 AND dispatched_utc IS NULL
            "#,
        )
        .bind(notification.source_event_id)
        .bind(notification.created_at)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO notifications (notification_id, user_id, message, is_read, created_utc, source_event_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_event_id) DO NOTHING
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.created_at)
        .bind(notification.source_event_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn find_notifications_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_utc DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Outbox Operations ====================

#[async_trait]
impl OutboxRepository for Database {
    async fn pending_events(
        &self,
        limit: i64,
        max_attempts: i32,
    ) -> Result<Vec<OutboxEvent>, RepositoryError> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT event_id, payload, created_utc, dispatched_utc, attempts, last_error
            FROM outbox_events
            WHERE dispatched_utc IS NULL AND attempts < $2
            ORDER BY attempts ASC, created_utc ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OutboxEvent::from).collect())
    }

    async fn record_delivery_failure(
        &self,
        event_id: Uuid,
        error: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE outbox_events SET attempts = attempts + 1, last_error = $2 WHERE event_id = $1",
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Repositories for Database {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            RepositoryError::Database(e)
        })?;
        Ok(())
    }
}
