pub mod auth;
pub mod complaints;
pub mod error;
pub mod escalation;
pub mod jwt;
pub mod lifecycle;
pub mod memory;
pub mod metrics;
pub mod notifications;
pub mod notifier;
pub mod postgres;
pub mod repository;
pub mod role_requests;

pub use auth::AuthService;
pub use complaints::ComplaintService;
pub use error::{RepositoryError, ServiceError};
pub use escalation::{EscalationSweep, SweepReport};
pub use jwt::JwtService;
pub use lifecycle::{Actor, ComplaintLifecycle};
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use notifications::NotificationService;
pub use notifier::{DispatchReport, NotificationDispatcher};
pub use postgres::Database;
pub use repository::Repositories;
pub use role_requests::RoleRequestService;
