pub mod complaint;
pub mod employee_request;
pub mod events;
pub mod notification;
pub mod user;

pub use complaint::{Attachment, Complaint, ComplaintStatus, TransitionKind};
pub use employee_request::{EmployeeRequest, RequestStatus};
pub use events::{DomainEvent, OutboxEvent};
pub use notification::Notification;
pub use user::{Role, User, UserResponse};
