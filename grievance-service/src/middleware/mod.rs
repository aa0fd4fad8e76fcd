pub mod admin;
pub mod auth;

pub use admin::admin_api_key_middleware;
pub use auth::{auth_middleware, require_admin, require_staff, AuthUser};
