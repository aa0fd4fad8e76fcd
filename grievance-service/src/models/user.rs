//! User accounts and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role codes, stored as upper-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Employee,
    Manager,
    SeniorManager,
    Admin,
}

impl Role {
    /// Roles that can be handed complaints.
    pub const STAFF: [Role; 3] = [Role::Employee, Role::Manager, Role::SeniorManager];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Employee => "EMPLOYEE",
            Role::Manager => "MANAGER",
            Role::SeniorManager => "SENIOR_MANAGER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn is_staff(&self) -> bool {
        Self::STAFF.contains(self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "EMPLOYEE" => Ok(Role::Employee),
            "MANAGER" => Ok(Role::Manager),
            "SENIOR_MANAGER" => Ok(Role::SeniorManager),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// User entity. `password_hash` is an Argon2 PHC string and never leaves the service.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: Option<String>, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            role,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Convert to sanitized response (no sensitive fields).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_code() {
        for role in [Role::User, Role::Employee, Role::Manager, Role::SeniorManager, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!("senior_manager".parse::<Role>(), Ok(Role::SeniorManager));
        assert!("JANITOR".parse::<Role>().is_err());
    }

    #[test]
    fn only_employee_tiers_are_staff() {
        assert!(Role::Employee.is_staff());
        assert!(Role::Manager.is_staff());
        assert!(Role::SeniorManager.is_staff());
        assert!(!Role::User.is_staff());
        assert!(!Role::Admin.is_staff());
    }

    #[test]
    fn sanitized_view_drops_password_hash() {
        let user = User::new("a@b.test".into(), None, "$argon2id$secret".into(), Role::User);
        let json = serde_json::to_string(&user.sanitized()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"USER\""));
    }
}
