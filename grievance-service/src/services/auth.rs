use std::sync::Arc;
use uuid::Uuid;

use super::error::{RepositoryError, ServiceError};
use super::jwt::JwtService;
use super::repository::{Repositories, UserRepository};
use crate::models::{Role, User};
use crate::utils::password::{Password, PasswordHashString, PasswordHashing};

/// Account creation, credential checks and token issuance.
#[derive(Clone)]
pub struct AuthService {
    repos: Arc<dyn Repositories>,
    hasher: Arc<dyn PasswordHashing>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(
        repos: Arc<dyn Repositories>,
        hasher: Arc<dyn PasswordHashing>,
        jwt: JwtService,
    ) -> Self {
        Self { repos, hasher, jwt }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub async fn signup(
        &self,
        email: &str,
        password: Password,
        name: Option<String>,
    ) -> Result<User, ServiceError> {
        self.create_account(email, password, name, Role::User).await
    }

    pub async fn create_admin(
        &self,
        email: &str,
        password: Password,
        name: Option<String>,
    ) -> Result<User, ServiceError> {
        let admin = self.create_account(email, password, name, Role::Admin).await?;
        tracing::warn!(user_id = %admin.id, "Admin account created");
        Ok(admin)
    }

    async fn create_account(
        &self,
        email: &str,
        password: Password,
        name: Option<String>,
        role: Role,
    ) -> Result<User, ServiceError> {
        let email = email.trim().to_string();
        if self.repos.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let hash = self.hasher.hash_password(&password)?;
        let user = User::new(email, name, hash.into_string(), role);

        self.repos.insert_user(&user).await.map_err(|e| match e {
            RepositoryError::Duplicate(_) => ServiceError::EmailAlreadyRegistered,
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "Account created");
        Ok(user)
    }

    /// Returns the user and a fresh access token.
    pub async fn login(
        &self,
        email: &str,
        password: Password,
    ) -> Result<(User, String), ServiceError> {
        let Some(user) = self.repos.find_user_by_email(email.trim()).await? else {
            tracing::info!("Login failed: unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        let stored = PasswordHashString::new(user.password_hash.clone());
        if self.hasher.verify_password(&password, &stored).is_err() {
            tracing::info!(user_id = %user.id, "Login failed: wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.jwt.generate_access_token(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// Resolves a bearer token to the current user record.
    pub async fn authenticate(&self, token: &str) -> Result<User, ServiceError> {
        let claims = self
            .jwt
            .validate_access_token(token)
            .map_err(|_| ServiceError::InvalidToken)?;
        let user_id = claims.user_id().map_err(|_| ServiceError::InvalidToken)?;

        self.repos
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::InvalidToken)
    }

    /// The caller must be the user or an admin.
    pub async fn get_user(&self, id: Uuid, viewer: &User) -> Result<User, ServiceError> {
        if viewer.id != id && !viewer.is_admin() {
            return Err(ServiceError::Forbidden(
                "Cannot view another user's profile".to_string(),
            ));
        }
        self.repos
            .find_user_by_id(id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::memory::InMemoryStore;
    use crate::utils::password::Argon2Hasher;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(Argon2Hasher::insecure_fast()),
            JwtService::new(&JwtConfig {
                secret: "unit-test-secret-unit-test-secret".to_string(),
                expiry_minutes: 5,
            }),
        )
    }

    fn pw(s: &str) -> Password {
        Password::new(s.to_string())
    }

    #[tokio::test]
    async fn signup_then_login_round_trip() {
        let auth = service();
        let user = auth.signup("ann@x.test", pw("s3cret-pass"), None).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.password_hash.starts_with("$argon2id$"));

        let (logged_in, token) = auth.login("ANN@x.test", pw("s3cret-pass")).await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(auth.authenticate(&token).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let auth = service();
        auth.signup("ann@x.test", pw("s3cret-pass"), None).await.unwrap();

        let wrong = auth.login("ann@x.test", pw("nope-nope")).await.unwrap_err();
        let unknown = auth.login("bob@x.test", pw("s3cret-pass")).await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, ServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let auth = service();
        auth.signup("ann@x.test", pw("s3cret-pass"), None).await.unwrap();
        let err = auth.signup("Ann@X.test", pw("other-pass"), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmailAlreadyRegistered));
    }

    #[tokio::test]
    async fn users_cannot_read_each_other() {
        let auth = service();
        let ann = auth.signup("ann@x.test", pw("s3cret-pass"), None).await.unwrap();
        let bob = auth.signup("bob@x.test", pw("s3cret-pass"), None).await.unwrap();
        let admin = auth.create_admin("root@x.test", pw("s3cret-pass"), None).await.unwrap();

        assert!(matches!(
            auth.get_user(ann.id, &bob).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert_eq!(auth.get_user(ann.id, &ann).await.unwrap().id, ann.id);
        assert_eq!(auth.get_user(ann.id, &admin).await.unwrap().id, ann.id);
    }
}
