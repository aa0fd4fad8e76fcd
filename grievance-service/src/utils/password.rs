use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Newtype for password hash
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hashes and verifies account passwords.
pub trait PasswordHashing: Send + Sync {
    fn hash_password(&self, password: &Password) -> Result<PasswordHashString, anyhow::Error>;

    /// Returns Ok(()) if the password matches.
    fn verify_password(
        &self,
        password: &Password,
        password_hash: &PasswordHashString,
    ) -> Result<(), anyhow::Error>;
}

/// Argon2id with a random salt embedded in the PHC string.
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Minimal cost parameters, for tests only.
    pub fn insecure_fast() -> Self {
        let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None)
            .unwrap_or_default();
        Self::new(params)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl PasswordHashing for Argon2Hasher {
    fn hash_password(&self, password: &Password) -> Result<PasswordHashString, anyhow::Error> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_str().as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        Ok(PasswordHashString::new(password_hash))
    }

    fn verify_password(
        &self,
        password: &Password,
        password_hash: &PasswordHashString,
    ) -> Result<(), anyhow::Error> {
        let parsed_hash = PasswordHash::new(password_hash.as_str())
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

        // Cost parameters come from the PHC string, so hashes made with other params still verify.
        self.argon2()
            .verify_password(password.as_str().as_bytes(), &parsed_hash)
            .map_err(|_| anyhow::anyhow!("Password verification failed"))
    }
}
