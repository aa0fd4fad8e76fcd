use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct GrievanceConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub escalation: EscalationConfig,
    pub notifier: NotifierConfig,
    pub uploads: UploadConfig,
    pub swagger_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `None` only in dev, where the service falls back to the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub admin_api_key: String,
}

#[derive(Debug, Clone)]
pub struct EscalationConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub threshold_days: i64,
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub poll_interval_seconds: u64,
    pub batch_size: i64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_upload_bytes: usize,
}

impl GrievanceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => Some(url),
            Err(_) if is_prod => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "DATABASE_URL is required in production but not set"
                )))
            }
            Err(_) => None,
        };

        let otlp_endpoint = env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty());

        let config = GrievanceConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("grievance-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint,
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", Some("dev-only-jwt-secret-not-for-production"), is_prod)?,
                expiry_minutes: parse_env("JWT_EXPIRY_MINUTES", "60", is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                admin_api_key: get_env("ADMIN_API_KEY", None, true)?,
            },
            escalation: EscalationConfig {
                enabled: parse_env("ESCALATION_ENABLED", "true", is_prod)?,
                interval_seconds: parse_env("ESCALATION_INTERVAL_SECONDS", "86400", is_prod)?,
                threshold_days: parse_env("ESCALATION_THRESHOLD_DAYS", "7", is_prod)?,
            },
            notifier: NotifierConfig {
                poll_interval_seconds: parse_env("NOTIFIER_POLL_INTERVAL_SECONDS", "2", is_prod)?,
                batch_size: parse_env("NOTIFIER_BATCH_SIZE", "100", is_prod)?,
                max_attempts: parse_env("NOTIFIER_MAX_ATTEMPTS", "5", is_prod)?,
            },
            uploads: UploadConfig {
                max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", "20971520", is_prod)?,
            },
            swagger_enabled: parse_env("ENABLE_SWAGGER", if is_prod { "false" } else { "true" }, false)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_prod(&self) -> bool {
        self.environment == Environment::Prod
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.escalation.interval_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ESCALATION_INTERVAL_SECONDS must be positive"
            )));
        }

        if self.escalation.threshold_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ESCALATION_THRESHOLD_DAYS must be positive"
            )));
        }

        if chrono::Duration::try_days(self.escalation.threshold_days).is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ESCALATION_THRESHOLD_DAYS is out of range"
            )));
        }

        if self.notifier.poll_interval_seconds == 0
            || self.notifier.batch_size <= 0
            || self.notifier.max_attempts <= 0
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "NOTIFIER_POLL_INTERVAL_SECONDS, NOTIFIER_BATCH_SIZE and NOTIFIER_MAX_ATTEMPTS must be positive"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.jwt.secret.len() < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_SECRET must be at least 32 bytes in production"
                )));
            }

            if self.swagger_enabled {
                tracing::warn!("Swagger UI is enabled in production");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
