//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - token signing secret (min 32 bytes)
//!
//! ## Optional
//! - `HOST` - bind address (default: 0.0.0.0)
//! - `PORT` - listen port (default: 8080)
//! - `TOKEN_TTL_HOURS` - admin session lifetime (default: 3)
//! - `TRACKING_PREFIX` - tracking number prefix (default: AYOSI)
//! - `MEDIA_ROOT` - upload directory (default: ./uploads)
//! - `MEDIA_BASE_URL` - public URL of `MEDIA_ROOT` (default: http://localhost:8080/uploads)
//! - `SERVE_MEDIA` - serve `MEDIA_ROOT` at the path of `MEDIA_BASE_URL` (default: true)
//! - `APP_ENV` - `production` hides internal error details (default: development)
//! - `ORDER_STATUS_POLICY` - `permissive` or `forward` (default: permissive)
//! - `ALLOW_REGISTRATION` - keep admin registration open (default: false)

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::order::StatusPolicy;
use crate::domain::parse::bool_from_str;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub tracking_prefix: String,
    pub media_root: PathBuf,
    pub media_base_url: String,
    /// URL path `MEDIA_ROOT` is served at; `None` when another server does it.
    pub media_mount: Option<String>,
    pub production: bool,
    pub status_policy: StatusPolicy,
    pub allow_registration: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("tracking_prefix", &self.tracking_prefix)
            .field("media_root", &self.media_root)
            .field("media_base_url", &self.media_base_url)
            .field("media_mount", &self.media_mount)
            .field("production", &self.production)
            .field("status_policy", &self.status_policy)
            .field("allow_registration", &self.allow_registration)
            .finish()
    }
}

impl AppConfig {
    /// Loads configuration from the process environment, after `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let jwt_secret = env.required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InsecureSecret(
                "JWT_SECRET".to_string(),
                format!("must be at least {MIN_JWT_SECRET_LENGTH} bytes"),
            ));
        }

        let token_ttl_hours: i64 = env.parsed("TOKEN_TTL_HOURS", "3")?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "TOKEN_TTL_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let tracking_prefix = env.or_default("TRACKING_PREFIX", "AYOSI");
        if tracking_prefix.is_empty() || !tracking_prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ConfigError::InvalidEnvVar(
                "TRACKING_PREFIX".to_string(),
                "must be uppercase letters".to_string(),
            ));
        }

        let status_policy = env
            .or_default("ORDER_STATUS_POLICY", "permissive")
            .parse::<StatusPolicy>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ORDER_STATUS_POLICY".to_string(), e.to_string())
            })?;
        let allow_registration = bool_from_str(
            "ALLOW_REGISTRATION",
            &env.or_default("ALLOW_REGISTRATION", "false"),
        )
        .map_err(|e| ConfigError::InvalidEnvVar("ALLOW_REGISTRATION".to_string(), e.to_string()))?;

        let media_base_url = env.or_default("MEDIA_BASE_URL", "http://localhost:8080/uploads");
        let serve_media = bool_from_str("SERVE_MEDIA", &env.or_default("SERVE_MEDIA", "true"))
            .map_err(|e| ConfigError::InvalidEnvVar("SERVE_MEDIA".to_string(), e.to_string()))?;
        let media_mount = if serve_media {
            let path = url_path(&media_base_url);
            if path.is_empty() {
                return Err(ConfigError::InvalidEnvVar(
                    "MEDIA_BASE_URL".to_string(),
                    "needs a path such as /uploads when SERVE_MEDIA is on".to_string(),
                ));
            }
            Some(path.to_string())
        } else {
            None
        };

        Ok(Self {
            database_url: env.required("DATABASE_URL")?,
            host: env.or_default("HOST", "0.0.0.0"),
            port: env.parsed("PORT", "8080")?,
            jwt_secret,
            token_ttl_hours,
            tracking_prefix,
            media_root: PathBuf::from(env.or_default("MEDIA_ROOT", "./uploads")),
            media_base_url,
            media_mount,
            production: env.or_default("APP_ENV", "development").eq_ignore_ascii_case("production"),
            status_policy,
            allow_registration,
        })
    }
}

/// Path component of a URL without its trailing slash; a bare path is returned as is.
fn url_path(url: &str) -> &str {
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => url,
    };
    path.trim_end_matches('/')
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}
