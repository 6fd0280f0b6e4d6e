//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`;
//!   not needed when `BAZAAR_IN_MEMORY=true`)
//! - `BAZAAR_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `BAZAAR_ADMIN_EMAIL` - Admin panel login email
//! - `BAZAAR_ADMIN_PASSWORD` - Admin panel login password
//!
//! ## Optional
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 4000)
//! - `BAZAAR_SESSION_TTL_HOURS` - Session and admin token lifetime (default: 168)
//! - `BAZAAR_CORS_ORIGIN` - Allowed browser origin (default: any)
//! - `BAZAAR_RATE_LIMIT` - Per-IP rate limiting on auth routes (default: true)
//! - `BAZAAR_IN_MEMORY` - Use the process-local store instead of `PostgreSQL`
//! - `SMTP_HOST`, `SMTP_PORT` (default 587), `SMTP_USERNAME`, `SMTP_PASSWORD`,
//!   `SMTP_FROM` - Outgoing mail; all or none. Without them codes are logged.
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use bazaar_core::Email;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where accounts, pending registrations and presets live.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// `PostgreSQL` at the given URL (contains password).
    Postgres { database_url: SecretString },
    /// Process-local maps; lost on restart.
    InMemory,
}

/// The single admin account, configured out of band.
#[derive(Clone)]
pub struct AdminCredentials {
    pub email: Email,
    pub password: SecretString,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the SMTP password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Storage backend
    pub storage: StorageConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing secret
    pub jwt_secret: SecretString,
    /// Session and admin token lifetime in hours
    pub session_ttl_hours: i64,
    /// Admin panel credentials
    pub admin: AdminCredentials,
    /// Allowed CORS origin (`None` = any origin)
    pub cors_origin: Option<String>,
    /// Whether per-IP rate limiting is applied to auth routes
    pub rate_limit: bool,
    /// Outgoing mail; `None` logs codes instead of sending them
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let in_memory = parse_bool(
            "BAZAAR_IN_MEMORY",
            get_optional_env("BAZAAR_IN_MEMORY").as_deref(),
            false,
        )?;
        let storage = if in_memory {
            StorageConfig::InMemory
        } else {
            StorageConfig::Postgres {
                database_url: get_database_url("BAZAAR_DATABASE_URL")?,
            }
        };

        let host = get_env_or_default("BAZAAR_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BAZAAR_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BAZAAR_PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BAZAAR_PORT".to_string(), e.to_string()))?;

        let jwt_secret = get_validated_secret("BAZAAR_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "BAZAAR_JWT_SECRET")?;

        let session_ttl_hours = parse_session_ttl(get_optional_env("BAZAAR_SESSION_TTL_HOURS"))?;

        let admin_email = get_required_env("BAZAAR_ADMIN_EMAIL")?;
        let admin = AdminCredentials {
            email: Email::normalize(&admin_email).map_err(|e| {
                ConfigError::InvalidEnvVar("BAZAAR_ADMIN_EMAIL".to_string(), e.to_string())
            })?,
            password: get_required_secret("BAZAAR_ADMIN_PASSWORD")?,
        };

        let rate_limit = parse_bool(
            "BAZAAR_RATE_LIMIT",
            get_optional_env("BAZAAR_RATE_LIMIT").as_deref(),
            true,
        )?;

        let email = parse_email_config(
            get_optional_env("SMTP_HOST"),
            get_optional_env("SMTP_PORT"),
            get_optional_env("SMTP_USERNAME"),
            get_optional_env("SMTP_PASSWORD"),
            get_optional_env("SMTP_FROM"),
        )?;

        Ok(Self {
            storage,
            host,
            port,
            jwt_secret,
            session_ttl_hours,
            admin,
            cors_origin: parse_cors_origin(get_optional_env("BAZAAR_CORS_ORIGIN"))?,
            rate_limit,
            email,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a boolean flag (`true/false/1/0/yes/no`), using `default` when unset.
fn parse_bool(key: &str, value: Option<&str>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Parse the session lifetime; must be a positive number of hours.
fn parse_session_ttl(value: Option<String>) -> Result<i64, ConfigError> {
    let Some(value) = value else {
        return Ok(DEFAULT_SESSION_TTL_HOURS);
    };
    match value.trim().parse::<i64>() {
        Ok(hours) if hours > 0 => Ok(hours),
        Ok(hours) => Err(ConfigError::InvalidEnvVar(
            "BAZAAR_SESSION_TTL_HOURS".to_string(),
            format!("must be positive (got {hours})"),
        )),
        Err(e) => Err(ConfigError::InvalidEnvVar(
            "BAZAAR_SESSION_TTL_HOURS".to_string(),
            e.to_string(),
        )),
    }
}

/// The CORS origin must be usable as a header value.
fn parse_cors_origin(value: Option<String>) -> Result<Option<String>, ConfigError> {
    let Some(origin) = value else {
        return Ok(None);
    };
    let origin = origin.trim().trim_end_matches('/').to_string();
    axum::http::HeaderValue::from_str(&origin).map_err(|e| {
        ConfigError::InvalidEnvVar("BAZAAR_CORS_ORIGIN".to_string(), e.to_string())
    })?;
    Ok(Some(origin))
}

/// Build the SMTP configuration. Either every required field is set or none is.
fn parse_email_config(
    host: Option<String>,
    port: Option<String>,
    username: Option<String>,
    password: Option<String>,
    from: Option<String>,
) -> Result<Option<EmailConfig>, ConfigError> {
    match (host, username, password, from) {
        (None, None, None, None) => Ok(None),
        (Some(smtp_host), Some(smtp_username), Some(smtp_password), Some(from_address)) => {
            let smtp_port = port
                .as_deref()
                .unwrap_or("587")
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;
            Ok(Some(EmailConfig {
                smtp_host,
                smtp_port,
                smtp_username,
                smtp_password: SecretString::from(smtp_password),
                from_address,
            }))
        }
        (host, username, password, from) => {
            let missing = [
                ("SMTP_HOST", host.is_none()),
                ("SMTP_USERNAME", username.is_none()),
                ("SMTP_PASSWORD", password.is_none()),
                ("SMTP_FROM", from.is_none()),
            ]
            .into_iter()
            .find_map(|(key, missing)| missing.then_some(key))
            .unwrap_or("SMTP_HOST");
            Err(ConfigError::MissingEnvVar(missing.to_string()))
        }
    }
}

/// Validate that the signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
