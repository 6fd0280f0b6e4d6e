//! Persistence for accounts, pending registrations and chat presets.
//!
//! # Database: `bazaar` schema
//!
//! ## Tables
//!
//! - `account` - Verified accounts (credentials, contact details, devices,
//!   one-time login token)
//! - `pending_registration` - Signups awaiting code confirmation
//! - `chat_preset` - Canned chat answers managed by the admin panel
//!
//! # Backends
//!
//! Every repository trait has two implementations:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx (production)
//! - [`MemoryStore`] - process-local maps (tests, `BAZAAR_IN_MEMORY=true`)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod accounts;
pub mod chat_presets;
pub mod memory;
pub mod pending;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use accounts::AccountRepository;
pub use chat_presets::ChatPresetRepository;
pub use memory::MemoryStore;
pub use pending::PendingRegistrationRepository;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to `Conflict`, everything else to `Database`.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Everything the HTTP layer needs from storage.
///
/// Handlers hold a single `Arc<dyn Store>` so the backend is chosen once at
/// startup.
#[async_trait]
pub trait Store:
    AccountRepository + PendingRegistrationRepository + ChatPresetRepository + Send + Sync
{
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
