//! Subcommand implementations.

pub mod migrate;
pub mod pending;
pub mod presets;

use bazaar_server::config::{self, ConfigError};
use bazaar_server::db::{self, PgStore, RepositoryError};
use bazaar_server::services::chat_presets::PresetError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    #[error("Preset {index} is invalid: {source}")]
    InvalidPreset { index: usize, source: PresetError },
}

/// Connect to the database named by `BAZAAR_DATABASE_URL` / `DATABASE_URL`.
async fn connect() -> Result<PgStore, CliError> {
    dotenvy::dotenv().ok();
    let database_url = config::get_database_url("BAZAAR_DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;
    Ok(PgStore::new(pool))
}
