//! Bazaar CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bazaar-cli migrate
//!
//! # Load chat presets from YAML, replacing existing ones
//! bazaar-cli presets seed --file crates/cli/data/chat_presets.yaml --clear
//!
//! # Delete expired pending registrations
//! bazaar-cli pending purge
//! ```
//!
//! # Environment Variables
//!
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage chat presets
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },
    /// Maintain pending registrations
    Pending {
        #[command(subcommand)]
        action: PendingAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// Insert presets from a YAML file
    Seed {
        /// Path to the YAML file (a list of question/responses/keywords)
        #[arg(short, long)]
        file: String,

        /// Delete all existing presets first
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum PendingAction {
    /// Delete pending registrations whose code has expired
    Purge,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Presets { action } => match action {
            PresetAction::Seed { file, clear } => commands::presets::seed(&file, clear).await?,
        },
        Commands::Pending { action } => match action {
            PendingAction::Purge => commands::pending::purge().await?,
        },
    }
    Ok(())
}
