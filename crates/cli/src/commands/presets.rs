//! Chat preset seeding.
//!
//! # File Format
//!
//! ```yaml
//! - question: Where is my order?
//!   responses:
//!     - You can track your order from the Orders page.
//!   keywords: [order, track, shipping]
//! ```

use std::path::Path;

use tracing::{error, info};

use bazaar_server::db::Store;
use bazaar_server::models::NewChatPreset;
use bazaar_server::services::chat_presets::{ChatPresetService, normalize};

use super::{CliError, connect};

/// Outcome of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub removed: usize,
    pub inserted: usize,
}

/// Parse and validate a preset file. Nothing is written if any entry is invalid.
fn parse(content: &str) -> Result<Vec<NewChatPreset>, CliError> {
    let presets: Vec<NewChatPreset> = serde_yaml::from_str(content)?;
    presets
        .into_iter()
        .enumerate()
        .map(|(index, preset)| {
            normalize(preset).map_err(|source| CliError::InvalidPreset { index, source })
        })
        .collect()
}

/// Write `presets` to `store`, optionally deleting existing ones first.
async fn seed_into(
    store: &dyn Store,
    presets: Vec<NewChatPreset>,
    clear: bool,
) -> Result<SeedSummary, CliError> {
    let service = ChatPresetService::new(store);
    let mut summary = SeedSummary::default();

    if clear {
        for preset in service.list().await? {
            service.delete(preset.id).await?;
            summary.removed += 1;
        }
    }

    for preset in presets {
        service.create(preset).await?;
        summary.inserted += 1;
    }

    Ok(summary)
}

/// Seed chat presets from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `clear` - If true, delete every existing preset first
///
/// # Errors
///
/// Returns `CliError` if the file cannot be read or validated, or if database
/// operations fail.
pub async fn seed(file_path: &str, clear: bool) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading chat presets from file");

    // Read and validate before connecting to the database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let presets = parse(&content).inspect_err(|e| error!("{e}"))?;
    info!(presets = presets.len(), "Parsed configuration");

    let store = connect().await?;
    let summary = seed_into(&store, presets, clear).await?;

    info!(
        removed = summary.removed,
        inserted = summary.inserted,
        "Seeding complete!"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_server::db::{ChatPresetRepository, MemoryStore};

    const SAMPLE: &str = r"
- question: Where is my order?
  responses:
    - You can track it from the Orders page.
  keywords: [Order, ' track ']
- question: Do you ship abroad?
  responses: ['Yes, to most countries.']
  keywords: [shipping]
";

    #[test]
    fn test_parse_normalizes() {
        let presets = parse(SAMPLE).unwrap();
        assert_eq!(presets.len(), 2);
        assert_eq!(presets[0].keywords, vec!["order", "track"]);
    }

    #[test]
    fn test_parse_rejects_invalid_entry() {
        let yaml = "- question: ''\n  responses: [hi]\n  keywords: [hi]\n";
        let err = parse(yaml).unwrap_err();
        assert!(matches!(err, CliError::InvalidPreset { index: 0, .. }));
    }

    #[test]
    fn test_parse_rejects_bad_yaml() {
        assert!(matches!(parse("question: [").unwrap_err(), CliError::Yaml(_)));
    }

    #[tokio::test]
    async fn test_seed_with_clear_replaces_existing() {
        let store = MemoryStore::new();
        seed_into(&store, parse(SAMPLE).unwrap(), false).await.unwrap();

        let summary = seed_into(&store, parse(SAMPLE).unwrap(), true).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                removed: 2,
                inserted: 2
            }
        );
        assert_eq!(store.list_presets().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seed_without_clear_appends() {
        let store = MemoryStore::new();
        seed_into(&store, parse(SAMPLE).unwrap(), false).await.unwrap();
        seed_into(&store, parse(SAMPLE).unwrap(), false).await.unwrap();
        assert_eq!(store.list_presets().await.unwrap().len(), 4);
    }
}
