//! Chat preset repository.

use async_trait::async_trait;

use bazaar_core::ChatPresetId;

use super::RepositoryError;
use crate::models::{ChatPreset, NewChatPreset};

/// Storage operations on chat presets. Callers pass validated input.
#[async_trait]
pub trait ChatPresetRepository: Send + Sync {
    /// List all presets ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn list_presets(&self) -> Result<Vec<ChatPreset>, RepositoryError>;

    /// Insert a preset.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    async fn create_preset(&self, preset: &NewChatPreset) -> Result<ChatPreset, RepositoryError>;

    /// Replace a preset's content. Returns `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    async fn update_preset(
        &self,
        id: ChatPresetId,
        preset: &NewChatPreset,
    ) -> Result<Option<ChatPreset>, RepositoryError>;

    /// Delete a preset. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    async fn delete_preset(&self, id: ChatPresetId) -> Result<bool, RepositoryError>;
}
