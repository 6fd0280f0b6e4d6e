//! Chat preset management and keyword replies.

use rand::seq::IndexedRandom;
use thiserror::Error;

use bazaar_core::ChatPresetId;

use crate::db::{RepositoryError, Store};
use crate::models::{ChatPreset, NewChatPreset};

/// Sent when no preset keyword matches.
pub const FALLBACK_REPLY: &str =
    "Sorry, I don't have an answer for that yet. Our team will get back to you soon.";

/// Errors from preset operations.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("at least one non-empty response is required")]
    NoResponses,

    #[error("at least one non-empty keyword is required")]
    NoKeywords,

    #[error("preset not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl PresetError {
    /// Message shown to the client for a rejection, `None` for faults.
    #[must_use]
    pub const fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::EmptyQuestion => Some("Question cannot be empty"),
            Self::NoResponses => Some("At least one response is required"),
            Self::NoKeywords => Some("At least one keyword is required"),
            Self::NotFound => Some("Preset not found"),
            Self::Repository(_) => None,
        }
    }
}

/// Answer to a customer chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Preset that produced the reply, if any matched.
    pub preset_id: Option<ChatPresetId>,
}

/// Trim the question and responses; trim, lowercase and dedupe keywords.
///
/// # Errors
///
/// Returns a `PresetError` if any of the three parts ends up empty.
pub fn normalize(input: NewChatPreset) -> Result<NewChatPreset, PresetError> {
    let question = input.question.trim().to_owned();
    if question.is_empty() {
        return Err(PresetError::EmptyQuestion);
    }

    let responses: Vec<String> = input
        .responses
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(str::to_owned)
        .collect();
    if responses.is_empty() {
        return Err(PresetError::NoResponses);
    }

    let mut keywords: Vec<String> = Vec::with_capacity(input.keywords.len());
    for keyword in &input.keywords {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    if keywords.is_empty() {
        return Err(PresetError::NoKeywords);
    }

    Ok(NewChatPreset {
        question,
        responses,
        keywords,
    })
}

/// Preset service over the store.
pub struct ChatPresetService<'a> {
    store: &'a dyn Store,
}

impl<'a> ChatPresetService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// All presets, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `PresetError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<ChatPreset>, PresetError> {
        Ok(self.store.list_presets().await?)
    }

    /// Validate and store a new preset.
    ///
    /// # Errors
    ///
    /// Returns a validation `PresetError` or `PresetError::Repository`.
    pub async fn create(&self, input: NewChatPreset) -> Result<ChatPreset, PresetError> {
        let input = normalize(input)?;
        let preset = self.store.create_preset(&input).await?;
        tracing::info!(preset_id = %preset.id, "Chat preset created");
        Ok(preset)
    }

    /// Validate and replace an existing preset.
    ///
    /// # Errors
    ///
    /// Returns `PresetError::NotFound` if no preset has the id.
    pub async fn update(
        &self,
        id: ChatPresetId,
        input: NewChatPreset,
    ) -> Result<ChatPreset, PresetError> {
        let input = normalize(input)?;
        let preset = self
            .store
            .update_preset(id, &input)
            .await?
            .ok_or(PresetError::NotFound)?;
        tracing::info!(preset_id = %id, "Chat preset updated");
        Ok(preset)
    }

    /// Delete a preset.
    ///
    /// # Errors
    ///
    /// Returns `PresetError::NotFound` if no preset has the id.
    pub async fn delete(&self, id: ChatPresetId) -> Result<(), PresetError> {
        if !self.store.delete_preset(id).await? {
            return Err(PresetError::NotFound);
        }
        tracing::info!(preset_id = %id, "Chat preset deleted");
        Ok(())
    }

    /// Reply to a customer message with a random response of the first
    /// matching preset, or the fallback.
    ///
    /// # Errors
    ///
    /// Returns `PresetError::Repository` if the store fails.
    pub async fn reply(&self, message: &str) -> Result<Reply, PresetError> {
        let message = message.to_lowercase();
        let presets = self.store.list_presets().await?;

        let reply = presets
            .iter()
            .find(|p| p.matches(&message))
            .and_then(|p| {
                p.responses.choose(&mut rand::rng()).map(|text| Reply {
                    text: text.clone(),
                    preset_id: Some(p.id),
                })
            })
            .unwrap_or_else(|| Reply {
                text: FALLBACK_REPLY.to_owned(),
                preset_id: None,
            });

        Ok(reply)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn input(question: &str, responses: &[&str], keywords: &[&str]) -> NewChatPreset {
        NewChatPreset {
            question: question.to_owned(),
            responses: responses.iter().map(|s| (*s).to_owned()).collect(),
            keywords: keywords.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn test_normalize_cleans_keywords() {
        let out = normalize(input(
            "  Shipping? ",
            &[" 3-5 days ", ""],
            &[" Shipping", "DELIVERY ", "shipping", " "],
        ))
        .unwrap();
        assert_eq!(out.question, "Shipping?");
        assert_eq!(out.responses, vec!["3-5 days"]);
        assert_eq!(out.keywords, vec!["shipping", "delivery"]);
    }

    #[test]
    fn test_normalize_rejects_empty_parts() {
        assert!(matches!(
            normalize(input(" ", &["a"], &["b"])),
            Err(PresetError::EmptyQuestion)
        ));
        assert!(matches!(
            normalize(input("q", &[" "], &["b"])),
            Err(PresetError::NoResponses)
        ));
        assert!(matches!(
            normalize(input("q", &["a"], &[])),
            Err(PresetError::NoKeywords)
        ));
    }

    #[tokio::test]
    async fn test_reply_first_match_by_id() {
        let store = MemoryStore::new();
        let service = ChatPresetService::new(&store);
        let shipping = service
            .create(input("Shipping?", &["Ships in 3-5 days"], &["ship"]))
            .await
            .unwrap();
        service
            .create(input("Returns?", &["30-day returns"], &["return", "ship"]))
            .await
            .unwrap();

        let reply = service.reply("When will my order SHIP?").await.unwrap();
        assert_eq!(reply.preset_id, Some(shipping.id));
        assert_eq!(reply.text, "Ships in 3-5 days");

        let fallback = service.reply("hello there").await.unwrap();
        assert_eq!(fallback.preset_id, None);
        assert_eq!(fallback.text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_reply_picks_one_of_the_responses() {
        let store = MemoryStore::new();
        let service = ChatPresetService::new(&store);
        service
            .create(input("Hi", &["Hello!", "Hey!"], &["hi"]))
            .await
            .unwrap();

        for _ in 0..10 {
            let reply = service.reply("hi").await.unwrap();
            assert!(reply.text == "Hello!" || reply.text == "Hey!");
        }
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = MemoryStore::new();
        let service = ChatPresetService::new(&store);
        let missing = ChatPresetId::new(42);
        assert!(matches!(
            service.update(missing, input("q", &["a"], &["k"])).await,
            Err(PresetError::NotFound)
        ));
        assert!(matches!(
            service.delete(missing).await,
            Err(PresetError::NotFound)
        ));
    }
}
