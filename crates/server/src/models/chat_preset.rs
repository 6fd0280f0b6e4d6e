//! Chat preset domain types.

use serde::{Deserialize, Serialize};

use bazaar_core::ChatPresetId;

/// A canned chat answer, matched against customer messages by keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPreset {
    #[serde(rename = "_id")]
    pub id: ChatPresetId,
    pub question: String,
    pub responses: Vec<String>,
    /// Lowercase, trimmed keywords.
    pub keywords: Vec<String>,
}

impl ChatPreset {
    /// Returns true if any keyword occurs in the already-lowercased `message`.
    #[must_use]
    pub fn matches(&self, message_lower: &str) -> bool {
        self.keywords.iter().any(|k| message_lower.contains(k.as_str()))
    }
}

/// Create/update payload for a chat preset, as accepted from the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewChatPreset {
    pub question: String,
    pub responses: Vec<String>,
    pub keywords: Vec<String>,
}
