//! Account domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use bazaar_core::{AccountId, DeviceId, Email};

/// Cart contents: item id -> size label -> quantity.
///
/// Stored and returned verbatim; cart mutation lives in the cart API.
pub type CartData = BTreeMap<String, BTreeMap<String, u32>>;

/// A verified storefront account.
///
/// Only created once a pending registration has been confirmed, so
/// `verified` is true for every account this service creates. The flag is
/// still checked at login for accounts imported from elsewhere.
#[derive(Clone)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Normalized email address (unique).
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Whether the email address has been confirmed.
    pub verified: bool,
    /// Contact phone number, free-form.
    pub phone: Option<String>,
    /// Shipping address, free-form JSON as sent by the profile form.
    pub address: Option<serde_json::Value>,
    /// When the account was created.
    pub joined_at: DateTime<Utc>,
    /// Saved cart contents.
    pub cart: CartData,
    /// Current one-time (QR) login token, if issued.
    pub one_time_token: Option<String>,
    /// Expiry of `one_time_token`.
    pub one_time_token_expires_at: Option<DateTime<Utc>>,
    /// Device identifiers seen at successful logins, in first-seen order.
    pub devices: Vec<String>,
}

impl Account {
    /// Returns the one-time token if one is stored and still valid at `now`.
    #[must_use]
    pub fn live_one_time_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match (&self.one_time_token, self.one_time_token_expires_at) {
            (Some(token), Some(expires_at)) if expires_at > now => Some(token.as_str()),
            _ => None,
        }
    }

    /// Returns true if `device` has logged in to this account before.
    #[must_use]
    pub fn knows_device(&self, device: &DeviceId) -> bool {
        self.devices.iter().any(|d| d == device.as_str())
    }
}

// Keep the password hash and live token out of logs.
impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("verified", &self.verified)
            .field("joined_at", &self.joined_at)
            .field("one_time_token", &self.one_time_token.as_ref().map(|_| "[REDACTED]"))
            .field("one_time_token_expires_at", &self.one_time_token_expires_at)
            .field("devices", &self.devices.len())
            .finish_non_exhaustive()
    }
}

/// Contact fields a signed-in user may change.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub address: Option<serde_json::Value>,
}
