//! Account repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{AccountId, DeviceId, Email};

use super::RepositoryError;
use crate::models::{Account, ProfileUpdate};

/// Storage operations on verified accounts.
///
/// Accounts are created only by
/// [`PendingRegistrationRepository::promote_pending`](super::PendingRegistrationRepository::promote_pending).
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Get an account by its (normalized) email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn get_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError>;

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    /// Store `token` as the one-time login token unless a live one exists at `now`.
    ///
    /// Check and write are atomic, so concurrent profile fetches agree on one
    /// token. Returns the account as stored afterwards; its token is either
    /// the existing live one or `token`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    async fn set_one_time_token_if_absent(
        &self,
        id: AccountId,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError>;

    /// Clear the one-time token if it equals `token` and is unexpired at `now`.
    ///
    /// Compare and clear happen atomically, so a token is consumed at most once.
    /// Returns `true` if the token was consumed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    async fn consume_one_time_token(
        &self,
        id: AccountId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Append `device` to the account's device list unless already present.
    ///
    /// Returns `true` if the device was not seen before. Atomic with respect
    /// to concurrent logins on the same account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    async fn record_device(&self, id: AccountId, device: &DeviceId)
    -> Result<bool, RepositoryError>;

    /// Overwrite the contact fields of an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    /// Returns `RepositoryError::Conflict` if the new email belongs to another account.
    async fn update_profile(
        &self,
        id: AccountId,
        update: &ProfileUpdate,
    ) -> Result<Account, RepositoryError>;
}
