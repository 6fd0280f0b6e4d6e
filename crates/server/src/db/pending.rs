//! Pending registration repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{Email, PendingRegistrationId};

use super::RepositoryError;
use crate::models::{Account, NewPendingRegistration, PendingRegistration};

/// Storage operations on signups awaiting confirmation.
#[async_trait]
pub trait PendingRegistrationRepository: Send + Sync {
    /// Get the pending registration for an email, expired or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn get_pending(&self, email: &Email)
    -> Result<Option<PendingRegistration>, RepositoryError>;

    /// Insert a pending registration.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if one already exists for the email.
    async fn create_pending(
        &self,
        pending: &NewPendingRegistration,
    ) -> Result<PendingRegistration, RepositoryError>;

    /// Delete a pending registration by ID. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    async fn delete_pending(&self, id: PendingRegistrationId) -> Result<bool, RepositoryError>;

    /// Turn a pending registration into a verified account.
    ///
    /// Deleting the pending row and inserting the account happen in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the pending registration is gone.
    /// Returns `RepositoryError::Conflict` if an account already uses the email.
    async fn promote_pending(&self, id: PendingRegistrationId) -> Result<Account, RepositoryError>;

    /// Delete every pending registration that expired before `now`.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    async fn purge_expired_pending(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}
