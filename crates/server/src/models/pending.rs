//! Pending registration domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Email, PendingRegistrationId, VerificationCode};

/// A signup waiting for its emailed code to be confirmed.
#[derive(Clone)]
pub struct PendingRegistration {
    pub id: PendingRegistrationId,
    pub name: String,
    pub email: Email,
    /// Argon2id PHC string, copied to the account on confirmation.
    pub password_hash: String,
    pub code: VerificationCode,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingRegistration {
    /// Returns true once the code can no longer be confirmed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for PendingRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRegistration")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Insert payload for a pending registration.
#[derive(Debug, Clone)]
pub struct NewPendingRegistration {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub code: VerificationCode,
    pub expires_at: DateTime<Utc>,
}
