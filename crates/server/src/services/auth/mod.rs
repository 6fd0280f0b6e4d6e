//! Authentication service.
//!
//! Email/password signup confirmed by an emailed code, password login with
//! device recognition, one-time (QR) token login, and the configured admin
//! login.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use secrecy::ExposeSecret;

use bazaar_core::{AccountId, DeviceId, Email, VerificationCode};

use crate::config::AdminCredentials;
use crate::db::{RepositoryError, Store};
use crate::models::{Account, NewPendingRegistration, ProfileUpdate};
use crate::services::email::{EmailService, generate_verification_code};
use crate::services::tokens::TokenIssuer;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long an emailed signup code stays valid.
pub const PENDING_CODE_TTL_MINUTES: i64 = 5;

/// Result of a signup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A new code was generated and dispatched.
    CodeSent,
    /// A live code already exists for the email; nothing was sent.
    AlreadySent,
}

impl RegisterOutcome {
    /// Client-facing message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::CodeSent => "OTP sent to your email",
            Self::AlreadySent => "OTP already sent to your email",
        }
    }
}

/// A successful login (password, code confirmation or QR).
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account_id: AccountId,
    /// Session token for the `token` header.
    pub token: String,
    /// Whether the device identifier was seen for the first time.
    pub new_device: bool,
}

impl LoginOutcome {
    /// Client-facing message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        if self.new_device {
            "Login successful from a new device"
        } else {
            "Login successful"
        }
    }
}

/// Profile view: the account plus its live one-time login token.
#[derive(Debug, Clone)]
pub struct Profile {
    pub account: Account,
    pub one_time_token: String,
}

/// Authentication service.
///
/// Borrowed from [`AppState`](crate::state::AppState) per request.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenIssuer,
    mailer: Option<&'a EmailService>,
    admin: &'a AdminCredentials,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        tokens: &'a TokenIssuer,
        mailer: Option<&'a EmailService>,
        admin: &'a AdminCredentials,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            admin,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Start a signup: store a pending registration and email its code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email has an account.
    /// Returns `AuthError::InvalidEmail` / `AuthError::WeakPassword` on bad input.
    /// Returns `AuthError::EmailDelivery` if the code cannot be sent.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterOutcome, AuthError> {
        let email = Email::normalize(email)?;

        if self.store.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        // A live pending record answers before the new password is looked at.
        let now = Utc::now();
        let stale_pending = match self.store.get_pending(&email).await? {
            Some(pending) if !pending.is_expired(now) => {
                tracing::info!(email = %email, "Pending registration already live, not resending");
                return Ok(RegisterOutcome::AlreadySent);
            }
            other => other,
        };

        validate_password(password)?;

        if let Some(pending) = stale_pending {
            self.store.delete_pending(pending.id).await?;
        }

        let password_hash = hash_password(password)?;
        let code = generate_verification_code();
        let name = name.trim().to_owned();

        let pending = match self
            .store
            .create_pending(&NewPendingRegistration {
                name: name.clone(),
                email: email.clone(),
                password_hash,
                code: code.clone(),
                expires_at: now + Duration::minutes(PENDING_CODE_TTL_MINUTES),
            })
            .await
        {
            Ok(pending) => pending,
            // A concurrent request for the same email won the insert.
            Err(RepositoryError::Conflict(_)) => return Ok(RegisterOutcome::AlreadySent),
            Err(e) => return Err(e.into()),
        };

        if let Some(mailer) = self.mailer {
            if let Err(e) = mailer
                .send_verification_code(&email, &name, &code, PENDING_CODE_TTL_MINUTES)
                .await
            {
                // Let the user retry immediately instead of waiting out the TTL.
                self.store.delete_pending(pending.id).await?;
                return Err(e.into());
            }
        } else {
            tracing::warn!(
                email = %email,
                code = %code,
                "SMTP not configured, verification code logged instead of sent"
            );
        }

        tracing::info!(email = %email, "Verification code issued");
        Ok(RegisterOutcome::CodeSent)
    }

    /// Confirm a signup code, creating the verified account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoPendingRegistration`, `AuthError::CodeExpired` or
    /// `AuthError::InvalidCode` when the code cannot be accepted.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<LoginOutcome, AuthError> {
        let email = Email::normalize(email)?;

        let pending = self
            .store
            .get_pending(&email)
            .await?
            .ok_or(AuthError::NoPendingRegistration)?;

        if pending.is_expired(Utc::now()) {
            self.store.delete_pending(pending.id).await?;
            return Err(AuthError::CodeExpired);
        }

        let code = VerificationCode::parse(code).map_err(|_| AuthError::InvalidCode)?;
        if !constant_time_eq(code.as_str().as_bytes(), pending.code.as_str().as_bytes()) {
            return Err(AuthError::InvalidCode);
        }

        let account = self
            .store
            .promote_pending(pending.id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::NoPendingRegistration,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(account_id = %account.id, "Account verified");

        Ok(LoginOutcome {
            account_id: account.id,
            token: self.tokens.issue_session(account.id)?,
            new_device: false,
        })
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Login with email and password, recording the device.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownUser`, `AuthError::NotVerified` or
    /// `AuthError::InvalidCredentials` on rejection.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        let email = Email::normalize(email).map_err(|_| AuthError::UnknownUser)?;

        let account = self
            .store
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        // Checked before the password so unverified accounts never log in.
        if !account.verified {
            return Err(AuthError::NotVerified);
        }

        verify_password(password, &account.password_hash)?;

        let new_device = self.recognize_device(account.id, device).await?;
        tracing::info!(account_id = %account.id, new_device, "Password login");

        Ok(LoginOutcome {
            account_id: account.id,
            token: self.tokens.issue_session(account.id)?,
            new_device,
        })
    }

    /// Redeem a one-time (QR) token for a session on another device.
    ///
    /// The stored token is cleared on success, so each token works once.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::QrInvalid` if the token is forged, expired, for a
    /// different account, or does not equal the stored token.
    pub async fn qr_login(
        &self,
        account_id: AccountId,
        token: &str,
        device: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        self.tokens
            .verify_one_time(token, account_id)
            .map_err(|e| {
                tracing::debug!(account_id = %account_id, error = %e, "One-time token rejected");
                AuthError::QrInvalid
            })?;

        if !self
            .store
            .consume_one_time_token(account_id, token, Utc::now())
            .await?
        {
            return Err(AuthError::QrInvalid);
        }

        let new_device = self.recognize_device(account_id, device).await?;
        tracing::info!(account_id = %account_id, new_device, "QR login");

        Ok(LoginOutcome {
            account_id,
            token: self.tokens.issue_session(account_id)?,
            new_device,
        })
    }

    /// Check the configured admin credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidAdminCredentials` on mismatch.
    pub fn admin_login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email_ok = Email::normalize(email).is_ok_and(|email| {
            constant_time_eq(email.as_str().as_bytes(), self.admin.email.as_str().as_bytes())
        });
        let password_ok = constant_time_eq(
            password.as_bytes(),
            self.admin.password.expose_secret().as_bytes(),
        );

        if !(email_ok & password_ok) {
            tracing::warn!("Failed admin login attempt");
            return Err(AuthError::InvalidAdminCredentials);
        }

        tracing::info!("Admin login");
        Ok(self.tokens.issue_admin(&self.admin.email)?)
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Fetch the profile, issuing a fresh one-time token if none is live.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn fetch_profile(&self, account_id: AccountId) -> Result<Profile, AuthError> {
        let account = self
            .store
            .get_by_id(account_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let now = Utc::now();
        if let Some(token) = account.live_one_time_token(now) {
            let one_time_token = token.to_owned();
            return Ok(Profile {
                account,
                one_time_token,
            });
        }

        // A concurrent fetch may have stored a token since the read; keep that one.
        let issued = self.tokens.issue_one_time(account_id)?;
        let account = self
            .store
            .set_one_time_token_if_absent(account_id, &issued.token, issued.expires_at, now)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;
        let one_time_token = account.one_time_token.clone().unwrap_or(issued.token);

        Ok(Profile {
            account,
            one_time_token,
        })
    }

    /// Update the contact fields of an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::EmailInUse` or
    /// `AuthError::UserNotFound` on rejection.
    pub async fn edit_profile(
        &self,
        account_id: AccountId,
        name: &str,
        email: &str,
        phone: Option<String>,
        address: Option<serde_json::Value>,
    ) -> Result<Account, AuthError> {
        let update = ProfileUpdate {
            name: name.trim().to_owned(),
            email: Email::normalize(email)?,
            phone: phone
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty()),
            address,
        };

        let account = self
            .store
            .update_profile(account_id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailInUse,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(account_id = %account_id, "Profile updated");
        Ok(account)
    }

    /// Record the device; a missing or unusable identifier is skipped.
    async fn recognize_device(
        &self,
        account_id: AccountId,
        device: Option<&str>,
    ) -> Result<bool, AuthError> {
        let Some(device) = device.and_then(|d| DeviceId::parse(d).ok()) else {
            return Ok(false);
        };
        Ok(self.store.record_device(account_id, &device).await?)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Compare two byte strings without early exit on the first difference.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
