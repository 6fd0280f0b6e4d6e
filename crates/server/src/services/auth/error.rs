//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError;
use crate::services::tokens::TokenError;

/// Errors that can occur during authentication operations.
///
/// Variants above `Repository` are business rejections: the client gets
/// `success: false` with [`AuthError::user_message`]. The rest are faults.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signup for an email that already has an account.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// Password too weak.
    #[error("password validation failed")]
    WeakPassword,

    /// No pending registration for the email.
    #[error("no pending registration")]
    NoPendingRegistration,

    /// Submitted code does not match the pending one.
    #[error("invalid verification code")]
    InvalidCode,

    /// Pending registration expired before confirmation.
    #[error("verification code expired")]
    CodeExpired,

    /// Login for an email with no account.
    #[error("user does not exist")]
    UnknownUser,

    /// Account exists but its email is not confirmed.
    #[error("email not verified")]
    NotVerified,

    /// Wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// One-time login token rejected.
    #[error("invalid one-time token")]
    QrInvalid,

    /// Admin email/password mismatch.
    #[error("invalid admin credentials")]
    InvalidAdminCredentials,

    /// Account referenced by a valid token no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// Profile edit onto an email another account owns.
    #[error("email already in use")]
    EmailInUse,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing failed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Verification email could not be delivered.
    #[error("email delivery failed: {0}")]
    EmailDelivery(#[from] EmailError),
}

impl AuthError {
    /// Message shown to the client for a business rejection, `None` for faults.
    #[must_use]
    pub const fn user_message(&self) -> Option<&'static str> {
        let message = match self {
            Self::UserAlreadyExists => "User already exists",
            Self::InvalidEmail(_) => "Please enter a valid email",
            Self::WeakPassword => "Please enter a strong password",
            Self::NoPendingRegistration => "No pending registration found",
            Self::InvalidCode => "Invalid OTP",
            Self::CodeExpired => "OTP expired, please register again",
            Self::UnknownUser => "User does not exist, Sign Up",
            Self::NotVerified => "Please verify your email before logging in",
            Self::InvalidCredentials => "Invalid Credentials",
            Self::QrInvalid => "QR Invalid",
            Self::InvalidAdminCredentials => {
                "Invalid Credentials, Try entering the correct email and password"
            }
            Self::UserNotFound => "User not found",
            Self::EmailInUse => "Email already in use",
            Self::Repository(_)
            | Self::PasswordHash
            | Self::Token(_)
            | Self::EmailDelivery(_) => return None,
        };
        Some(message)
    }
}
