//! Signed bearer tokens (compact HS256 JWTs).
//!
//! Three kinds share one signing key and are told apart by the `kind` claim:
//!
//! - `session` - returned by login/verification, sent back in the `token` header
//! - `one_time` - embedded in the profile QR code, redeemable once
//! - `admin` - returned by the admin login
//!
//! Expiry is checked with zero leeway.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use bazaar_core::{AccountId, Email};

/// Lifetime of a one-time (QR) login token, in minutes.
pub const ONE_TIME_TOKEN_TTL_MINUTES: i64 = 15;

type HmacSha256 = Hmac<Sha256>;

/// Errors from issuing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Not three dot-separated base64url segments, or bad JSON inside.
    #[error("malformed token")]
    Malformed,

    /// Header names an algorithm other than HS256.
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,

    /// Signature does not match.
    #[error("invalid token signature")]
    BadSignature,

    /// `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// Valid token of a different kind.
    #[error("wrong token kind")]
    WrongKind,

    /// Subject does not name the expected principal.
    #[error("token subject mismatch")]
    SubjectMismatch,

    /// Signing key rejected by HMAC.
    #[error("invalid signing key")]
    InvalidKey,

    /// Claims could not be serialized.
    #[error("token encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// What a token grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Session,
    OneTime,
    Admin,
}

/// Token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id for `session`/`one_time`, admin email for `admin`.
    pub sub: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    /// Random nonce; keeps two tokens issued in the same second distinct.
    pub jti: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// A freshly issued one-time token and its expiry.
#[derive(Debug, Clone)]
pub struct OneTimeToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies tokens with the server's signing key.
pub struct TokenIssuer {
    secret: SecretString,
    session_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"[REDACTED]")
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// Create an issuer. `session_ttl` also applies to admin tokens.
    #[must_use]
    pub const fn new(secret: SecretString, session_ttl: Duration) -> Self {
        Self {
            secret,
            session_ttl,
        }
    }

    /// Issue a session token for an account.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn issue_session(&self, account: AccountId) -> Result<String, TokenError> {
        self.issue(
            TokenKind::Session,
            account.to_string(),
            Utc::now(),
            self.session_ttl,
        )
    }

    /// Verify a session token and return the account it belongs to.
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` if the token is malformed, forged, expired or
    /// not a session token.
    pub fn verify_session(&self, token: &str) -> Result<AccountId, TokenError> {
        let claims = self.verify(token, TokenKind::Session, Utc::now())?;
        claims
            .sub
            .parse::<i32>()
            .map(AccountId::new)
            .map_err(|_| TokenError::SubjectMismatch)
    }

    /// Issue a one-time (QR) login token for an account.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn issue_one_time(&self, account: AccountId) -> Result<OneTimeToken, TokenError> {
        let now = Utc::now();
        let ttl = Duration::minutes(ONE_TIME_TOKEN_TTL_MINUTES);
        let token = self.issue(TokenKind::OneTime, account.to_string(), now, ttl)?;
        Ok(OneTimeToken {
            token,
            expires_at: now + ttl,
        })
    }

    /// Verify that `token` is a live one-time token issued for `account`.
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` on any signature, expiry, kind or subject failure.
    pub fn verify_one_time(&self, token: &str, account: AccountId) -> Result<(), TokenError> {
        let claims = self.verify(token, TokenKind::OneTime, Utc::now())?;
        if claims.sub == account.to_string() {
            Ok(())
        } else {
            Err(TokenError::SubjectMismatch)
        }
    }

    /// Issue an admin token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn issue_admin(&self, admin: &Email) -> Result<String, TokenError> {
        self.issue(
            TokenKind::Admin,
            admin.as_str().to_owned(),
            Utc::now(),
            self.session_ttl,
        )
    }

    /// Verify an admin token against the configured admin email.
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` on any signature, expiry, kind or subject failure.
    pub fn verify_admin(&self, token: &str, admin: &Email) -> Result<(), TokenError> {
        let claims = self.verify(token, TokenKind::Admin, Utc::now())?;
        if claims.sub == admin.as_str() {
            Ok(())
        } else {
            Err(TokenError::SubjectMismatch)
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::InvalidKey)
    }

    fn issue(
        &self,
        kind: TokenKind,
        sub: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let header = Header {
            alg: "HS256".to_owned(),
            typ: "JWT".to_owned(),
        };
        let claims = Claims {
            sub,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
        };

        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    fn verify(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let mut parts = token.trim().split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_segment(claims_b64)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        if claims.kind != expected {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let raw = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)
}
