//! Token extractors for authenticated routes.
//!
//! Clients send the signed token in a `token` header. A missing, forged,
//! expired or wrong-kind token rejects the request with 401 before the
//! handler runs.

use axum::{extract::FromRequestParts, http::request::Parts};

use bazaar_core::AccountId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Header carrying the session or admin token.
pub const TOKEN_HEADER: &str = "token";

/// Extractor that requires a valid session token.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireUser(account_id): RequireUser) -> impl IntoResponse {
///     format!("Hello, account {account_id}!")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub AccountId);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_header(parts).ok_or(AppError::Unauthorized)?;

        let account_id = state.tokens().verify_session(token).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            AppError::Unauthorized
        })?;

        set_sentry_user(&account_id);
        Ok(Self(account_id))
    }
}

/// Extractor that requires a valid admin token for the configured admin.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_header(parts).ok_or(AppError::Unauthorized)?;

        state
            .tokens()
            .verify_admin(token, &state.config().admin.email)
            .map_err(|e| {
                tracing::debug!(error = %e, "Admin token rejected");
                AppError::Unauthorized
            })?;

        Ok(Self)
    }
}

fn token_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
