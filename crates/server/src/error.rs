//! Unified error handling with Sentry integration.
//!
//! Every failure leaves the server as `{"success": false, "message": ...}`.
//! Business rejections keep HTTP 200 so clients branch on `success`; auth
//! failures are 401 and faults are 500 with a generic message, captured to
//! Sentry first.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::chat_presets::PresetError;

/// Message for requests with a missing, invalid or expired token.
pub const NOT_AUTHORIZED: &str = "Not Authorized Login Again";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Chat preset operation failed.
    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    /// Token missing, invalid, expired or of the wrong kind.
    #[error("Unauthorized")]
    Unauthorized,

    /// Request body could not be parsed; see [`crate::extract::JsonBody`].
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Per-IP auth limit exhausted.
    #[error("Rate limited")]
    RateLimited,

    /// Fault outside the domain services, e.g. the rate limiter itself.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Client-facing message for a business rejection.
    fn rejection_message(&self) -> Option<&'static str> {
        match self {
            Self::Auth(err) => err.user_message(),
            Self::Preset(err) => err.user_message(),
            _ => None,
        }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        if let Some(message) = self.rejection_message() {
            return (StatusCode::OK, message.to_string());
        }

        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, NOT_AUTHORIZED.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please slow down".to_string(),
            ),
            // Don't expose internal error details to clients
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status == StatusCode::OK {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_rejection_is_200_with_message() {
        let (status, body) = body_json(AppError::Auth(AuthError::QrInvalid)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "QR Invalid");
    }

    #[tokio::test]
    async fn test_unauthorized_is_401() {
        let (status, body) = body_json(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], NOT_AUTHORIZED);
    }

    #[tokio::test]
    async fn test_faults_hide_details() {
        let (status, body) = body_json(AppError::Auth(AuthError::Repository(
            RepositoryError::DataCorruption("row 7 has a bad email".to_string()),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");

        let (status, _) = body_json(AppError::Internal("boom".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("x".to_string()).status_and_message().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::RateLimited.status_and_message().0,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Preset(PresetError::NotFound).status_and_message(),
            (StatusCode::OK, "Preset not found".to_string())
        );
    }
}
