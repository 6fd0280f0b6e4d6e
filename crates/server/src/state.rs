//! Application state shared across handlers.

use std::sync::Arc;

use chrono::Duration;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::services::auth::AuthService;
use crate::services::chat_presets::ChatPresetService;
use crate::services::email::EmailService;
use crate::services::tokens::TokenIssuer;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
    mailer: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Storage backend
    /// * `mailer` - SMTP sender, `None` to log codes instead
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<dyn Store>, mailer: Option<EmailService>) -> Self {
        let tokens = TokenIssuer::new(
            config.jwt_secret.clone(),
            Duration::hours(config.session_ttl_hours),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                mailer,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Authentication service over this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.store(),
            self.tokens(),
            self.inner.mailer.as_ref(),
            &self.inner.config.admin,
        )
    }

    /// Chat preset service over this state.
    #[must_use]
    pub fn presets(&self) -> ChatPresetService<'_> {
        ChatPresetService::new(self.store())
    }
}
