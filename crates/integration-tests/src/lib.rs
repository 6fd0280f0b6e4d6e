//! End-to-end test harness for the Bazaar account service.
//!
//! [`TestApp::spawn`] starts the full router (middleware included) on an
//! ephemeral port, backed by a [`MemoryStore`] the tests can inspect. SMTP is
//! left unconfigured, so verification codes are read from the store.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};

use bazaar_core::{AccountId, Email};
use bazaar_server::config::{AdminCredentials, ServerConfig, StorageConfig};
use bazaar_server::db::{AccountRepository, MemoryStore, PendingRegistrationRepository};
use bazaar_server::routes;
use bazaar_server::state::AppState;

pub const ADMIN_EMAIL: &str = "admin@bazaar.test";
pub const ADMIN_PASSWORD: &str = "admin-pass-123";
pub const TOKEN_HEADER: &str = "token";

/// A running server plus handles to its store.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub store: Arc<MemoryStore>,
}

fn test_config() -> ServerConfig {
    ServerConfig {
        storage: StorageConfig::InMemory,
        host: [127, 0, 0, 1].into(),
        port: 0,
        jwt_secret: SecretString::from("Int3gration-K3y-9f8e7d6c5b4a3210-zyxwvu"),
        session_ttl_hours: 1,
        admin: AdminCredentials {
            email: Email::parse(ADMIN_EMAIL).unwrap_or_else(|_| unreachable!("valid email")),
            password: SecretString::from(ADMIN_PASSWORD),
        },
        cors_origin: None,
        rate_limit: false,
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

impl TestApp {
    /// Start a server on `127.0.0.1:0` with rate limiting off.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    /// Start a server with the auth rate limiter enabled.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn_rate_limited() -> Self {
        Self::spawn_with(ServerConfig {
            rate_limit: true,
            ..test_config()
        })
        .await
    }

    async fn spawn_with(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone(), None);
        let app = routes::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
            store,
        }
    }

    /// POST a JSON body, optionally with a token, and return status and body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the body is not JSON.
    pub async fn post(&self, path: &str, body: &Value, token: Option<&str>) -> (u16, Value) {
        let mut request = self.client.post(format!("{}{path}", self.base_url)).json(body);
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }
        let response = request.send().await.expect("Request failed");
        let status = response.status().as_u16();
        let body = response.json().await.expect("Response was not JSON");
        (status, body)
    }

    /// The code emailed to `email`, read straight from the store.
    ///
    /// # Panics
    ///
    /// Panics if there is no pending registration for `email`.
    pub async fn pending_code(&self, email: &str) -> String {
        let email = Email::normalize(email).expect("valid email");
        self.store
            .get_pending(&email)
            .await
            .expect("store error")
            .expect("no pending registration")
            .code
            .as_str()
            .to_owned()
    }

    /// Register and confirm an account, returning its session token.
    ///
    /// # Panics
    ///
    /// Panics if any step is rejected.
    pub async fn create_account(&self, name: &str, email: &str, password: &str) -> String {
        let (_, body) = self
            .post(
                "/api/user/register",
                &json!({ "name": name, "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(body["success"], true, "register failed: {body}");

        let code = self.pending_code(email).await;
        let (_, body) = self
            .post(
                "/api/user/verifyotp",
                &json!({ "email": email, "otp": code }),
                None,
            )
            .await;
        assert_eq!(body["success"], true, "verify failed: {body}");
        body["token"].as_str().expect("token").to_owned()
    }

    /// Account id for `email`.
    ///
    /// # Panics
    ///
    /// Panics if the account does not exist.
    pub async fn account_id(&self, email: &str) -> AccountId {
        let email = Email::normalize(email).expect("valid email");
        self.store
            .get_by_email(&email)
            .await
            .expect("store error")
            .expect("no account")
            .id
    }

    /// Log in as the configured admin and return the admin token.
    ///
    /// # Panics
    ///
    /// Panics if the login is rejected.
    pub async fn admin_token(&self) -> String {
        let (_, body) = self
            .post(
                "/api/user/admin",
                &json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
                None,
            )
            .await;
        body["token"].as_str().expect("admin token").to_owned()
    }
}
