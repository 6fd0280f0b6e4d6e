//! HTTP routes for the account service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness
//! GET  /health/ready                 - Readiness (store reachable)
//!
//! # Accounts (rate limited)
//! POST /api/user/register            - Start signup, email a code
//! POST /api/user/verifyotp           - Confirm code, create account
//! POST /api/user/login               - Password login
//! POST /api/user/qrlogin             - One-time token login
//! POST /api/user/admin               - Admin login
//!
//! # Accounts (session token)
//! POST /api/user/profile             - Profile and QR token
//! POST /api/user/editProfile         - Update contact details
//!
//! # Chat
//! GET  /api/chats/presets            - List presets (admin)
//! POST /api/chats/presets            - Create preset (admin)
//! PUT  /api/chats/presets/{id}       - Replace preset (admin)
//! DELETE /api/chats/presets/{id}     - Delete preset (admin)
//! POST /api/chats/reply              - Keyword reply (session token)
//! ```

pub mod chat_presets;
pub mod health;
pub mod user;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{TOKEN_HEADER, auth_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Create the account routes router.
///
/// Credential-taking endpoints get the per-IP limiter when `rate_limit` is set.
pub fn user_routes(rate_limit: bool) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(user::register))
        .route("/verifyotp", post(user::verify_code))
        .route("/login", post(user::login))
        .route("/qrlogin", post(user::qr_login))
        .route("/admin", post(user::admin_login));
    let credentials = if rate_limit {
        credentials.layer(auth_rate_limiter())
    } else {
        credentials
    };

    Router::new()
        .route("/profile", post(user::profile))
        .route("/editProfile", post(user::edit_profile))
        .merge(credentials)
}

/// Create the chat routes router.
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/presets",
            get(chat_presets::list).post(chat_presets::create),
        )
        .route(
            "/presets/{id}",
            put(chat_presets::update).delete(chat_presets::delete),
        )
        .route("/reply", post(chat_presets::reply))
}

/// Create all routes.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/user", user_routes(rate_limit))
        .nest("/api/chats", chat_routes())
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = origin
        .and_then(|o| HeaderValue::from_str(o).ok())
        .map_or_else(AllowOrigin::any, AllowOrigin::exact);

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(TOKEN_HEADER)])
}

/// Build the full application: routes, state and the middleware stack.
///
/// Layers run outermost first: Sentry, CORS, tracing, request id.
pub fn app(state: AppState) -> Router {
    let rate_limit = state.config().rate_limit;
    let cors = cors_layer(state.config().cors_origin.as_deref());

    routes(rate_limit)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
