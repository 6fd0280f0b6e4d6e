//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span with method, path, status, latency)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//! 5. Rate limiting on auth routes (governor, optional)
//!
//! Token checks are extractors ([`RequireUser`], [`RequireAdmin`]) rather than
//! layers, so each handler states what it needs.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{RequireAdmin, RequireUser, TOKEN_HEADER};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
