//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Signup with emailed code, password/QR login, admin login, profile
//! - `chat_presets` - Admin-managed canned chat answers
//! - `email` - Verification code delivery over SMTP
//! - `tokens` - Signed session, one-time and admin tokens

pub mod auth;
pub mod chat_presets;
pub mod email;
pub mod tokens;
