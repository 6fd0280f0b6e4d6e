//! Domain models for the account service.
//!
//! These types represent validated domain objects separate from database row
//! types and from the JSON shapes returned to clients.

pub mod account;
pub mod chat_preset;
pub mod pending;

pub use account::{Account, CartData, ProfileUpdate};
pub use chat_preset::{ChatPreset, NewChatPreset};
pub use pending::{NewPendingRegistration, PendingRegistration};
