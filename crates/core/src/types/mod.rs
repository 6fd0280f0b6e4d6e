//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod device;
pub mod email;
pub mod id;

pub use code::{VerificationCode, VerificationCodeError};
pub use device::{DeviceId, DeviceIdError};
pub use email::{Email, EmailError};
pub use id::*;
