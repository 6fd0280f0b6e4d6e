//! Client-reported device identifiers.
//!
//! The login forms send whatever network identifier the browser can see.
//! The server never corroborates it; it only drives the "new device" notice.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`DeviceId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceIdError {
    /// The identifier is empty after trimming.
    #[error("device identifier cannot be empty")]
    Empty,
    /// The identifier is too long.
    #[error("device identifier must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A trimmed, non-empty, bounded device identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Maximum stored length.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a device identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or too long.
    pub fn parse(s: &str) -> Result<Self, DeviceIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DeviceIdError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(DeviceIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
