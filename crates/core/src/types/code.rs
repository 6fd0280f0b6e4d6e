//! Six-digit registration verification codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`VerificationCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationCodeError {
    /// The code is not exactly six characters long.
    #[error("verification code must be {len} digits")]
    WrongLength {
        /// Required length.
        len: usize,
    },
    /// The code contains a non-digit character.
    #[error("verification code must contain only digits")]
    NonDigit,
    /// The code has a leading zero (codes are drawn from 100000..=999999).
    #[error("verification code cannot start with 0")]
    LeadingZero,
}

/// A six-digit numeric code mailed to a pending registration.
///
/// ```
/// use bazaar_core::VerificationCode;
///
/// assert!(VerificationCode::parse("482913").is_ok());
/// assert!(VerificationCode::parse(" 482913 ").is_ok()); // trimmed
/// assert!(VerificationCode::parse("48291").is_err());
/// assert!(VerificationCode::parse("04829a").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Number of digits in a code.
    pub const LEN: usize = 6;
    /// Smallest code value.
    pub const MIN: u32 = 100_000;
    /// Largest code value.
    pub const MAX: u32 = 999_999;

    /// Parse user input into a code. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error unless the trimmed input is six ASCII digits without
    /// a leading zero.
    pub fn parse(s: &str) -> Result<Self, VerificationCodeError> {
        let s = s.trim();

        if s.len() != Self::LEN {
            return Err(VerificationCodeError::WrongLength { len: Self::LEN });
        }

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VerificationCodeError::NonDigit);
        }

        if s.starts_with('0') {
            return Err(VerificationCodeError::LeadingZero);
        }

        Ok(Self(s.to_owned()))
    }

    /// Build a code from a number in `MIN..=MAX`.
    ///
    /// # Errors
    ///
    /// Returns `WrongLength` if the number is out of range.
    pub fn from_number(n: u32) -> Result<Self, VerificationCodeError> {
        if !(Self::MIN..=Self::MAX).contains(&n) {
            return Err(VerificationCodeError::WrongLength { len: Self::LEN });
        }
        Ok(Self(n.to_string()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for VerificationCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for VerificationCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for VerificationCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
