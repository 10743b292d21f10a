//! The `x-signature` wire value.
//!
//! ```text
//! x-signature: <mac>.<sealed>
//! ```
//!
//! `mac` is lowercase hex and `sealed` is standard Base64, so neither can
//! contain a `.`; a header with anything other than exactly one separator is
//! malformed rather than being split on a guess.

use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

/// Name of the request header carrying the envelope.
pub const SIGNATURE_HEADER: &str = "x-signature";

const SEPARATOR: char = '.';

/// A parsed signature envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    mac: String,
    sealed_expiration: String,
}

impl SignedEnvelope {
    /// Assemble an envelope from its two fields.
    pub fn new(mac: impl Into<String>, sealed_expiration: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            sealed_expiration: sealed_expiration.into(),
        }
    }

    /// Parse header text into its two fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use posgate_auth::{AuthError, SignedEnvelope};
    ///
    /// let envelope = SignedEnvelope::parse("ab12.U2FsdGVkX18=").unwrap();
    /// assert_eq!(envelope.mac(), "ab12");
    /// assert_eq!(envelope.sealed_expiration(), "U2FsdGVkX18=");
    ///
    /// assert_eq!(SignedEnvelope::parse("ab12"), Err(AuthError::MalformedEnvelope));
    /// assert_eq!(SignedEnvelope::parse("a.b.c"), Err(AuthError::MalformedEnvelope));
    /// ```
    pub fn parse(text: &str) -> Result<Self, AuthError> {
        let (mac, sealed) = text
            .split_once(SEPARATOR)
            .ok_or(AuthError::MalformedEnvelope)?;

        if mac.is_empty() || sealed.is_empty() || sealed.contains(SEPARATOR) {
            return Err(AuthError::MalformedEnvelope);
        }

        Ok(Self::new(mac, sealed))
    }

    /// The hex MAC field.
    #[must_use]
    pub fn mac(&self) -> &str {
        &self.mac
    }

    /// The sealed expiration field, exactly as transmitted.
    #[must_use]
    pub fn sealed_expiration(&self) -> &str {
        &self.sealed_expiration
    }
}

impl FromStr for SignedEnvelope {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SignedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.mac, self.sealed_expiration)
    }
}
