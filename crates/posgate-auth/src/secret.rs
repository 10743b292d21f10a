//! The shared signing secret.

use std::fmt;
use std::sync::Arc;

/// Symmetric secret shared out of band between signers and the gateway.
///
/// Cloning is cheap; the bytes live behind an `Arc` and are never mutated.
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Arc<str>);

impl SharedSecret {
    /// Wrap a secret string.
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self(secret.into())
    }

    /// The secret as raw bytes, used both as the HMAC key and as the AES passphrase.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}
