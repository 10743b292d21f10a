//! Error types for signature verification.
//!
//! Every way a signature can fail is a variant of [`AuthError`]. The gateway
//! turns all of them into a 403; the variant only decides which of the two
//! public messages the caller sees and what gets logged.

/// Errors that can occur while producing or verifying a request signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The `x-signature` header is absent.
    #[error("Missing signature header")]
    MissingSignature,

    /// The header is not `<mac>.<sealed>` with both fields non-empty.
    #[error("Malformed signature envelope")]
    MalformedEnvelope,

    /// The sealed expiration could not be decoded, decrypted, or read as a
    /// millisecond timestamp.
    #[error("Sealed expiration could not be decrypted")]
    DecryptionFailure,

    /// The decrypted expiration lies in the past.
    #[error("Signature expired at {expires_at_ms}")]
    Expired {
        /// Expiration carried by the envelope, in Unix epoch milliseconds.
        expires_at_ms: i64,
    },

    /// The recomputed MAC differs from the one in the envelope.
    #[error("Signature does not match")]
    MacMismatch,

    /// A cryptographic primitive or request invariant failed unexpectedly.
    #[error("Unexpected verification failure: {0}")]
    UnexpectedFailure(String),
}

impl AuthError {
    /// Short stable name of the error kind, suitable for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingSignature => "missing_signature",
            Self::MalformedEnvelope => "malformed_envelope",
            Self::DecryptionFailure => "decryption_failure",
            Self::Expired { .. } => "expired",
            Self::MacMismatch => "mac_mismatch",
            Self::UnexpectedFailure(_) => "unexpected_failure",
        }
    }
}
