//! Verifying signature envelopes.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. Split the header into `<mac>.<sealed>` ([`AuthError::MalformedEnvelope`]).
//! 2. Decrypt the sealed expiration ([`AuthError::DecryptionFailure`]).
//! 3. Reject if `now > expires_at_ms` ([`AuthError::Expired`]). A request
//!    arriving in the exact millisecond of expiry is still accepted.
//! 4. Recompute the MAC over `url || sealed` and compare in constant time
//!    ([`AuthError::MacMismatch`]).
//!
//! Expiry is checked before the MAC so stale requests are turned away
//! without computing a second digest.

use subtle::ConstantTimeEq;
use tracing::debug;

use crate::clock::Clock;
use crate::envelope::SignedEnvelope;
use crate::error::AuthError;
use crate::seal::open_expiration;
use crate::secret::SharedSecret;
use crate::signer::compute_mac;

/// The result of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidSignature {
    /// Expiration sealed in the envelope, in Unix epoch milliseconds.
    pub expires_at_ms: i64,
}

/// Parse and verify raw `x-signature` header text.
pub fn verify_signature(
    header: &str,
    url: &str,
    secret: &SharedSecret,
    clock: &dyn Clock,
) -> Result<ValidSignature, AuthError> {
    let envelope = SignedEnvelope::parse(header)?;
    verify_envelope(&envelope, url, secret, clock.now_millis())
}

/// Verify a parsed envelope against the URL observed for this request.
pub fn verify_envelope(
    envelope: &SignedEnvelope,
    url: &str,
    secret: &SharedSecret,
    now_ms: i64,
) -> Result<ValidSignature, AuthError> {
    let expires_at_ms = open_expiration(envelope.sealed_expiration(), secret)?;

    if now_ms > expires_at_ms {
        debug!(expires_at_ms, now_ms, "signature expired");
        return Err(AuthError::Expired { expires_at_ms });
    }

    let expected = compute_mac(url, envelope.sealed_expiration(), secret)?;

    if expected.as_bytes().ct_eq(envelope.mac().as_bytes()).into() {
        Ok(ValidSignature { expires_at_ms })
    } else {
        debug!(url, "signature mac mismatch");
        Err(AuthError::MacMismatch)
    }
}
