//! Producing signature envelopes.
//!
//! The gateway never signs; this is the client half of the contract, kept
//! next to the verifier so both sides share one definition of the signing
//! input.

use std::time::Duration;

use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;

use crate::clock::Clock;
use crate::envelope::SignedEnvelope;
use crate::error::AuthError;
use crate::seal::seal_expiration;
use crate::secret::SharedSecret;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex HMAC-SHA256 of `url || sealed_expiration`.
///
/// The two parts are concatenated with no delimiter, so the MAC binds the
/// signature to the exact URL (path and query included) and to the exact
/// sealed text.
///
/// # Examples
///
/// ```
/// use posgate_auth::{SharedSecret, compute_mac};
///
/// let mac = compute_mac(
///     "https://gateway.example.com/products/categories?page=2",
///     "U2FsdGVkX18BAgMEBQYHCJ83ZzFuYuXuPU4dBeG6/GU=",
///     &SharedSecret::new("test-shared-secret"),
/// )
/// .unwrap();
/// assert_eq!(mac, "c23499bf4e2c533cd7daf7a054bc893ed8ea5784b7185333e962e24f00558781");
/// ```
pub fn compute_mac(
    url: &str,
    sealed_expiration: &str,
    secret: &SharedSecret,
) -> Result<String, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AuthError::UnexpectedFailure(format!("HMAC key rejected: {e}")))?;
    mac.update(url.as_bytes());
    mac.update(sealed_expiration.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Sign `url` so that the signature expires at `expires_at_ms`.
pub fn sign_url_until(
    url: &str,
    secret: &SharedSecret,
    expires_at_ms: i64,
) -> Result<SignedEnvelope, AuthError> {
    let sealed = seal_expiration(expires_at_ms, secret);
    let mac = compute_mac(url, &sealed, secret)?;
    Ok(SignedEnvelope::new(mac, sealed))
}

/// Sign `url` for a validity window starting at the clock's current time.
pub fn sign_url(
    url: &str,
    secret: &SharedSecret,
    validity: Duration,
    clock: &dyn Clock,
) -> Result<SignedEnvelope, AuthError> {
    let window = i64::try_from(validity.as_millis())
        .map_err(|_| AuthError::UnexpectedFailure("validity window too large".to_owned()))?;
    let expires_at_ms = clock
        .now_millis()
        .checked_add(window)
        .ok_or_else(|| AuthError::UnexpectedFailure("expiration overflows".to_owned()))?;
    sign_url_until(url, secret, expires_at_ms)
}
