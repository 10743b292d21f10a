//! Time-boxed HMAC request signatures for posgate.
//!
//! A caller holding the shared secret signs a request URL by sealing an
//! expiration timestamp with AES and computing an HMAC-SHA256 over the URL
//! followed by the sealed text. The result travels in the `x-signature`
//! header as `<mac>.<sealed>`:
//!
//! ```text
//! sealed = Base64("Salted__" || salt || AES-256-CBC(expires_at_ms))
//! mac    = hex(HMAC-SHA256(secret, url || sealed))
//! header = mac "." sealed
//! ```
//!
//! Verification is stateless: decrypt the expiration, reject if it has
//! passed, then recompute the MAC and compare in constant time. No nonce or
//! signature history is kept, so a captured header can be replayed against
//! the same URL until it expires.
//!
//! # Usage
//!
//! ```rust
//! use posgate_auth::{FixedClock, SharedSecret, sign_url_until, verify_signature};
//!
//! let secret = SharedSecret::new("shared-secret");
//! let url = "https://gateway.example.com/products/42";
//!
//! let envelope = sign_url_until(url, &secret, 1_700_000_060_000).unwrap();
//! let header = envelope.to_string();
//!
//! let valid = verify_signature(&header, url, &secret, &FixedClock::new(1_700_000_000_000)).unwrap();
//! assert_eq!(valid.expires_at_ms, 1_700_000_060_000);
//! ```
//!
//! # Modules
//!
//! - [`clock`] - Wall-clock abstraction used for expiry checks
//! - [`envelope`] - The two-field `x-signature` wire value
//! - [`error`] - Verification error kinds
//! - [`seal`] - Passphrase-based AES sealing of the expiration
//! - [`secret`] - The shared secret
//! - [`signer`] - Producing envelopes (client side)
//! - [`verify`] - Checking envelopes (gateway side)

pub mod clock;
pub mod envelope;
pub mod error;
pub mod seal;
pub mod secret;
pub mod signer;
pub mod verify;

pub use clock::{Clock, FixedClock, SystemClock};
pub use envelope::{SIGNATURE_HEADER, SignedEnvelope};
pub use error::AuthError;
pub use secret::SharedSecret;
pub use signer::{compute_mac, sign_url, sign_url_until};
pub use verify::{ValidSignature, verify_envelope, verify_signature};
