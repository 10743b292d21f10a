//! The verification gate in front of every resource handler.
//!
//! A request enters `Unverified` and leaves either `Admitted`, carrying the
//! upstream credential, or `Rejected` with a terminal `403`. Each request is
//! verified from scratch against immutable state; nothing is cached.

use std::sync::Arc;

use http::header::HOST;
use http::request::Parts;
use posgate_auth::{AuthError, Clock, SIGNATURE_HEADER, SharedSecret, SystemClock, verify_signature};
use posgate_core::GatewayConfig;
use tracing::{debug, error, warn};

use crate::upstream::UpstreamCredential;

/// Signature gate shared by every connection.
pub struct VerificationGate {
    secret: SharedSecret,
    credential: UpstreamCredential,
    clock: Arc<dyn Clock>,
    public_scheme: String,
}

impl std::fmt::Debug for VerificationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationGate")
            .field("secret", &self.secret)
            .field("credential", &self.credential)
            .field("public_scheme", &self.public_scheme)
            .finish_non_exhaustive()
    }
}

/// A request that passed verification.
#[derive(Debug, Clone)]
pub struct Admission {
    /// Expiration carried by the accepted signature.
    pub expires_at_ms: i64,
    /// Credential to present upstream.
    pub credential: UpstreamCredential,
}

/// Outcome of running a request through the gate.
#[derive(Debug)]
pub enum VerificationOutcome {
    /// Proceed to the resource handler.
    Admitted(Admission),
    /// Stop here with a `403`.
    Rejected(AuthError),
}

impl VerificationGate {
    /// Create a gate on the system clock.
    pub fn new(
        secret: SharedSecret,
        credential: UpstreamCredential,
        public_scheme: impl Into<String>,
    ) -> Self {
        Self {
            secret,
            credential,
            clock: Arc::new(SystemClock),
            public_scheme: public_scheme.into(),
        }
    }

    /// Build a gate from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            SharedSecret::new(config.secret_key.as_str()),
            UpstreamCredential::new(config.upstream_api_key.as_str()),
            config.public_scheme.as_str(),
        )
    }

    /// Replace the clock, mainly for tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verify a request's signature against the URL it was received on.
    pub fn evaluate(&self, parts: &Parts, request_id: &str) -> VerificationOutcome {
        match self.verify(parts) {
            Ok(expires_at_ms) => {
                debug!(request_id, expires_at_ms, "signature accepted");
                VerificationOutcome::Admitted(Admission {
                    expires_at_ms,
                    credential: self.credential.clone(),
                })
            }
            Err(err) => {
                if let AuthError::UnexpectedFailure(detail) = &err {
                    error!(request_id, detail = %detail, "signature verification failed unexpectedly");
                } else {
                    warn!(request_id, reason = err.kind(), path = parts.uri.path(), "request rejected");
                }
                VerificationOutcome::Rejected(err)
            }
        }
    }

    fn verify(&self, parts: &Parts) -> Result<i64, AuthError> {
        let header = parts
            .headers
            .get(SIGNATURE_HEADER)
            .ok_or(AuthError::MissingSignature)?;
        let header = header.to_str().map_err(|_| AuthError::MalformedEnvelope)?;
        let url = observed_url(parts, &self.public_scheme).ok_or_else(|| {
            AuthError::UnexpectedFailure("request has no authority to rebuild its URL".to_owned())
        })?;

        verify_signature(header, &url, &self.secret, self.clock.as_ref())
            .map(|valid| valid.expires_at_ms)
    }
}

/// Reconstruct the full URL the client signed.
///
/// Absolute-form targets (HTTP/2, proxies) are used verbatim. Origin-form
/// targets are rebuilt as `{scheme}://{Host}{path}{?query}`.
///
/// # Examples
///
/// ```
/// use posgate_http::gate::observed_url;
///
/// let (parts, ()) = http::Request::get("/products/categories?page=2")
///     .header("host", "gateway.example.com")
///     .body(())
///     .unwrap()
///     .into_parts();
/// assert_eq!(
///     observed_url(&parts, "https").as_deref(),
///     Some("https://gateway.example.com/products/categories?page=2"),
/// );
/// ```
#[must_use]
pub fn observed_url(parts: &Parts, public_scheme: &str) -> Option<String> {
    if parts.uri.scheme().is_some() && parts.uri.authority().is_some() {
        return Some(parts.uri.to_string());
    }

    let host = parts.headers.get(HOST)?.to_str().ok()?;
    if host.is_empty() {
        return None;
    }
    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", http::uri::PathAndQuery::as_str);
    Some(format!("{public_scheme}://{host}{path_and_query}"))
}
