//! Integration tests for the posgate server.
//!
//! These tests require a running gateway at `localhost:8787` (override with
//! `GATEWAY_URL`) started with the same `SECRET_KEY` exported to the test
//! process. They are marked `#[ignore]` so they don't run during normal
//! `cargo test`.
//!
//! Run them with:
//! ```text
//! SECRET_KEY=... cargo test -p posgate-integration -- --ignored
//! ```

use std::sync::Once;
use std::time::Duration;

use posgate_auth::{SharedSecret, SystemClock, sign_url, sign_url_until};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Base URL of the gateway under test, without a trailing slash.
#[must_use]
pub fn gateway_url() -> String {
    std::env::var("GATEWAY_URL")
        .unwrap_or_else(|_| "http://localhost:8787".to_owned())
        .trim_end_matches('/')
        .to_owned()
}

/// Full URL for `path_and_query` on the gateway.
#[must_use]
pub fn url_for(path_and_query: &str) -> String {
    format!("{}{path_and_query}", gateway_url())
}

/// The secret the gateway was started with.
#[must_use]
pub fn shared_secret() -> SharedSecret {
    SharedSecret::new(std::env::var("SECRET_KEY").unwrap_or_else(|_| "test-secret".to_owned()))
}

/// HTTP client for talking to the gateway.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("build reqwest client")
}

/// Sign `url` for the next `validity`.
#[must_use]
pub fn sign(url: &str, validity: Duration) -> String {
    sign_url(url, &shared_secret(), validity, &SystemClock)
        .expect("sign url")
        .to_string()
}

/// Sign `url` with an expiration that has already passed.
#[must_use]
pub fn sign_expired(url: &str) -> String {
    sign_url_until(url, &shared_secret(), 1).expect("sign url").to_string()
}

mod test_cors;
mod test_health;
mod test_signature;
