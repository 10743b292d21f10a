//! Gateway configuration.
//!
//! Provides [`GatewayConfig`], loaded once from environment variables at process
//! start and then shared read-only. The shared signing secret and the upstream
//! credential are required; everything else has a default.

use typed_builder::TypedBuilder;

use crate::error::{GatewayError, GatewayResult};

/// Bind address used when `GATEWAY_LISTEN` is unset.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8787";

/// Immutable gateway configuration.
///
/// # Examples
///
/// ```
/// use posgate_core::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .secret_key("s3cret".into())
///     .upstream_api_key("pos-key".into())
///     .build();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8787");
/// assert_eq!(config.public_scheme, "http");
/// ```
#[derive(Clone, TypedBuilder)]
pub struct GatewayConfig {
    /// Bind address for the gateway (e.g. `"0.0.0.0:8787"`).
    #[builder(default = String::from(DEFAULT_LISTEN))]
    pub gateway_listen: String,

    /// Shared secret used to seal expirations and key the request MAC.
    pub secret_key: String,

    /// Credential sent upstream as the `Authorization` header.
    pub upstream_api_key: String,

    /// Base URL of the upstream POS API.
    #[builder(default = String::from("https://api.ewitypos.com/"))]
    pub upstream_url: String,

    /// Timeout for a single upstream request, in seconds.
    #[builder(default = 30)]
    pub upstream_timeout_secs: u64,

    /// Origins allowed to call the gateway from a browser.
    #[builder(default = vec![String::from("http://localhost:5174")])]
    pub cors_allowed_origins: Vec<String>,

    /// Scheme used to rebuild the signed URL when the request target carries none.
    #[builder(default = String::from("http"))]
    pub public_scheme: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("secret_key", &"<redacted>")
            .field("upstream_api_key", &"<redacted>")
            .field("upstream_url", &self.upstream_url)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("public_scheme", &self.public_scheme)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8787` |
    /// | `SECRET_KEY` | *(required)* |
    /// | `POS_API_KEY` | *(required)* |
    /// | `UPSTREAM_URL` | `https://api.ewitypos.com/` |
    /// | `UPSTREAM_TIMEOUT_SECS` | `30` |
    /// | `CORS_ALLOWED_ORIGINS` | `http://localhost:5174` |
    /// | `PUBLIC_SCHEME` | `http` |
    /// | `LOG_LEVEL` | `info` |
    pub fn from_env() -> GatewayResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// [`from_env`](Self::from_env) is this function over `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = required(&lookup, "SECRET_KEY")?;
        let upstream_api_key = required(&lookup, "POS_API_KEY")?;

        let mut config = Self::builder()
            .secret_key(secret_key)
            .upstream_api_key(upstream_api_key)
            .build();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("UPSTREAM_URL") {
            config.upstream_url = v;
        }
        if let Some(v) = lookup("UPSTREAM_TIMEOUT_SECS") {
            config.upstream_timeout_secs = v.trim().parse().map_err(|_| {
                GatewayError::Config(format!("UPSTREAM_TIMEOUT_SECS is not a number: {v}"))
            })?;
        }
        if let Some(v) = lookup("CORS_ALLOWED_ORIGINS") {
            config.cors_allowed_origins = parse_list(&v);
        }
        if let Some(v) = lookup("PUBLIC_SCHEME") {
            let scheme = v.trim().to_ascii_lowercase();
            if scheme != "http" && scheme != "https" {
                return Err(GatewayError::Config(format!(
                    "PUBLIC_SCHEME must be http or https, got {v}"
                )));
            }
            config.public_scheme = scheme;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }
}

/// Fetch a variable that must be present and non-empty.
fn required<F>(lookup: &F, name: &'static str) -> GatewayResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(GatewayError::MissingConfig(name)),
    }
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
