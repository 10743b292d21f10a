//! Error types for the posgate core.

/// Core error type for posgate infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A required environment variable is not set.
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// A configuration value is present but unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for posgate core operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
