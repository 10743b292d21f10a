//! Configuration and shared error types for posgate.
//!
//! This crate holds the pieces every other posgate crate agrees on: the
//! immutable [`GatewayConfig`] built once at process start, and the
//! [`GatewayError`] used for startup and configuration failures.

mod config;
mod error;

pub use config::{DEFAULT_LISTEN, GatewayConfig};
pub use error::{GatewayError, GatewayResult};
