//! HTTP layer of the posgate signature gateway.
//!
//! - **Gate** ([`gate`]): verifies the `x-signature` header of every request
//!   against the URL it arrived on and either admits it with the upstream
//!   credential or rejects it with a `403`.
//! - **Router** ([`router`]): maps admitted requests to POS API resources.
//! - **Upstream** ([`upstream`]): the [`Upstream`](upstream::Upstream) trait and
//!   its `reqwest` implementation.
//! - **CORS** ([`cors`]): exact-match origin allow-list and preflight handling.
//! - **Service** ([`service`]): [`GatewayHttpService`](service::GatewayHttpService),
//!   the hyper `Service` tying it all together.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> GatewayHttpService (hyper Service)
//!     -> Health check / CORS preflight
//!     -> VerificationGate (403 on any failure)
//!     -> ResourceRoute (404 / 405)
//!     -> Upstream (reqwest, 502 on transport failure)
//!     -> CORS + x-request-id headers
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use posgate_auth::SharedSecret;
//! use posgate_http::cors::CorsPolicy;
//! use posgate_http::gate::VerificationGate;
//! use posgate_http::service::GatewayHttpService;
//! use posgate_http::upstream::{PosApiClient, UpstreamCredential};
//!
//! let gate = VerificationGate::new(
//!     SharedSecret::new("shared-secret"),
//!     UpstreamCredential::new("pos-api-key"),
//!     "https",
//! );
//! let client = PosApiClient::new("https://api.ewitypos.com/", Duration::from_secs(30)).unwrap();
//! let service = GatewayHttpService::new(client, gate, CorsPolicy::new(["http://localhost:5174"]));
//! // Use `service` with a hyper server.
//! ```

pub mod cors;
pub mod gate;
pub mod response;
pub mod router;
pub mod service;
pub mod upstream;

pub use cors::CorsPolicy;
pub use gate::{Admission, VerificationGate, VerificationOutcome};
pub use response::GatewayBody;
pub use router::{ResourceRoute, RouteError};
pub use service::GatewayHttpService;
pub use upstream::{PosApiClient, Upstream, UpstreamCredential, UpstreamError, UpstreamResponse};
