//! The gateway HTTP service implementing hyper's `Service` trait.
//!
//! [`GatewayHttpService`] runs every request through a fixed pipeline:
//!
//! 1. Health check interception (`GET /health`)
//! 2. CORS preflight (`OPTIONS` with `Origin` and `Access-Control-Request-Method`)
//! 3. Signature verification via the [`VerificationGate`]
//! 4. Resource routing via [`ResourceRoute`]
//! 5. Request body collection, capped at [`MAX_BODY_BYTES`] (only for routes
//!    that forward a body)
//! 6. Upstream passthrough via the [`Upstream`] implementation
//! 7. CORS and `x-request-id` response headers

use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cors::CorsPolicy;
use crate::gate::{VerificationGate, VerificationOutcome};
use crate::response::{
    GatewayBody, auth_error_to_response, health_response, json_error, relay, route_error_to_response,
    upstream_error_to_response,
};
use crate::router::ResourceRoute;
use crate::upstream::Upstream;

/// Header carrying the per-request id on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Largest request body read before forwarding; anything bigger is a `400`.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// The gateway HTTP service.
///
/// Cloning is cheap: the gate, CORS policy and upstream are shared.
pub struct GatewayHttpService<U: Upstream> {
    upstream: Arc<U>,
    gate: Arc<VerificationGate>,
    cors: Arc<CorsPolicy>,
}

impl<U: Upstream> GatewayHttpService<U> {
    /// Create a service from its parts.
    #[must_use]
    pub fn new(upstream: U, gate: VerificationGate, cors: CorsPolicy) -> Self {
        Self {
            upstream: Arc::new(upstream),
            gate: Arc::new(gate),
            cors: Arc::new(cors),
        }
    }

    /// Run a request through the full pipeline.
    ///
    /// Generic over the request body so it can be driven without a socket.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use bytes::Bytes;
    /// use http_body_util::Full;
    /// use posgate_auth::SharedSecret;
    /// use posgate_http::{
    ///     CorsPolicy, GatewayHttpService, PosApiClient, UpstreamCredential, VerificationGate,
    /// };
    ///
    /// # tokio_test::block_on(async {
    /// let gate = VerificationGate::new(
    ///     SharedSecret::new("shared-secret"),
    ///     UpstreamCredential::new("pos-api-key"),
    ///     "http",
    /// );
    /// let client = PosApiClient::new("http://127.0.0.1:9/", Duration::from_secs(1)).unwrap();
    /// let service = GatewayHttpService::new(client, gate, CorsPolicy::default());
    ///
    /// let unsigned = http::Request::get("/customers/5551234")
    ///     .header("host", "gateway.test")
    ///     .body(Full::new(Bytes::new()))
    ///     .unwrap();
    /// let response = service.handle(unsigned).await;
    /// assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
    /// # });
    /// ```
    pub async fn handle<B>(&self, req: Request<B>) -> Response<GatewayBody>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let request_id = Uuid::new_v4().to_string();
        let origin = self.cors.allowed_origin(req.headers());

        let mut response = self.process_request(req, &request_id).await;

        self.cors.decorate(origin, &mut response);
        add_common_headers(&mut response, &request_id);
        response
    }

    async fn process_request<B>(&self, req: Request<B>, request_id: &str) -> Response<GatewayBody>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let method = req.method().clone();
        let uri = req.uri().clone();
        debug!(%method, %uri, request_id, "processing request");

        // 1. Health check.
        if is_health_check(&method, uri.path()) {
            return health_response();
        }

        // 2. CORS preflight.
        if CorsPolicy::is_preflight(&method, req.headers()) {
            return self.cors.preflight_response(req.headers());
        }

        // 3. Signature verification.
        let (parts, body) = req.into_parts();
        let admission = match self.gate.evaluate(&parts, request_id) {
            VerificationOutcome::Admitted(admission) => admission,
            VerificationOutcome::Rejected(err) => return auth_error_to_response(&err),
        };

        // 4. Route.
        let route = match ResourceRoute::resolve(&parts.method, uri.path(), uri.query()) {
            Ok(route) => route,
            Err(err) => {
                info!(%method, path = uri.path(), error = %err, request_id, "no route for request");
                return route_error_to_response(err);
            }
        };

        // 5. Body.
        let body = if route.forwards_body() {
            match Limited::new(body, MAX_BODY_BYTES).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) if err.is::<LengthLimitError>() => {
                    warn!(limit = MAX_BODY_BYTES, request_id, "request body too large");
                    return json_error(StatusCode::BAD_REQUEST, "Invalid request body");
                }
                Err(err) => {
                    warn!(error = %err, request_id, "failed to read request body");
                    return json_error(StatusCode::BAD_REQUEST, "Invalid request body");
                }
            }
        } else {
            Bytes::new()
        };

        // 6. Upstream.
        match self
            .upstream
            .forward(route.clone(), body, admission.credential)
            .await
        {
            Ok(upstream) => {
                info!(%route, status = %upstream.status, request_id, "relayed upstream response");
                relay(upstream)
            }
            Err(err) => {
                error!(%route, error = %err, request_id, "upstream passthrough failed");
                upstream_error_to_response(&err)
            }
        }
    }
}

impl<U: Upstream> Clone for GatewayHttpService<U> {
    fn clone(&self) -> Self {
        Self {
            upstream: Arc::clone(&self.upstream),
            gate: Arc::clone(&self.gate),
            cors: Arc::clone(&self.cors),
        }
    }
}

impl<U: Upstream> std::fmt::Debug for GatewayHttpService<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayHttpService")
            .field("gate", &self.gate)
            .field("cors", &self.cors)
            .finish_non_exhaustive()
    }
}

impl<U: Upstream> Service<Request<Incoming>> for GatewayHttpService<U> {
    type Response = Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

fn is_health_check(method: &Method, path: &str) -> bool {
    *method == Method::GET && path == "/health"
}

fn add_common_headers(response: &mut Response<GatewayBody>, request_id: &str) {
    if let Ok(hv) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, hv);
    }
}
