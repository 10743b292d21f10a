//! Passthrough to the upstream POS REST API.
//!
//! [`Upstream`] is the boundary between the HTTP pipeline and the outbound
//! client, so the pipeline can be exercised against a recording stub.
//! [`PosApiClient`] is the production implementation on `reqwest`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::router::{ResourceRoute, quotation_lines_path};

/// Boxed future returned by [`Upstream::forward`].
pub type UpstreamFuture =
    Pin<Box<dyn Future<Output = Result<UpstreamResponse, UpstreamError>> + Send>>;

/// Credential attached as the `Authorization` header of every upstream call.
#[derive(Clone)]
pub struct UpstreamCredential(Arc<str>);

impl UpstreamCredential {
    /// Wrap the raw credential.
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    /// The credential as a sensitive header value.
    pub fn header_value(&self) -> Result<HeaderValue, UpstreamError> {
        let mut value =
            HeaderValue::from_str(&self.0).map_err(|_| UpstreamError::InvalidCredential)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for UpstreamCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UpstreamCredential(<redacted>)")
    }
}

/// A buffered upstream response, relayed as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// Upstream status code.
    pub status: StatusCode,
    /// Upstream `Content-Type`, if any.
    pub content_type: Option<HeaderValue>,
    /// Upstream body.
    pub body: Bytes,
}

/// Errors from the passthrough.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The upstream could not be reached or did not answer in time.
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The inbound body needed to build the upstream call is not JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    /// The upstream credential cannot be sent as a header.
    #[error("upstream credential is not a valid header value")]
    InvalidCredential,
}

/// Outbound side of the gateway.
pub trait Upstream: Send + Sync + 'static {
    /// Perform the upstream call(s) for `route` and return the response to relay.
    fn forward(
        &self,
        route: ResourceRoute,
        body: Bytes,
        credential: UpstreamCredential,
    ) -> UpstreamFuture;
}

/// `reqwest` client for the POS API.
#[derive(Debug, Clone)]
pub struct PosApiClient {
    client: reqwest::Client,
    base_url: Arc<str>,
}

impl PosApiClient {
    /// Build a client for `base_url` with a per-request timeout.
    ///
    /// A trailing `/` is appended to `base_url` when missing.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Base URL upstream paths are appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
        credential: &UpstreamCredential,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "calling upstream");

        let mut request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, credential.header_value()?)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.inspect_err(|e| {
            warn!(%url, error = %e, "upstream request failed");
        })?;
        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await?;
        debug!(%url, %status, bytes = body.len(), "upstream responded");

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }

    /// Create a quotation, then attach its lines.
    ///
    /// When the creation response carries no `data.id` there is nothing to
    /// attach lines to, and the creation response is returned instead.
    async fn create_quotation(
        &self,
        body: Bytes,
        credential: &UpstreamCredential,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let request: Value = serde_json::from_slice(&body)?;
        let (header, lines) = split_quotation(&request);

        let created = self
            .send(
                Method::POST,
                &ResourceRoute::CreateQuotation.upstream_path(),
                Some(header),
                credential,
            )
            .await?;

        let Some(id) = quotation_id(&created.body) else {
            warn!(status = %created.status, "quotation created without an id, skipping lines");
            return Ok(created);
        };
        debug!(quotation_id = %id, "attaching quotation lines");

        self.send(
            Method::POST,
            &quotation_lines_path(&id),
            Some(lines),
            credential,
        )
        .await
    }
}

impl Upstream for PosApiClient {
    fn forward(
        &self,
        route: ResourceRoute,
        body: Bytes,
        credential: UpstreamCredential,
    ) -> UpstreamFuture {
        let client = self.clone();
        Box::pin(async move {
            match route {
                ResourceRoute::CreateQuotation => client.create_quotation(body, &credential).await,
                route => {
                    let body = route.forwards_body().then_some(body);
                    client
                        .send(route.method(), &route.upstream_path(), body, &credential)
                        .await
                }
            }
        })
    }
}

/// Split an inbound quotation into the creation payload and the lines payload.
///
/// Absent fields are left out rather than sent as `null`.
fn split_quotation(request: &Value) -> (Bytes, Bytes) {
    let pick = |keys: &[&str]| {
        let mut out = Map::new();
        for key in keys {
            if let Some(value) = request.get(*key) {
                out.insert((*key).to_owned(), value.clone());
            }
        }
        Bytes::from(Value::Object(out).to_string())
    };
    (pick(&["location_id", "customer_id"]), pick(&["lines"]))
}

/// Extract `data.id` from a quotation creation response.
fn quotation_id(body: &[u8]) -> Option<String> {
    let created: Value = serde_json::from_slice(body).ok()?;
    match created.get("data")?.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
