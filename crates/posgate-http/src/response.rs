//! Response construction.
//!
//! Gateway-generated bodies are fixed strings that clients match on verbatim,
//! so every one of them is produced here.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;
use posgate_auth::AuthError;

use crate::router::RouteError;
use crate::upstream::{UpstreamError, UpstreamResponse};

/// Generic rejection message.
pub const INVALID_SIGNATURE: &str = "Invalid signature";
/// Rejection message for stale signatures.
pub const SIGNATURE_EXPIRED: &str = "Signature expired";

/// Body of every gateway response. Upstream payloads are buffered before they
/// are relayed, and an empty `Full` covers preflights.
pub type GatewayBody = Full<Bytes>;

const JSON: &str = "application/json";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Build a JSON `{"error": message}` response.
pub fn json_error(status: StatusCode, message: &str) -> Response<GatewayBody> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON)
        .body(GatewayBody::from(body))
        .expect("static error response should be valid")
}

/// Build a plain-text response.
pub fn plain_text(status: StatusCode, text: &'static str) -> Response<GatewayBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, PLAIN_TEXT)
        .body(GatewayBody::from(text))
        .expect("static text response should be valid")
}

/// Map a verification failure to its `403` response.
///
/// Missing headers and MAC mismatches share the JSON generic message, expiry
/// has its own JSON message, and everything that failed while taking the
/// envelope apart gets the plain-text generic message.
pub fn auth_error_to_response(err: &AuthError) -> Response<GatewayBody> {
    match err {
        AuthError::MissingSignature | AuthError::MacMismatch => {
            json_error(StatusCode::FORBIDDEN, INVALID_SIGNATURE)
        }
        AuthError::Expired { .. } => json_error(StatusCode::FORBIDDEN, SIGNATURE_EXPIRED),
        AuthError::MalformedEnvelope
        | AuthError::DecryptionFailure
        | AuthError::UnexpectedFailure(_) => plain_text(StatusCode::FORBIDDEN, INVALID_SIGNATURE),
    }
}

/// Map a routing failure to `404` or `405`.
pub fn route_error_to_response(err: RouteError) -> Response<GatewayBody> {
    let status = match err {
        RouteError::NotFound => StatusCode::NOT_FOUND,
        RouteError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
    };
    json_error(status, &err.to_string())
}

/// Map a passthrough failure to `400` or `502`.
pub fn upstream_error_to_response(err: &UpstreamError) -> Response<GatewayBody> {
    match err {
        UpstreamError::InvalidBody(_) => {
            json_error(StatusCode::BAD_REQUEST, "Invalid request body")
        }
        UpstreamError::Transport(_) | UpstreamError::InvalidCredential => {
            json_error(StatusCode::BAD_GATEWAY, "Upstream request failed")
        }
    }
}

/// Relay an upstream response: status, content type, and body.
pub fn relay(upstream: UpstreamResponse) -> Response<GatewayBody> {
    let mut response = Response::new(GatewayBody::new(upstream.body));
    *response.status_mut() = upstream.status;
    if let Some(content_type) = upstream.content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}

/// Liveness response served at `GET /health`.
pub fn health_response() -> Response<GatewayBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, HeaderValue::from_static(JSON))
        .body(GatewayBody::from(r#"{"status":"running"}"#))
        .expect("static health response should be valid")
}

#[cfg(test)]
mod tests {
    use http_body::Body;
    use http_body_util::BodyExt;

    use super::*;

    async fn body_text(response: Response<GatewayBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response<GatewayBody>) -> Option<&str> {
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_should_render_missing_signature_as_json() {
        let response = auth_error_to_response(&AuthError::MissingSignature);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(content_type(&response), Some(JSON));
        assert_eq!(body_text(response).await, r#"{"error":"Invalid signature"}"#);
    }

    #[tokio::test]
    async fn test_should_render_expired_as_json() {
        let response = auth_error_to_response(&AuthError::Expired { expires_at_ms: 1 });
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, r#"{"error":"Signature expired"}"#);
    }

    #[tokio::test]
    async fn test_should_render_mac_mismatch_as_json() {
        let response = auth_error_to_response(&AuthError::MacMismatch);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, r#"{"error":"Invalid signature"}"#);
    }

    #[tokio::test]
    async fn test_should_render_envelope_failures_as_plain_text() {
        for err in [
            AuthError::MalformedEnvelope,
            AuthError::DecryptionFailure,
            AuthError::UnexpectedFailure("boom".into()),
        ] {
            let response = auth_error_to_response(&err);
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{err:?}");
            assert_eq!(content_type(&response), Some(PLAIN_TEXT));
            assert_eq!(body_text(response).await, "Invalid signature");
        }
    }

    #[tokio::test]
    async fn test_should_render_route_errors() {
        let response = route_error_to_response(RouteError::NotFound);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, r#"{"error":"Not found"}"#);

        let response = route_error_to_response(RouteError::MethodNotAllowed);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_text(response).await, r#"{"error":"Method not allowed"}"#);
    }

    #[tokio::test]
    async fn test_should_render_upstream_errors() {
        let invalid = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let response = upstream_error_to_response(&UpstreamError::InvalidBody(invalid));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, r#"{"error":"Invalid request body"}"#);

        let response = upstream_error_to_response(&UpstreamError::InvalidCredential);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_text(response).await, r#"{"error":"Upstream request failed"}"#);
    }

    #[tokio::test]
    async fn test_should_relay_upstream_status_and_body() {
        let response = relay(UpstreamResponse {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            content_type: Some(HeaderValue::from_static(JSON)),
            body: Bytes::from_static(br#"{"message":"bad phone"}"#),
        });
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(content_type(&response), Some(JSON));
        assert_eq!(body_text(response).await, r#"{"message":"bad phone"}"#);
    }

    #[tokio::test]
    async fn test_should_report_running_on_health() {
        let response = health_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"status":"running"}"#);
    }

    #[test]
    fn test_should_size_gateway_bodies_exactly() {
        let response = health_response();
        assert_eq!(
            response.body().size_hint().exact(),
            Some(r#"{"status":"running"}"#.len() as u64)
        );

        let response = plain_text(StatusCode::FORBIDDEN, INVALID_SIGNATURE);
        assert_eq!(response.body().size_hint().exact(), Some(17));
    }
}
