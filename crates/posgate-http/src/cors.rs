//! Cross-origin resource sharing for browser clients.
//!
//! Origins are matched exactly against the configured allow-list. Preflights
//! are answered before signature verification since browsers never attach
//! custom headers to them.

use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};

use crate::response::GatewayBody;

const ALLOWED_METHODS: &str = "GET,HEAD,PUT,POST,DELETE,PATCH";

/// Exact-match CORS allow-list.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    /// Create a policy allowing the given origins.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: origins.into_iter().map(Into::into).collect(),
        }
    }

    /// The request's `Origin` if it is on the allow-list.
    #[must_use]
    pub fn allowed_origin(&self, headers: &HeaderMap) -> Option<HeaderValue> {
        let origin = headers.get(ORIGIN)?;
        let text = origin.to_str().ok()?;
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == text)
            .then(|| origin.clone())
    }

    /// Whether a request is a CORS preflight.
    #[must_use]
    pub fn is_preflight(method: &Method, headers: &HeaderMap) -> bool {
        *method == Method::OPTIONS
            && headers.contains_key(ORIGIN)
            && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
    }

    /// Answer a preflight.
    ///
    /// Origins not on the list still get a `204`, just without an
    /// `Access-Control-Allow-Origin`, so the browser blocks the real request.
    pub fn preflight_response(&self, headers: &HeaderMap) -> Response<GatewayBody> {
        let mut response = Response::new(GatewayBody::default());
        *response.status_mut() = StatusCode::NO_CONTENT;

        let out = response.headers_mut();
        if let Some(origin) = self.allowed_origin(headers) {
            out.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        out.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        if let Some(requested) = headers.get(ACCESS_CONTROL_REQUEST_HEADERS) {
            out.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
        out.insert(VARY, HeaderValue::from_static("Origin"));
        response
    }

    /// Add CORS headers to a non-preflight response.
    pub fn decorate(&self, origin: Option<HeaderValue>, response: &mut Response<GatewayBody>) {
        if let Some(origin) = origin {
            let headers = response.headers_mut();
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            headers.insert(VARY, HeaderValue::from_static("Origin"));
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body::Body;

    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(["http://localhost:5174"])
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_should_match_origin_exactly() {
        let policy = policy();
        assert!(
            policy
                .allowed_origin(&headers(&[("origin", "http://localhost:5174")]))
                .is_some()
        );
        for origin in ["http://localhost:5175", "http://localhost:5174/", "https://localhost:5174"] {
            let map = {
                let mut m = HeaderMap::new();
                m.insert(ORIGIN, HeaderValue::from_str(origin).unwrap());
                m
            };
            assert!(policy.allowed_origin(&map).is_none(), "{origin}");
        }
        assert!(policy.allowed_origin(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_should_detect_preflight() {
        let preflight = headers(&[
            ("origin", "http://localhost:5174"),
            ("access-control-request-method", "GET"),
        ]);
        assert!(CorsPolicy::is_preflight(&Method::OPTIONS, &preflight));
        assert!(!CorsPolicy::is_preflight(&Method::GET, &preflight));
        assert!(!CorsPolicy::is_preflight(
            &Method::OPTIONS,
            &headers(&[("origin", "http://localhost:5174")])
        ));
    }

    #[test]
    fn test_should_answer_allowed_preflight() {
        let response = policy().preflight_response(&headers(&[
            ("origin", "http://localhost:5174"),
            ("access-control-request-method", "GET"),
            ("access-control-request-headers", "x-signature"),
        ]));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let h = response.headers();
        assert_eq!(h[ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5174");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
        assert_eq!(h[ACCESS_CONTROL_ALLOW_HEADERS], "x-signature");
        assert_eq!(h[VARY], "Origin");
    }

    #[test]
    fn test_should_withhold_origin_for_unlisted_preflight() {
        let response = policy().preflight_response(&headers(&[
            ("origin", "http://evil.example"),
            ("access-control-request-method", "GET"),
        ]));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[test]
    fn test_should_decorate_only_allowed_origins() {
        let mut response = Response::new(GatewayBody::default());
        policy().decorate(None, &mut response);
        assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));

        policy().decorate(
            Some(HeaderValue::from_static("http://localhost:5174")),
            &mut response,
        );
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5174"
        );
    }

    #[test]
    fn test_should_answer_preflight_with_empty_body() {
        let response = policy().preflight_response(&headers(&[
            ("origin", "http://localhost:5174"),
            ("access-control-request-method", "POST"),
        ]));
        assert!(response.body().is_end_stream());
        assert_eq!(response.body().size_hint().exact(), Some(0));
    }
}
