//! CORS integration tests.

#[cfg(test)]
mod tests {
    use crate::{client, url_for};

    const ALLOWED_ORIGIN: &str = "http://localhost:5174";

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_answer_preflight_for_allowed_origin() {
        let resp = client()
            .request(reqwest::Method::OPTIONS, url_for("/customers/5551234"))
            .header("origin", ALLOWED_ORIGIN)
            .header("access-control-request-method", "GET")
            .header("access-control-request-headers", "x-signature")
            .send()
            .await
            .expect("preflight request");

        assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some(ALLOWED_ORIGIN)
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_expose_rejections_to_allowed_origin() {
        let resp = client()
            .get(url_for("/customers/5551234"))
            .header("origin", ALLOWED_ORIGIN)
            .send()
            .await
            .expect("unsigned request");

        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_not_allow_unlisted_origin() {
        let resp = client()
            .get(url_for("/customers/5551234"))
            .header("origin", "http://evil.example")
            .send()
            .await
            .expect("unsigned request");

        assert!(!resp.headers().contains_key("access-control-allow-origin"));
    }
}
