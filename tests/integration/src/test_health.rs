//! Health endpoint integration tests.

#[cfg(test)]
mod tests {
    use crate::{client, url_for};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_running_without_signature() {
        let resp = client()
            .get(url_for("/health"))
            .send()
            .await
            .expect("health request");

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
        let body: serde_json::Value = resp.json().await.expect("json body");
        assert_eq!(body, serde_json::json!({"status": "running"}));
    }
}
