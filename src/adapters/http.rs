use crate::domain::ports::GuestListProvider;
use crate::utils::error::LoadError;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Fetches the invitation list from a spreadsheet-to-JSON proxy such as
/// opensheet. The endpoint must answer a GET with a JSON array.
#[derive(Debug, Clone)]
pub struct SheetListProvider {
    endpoint: String,
    headers: HashMap<String, String>,
    request_timeout: Option<Duration>,
    client: Client,
}

impl SheetListProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: HashMap::new(),
            request_timeout: None,
            client: Client::new(),
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GuestListProvider for SheetListProvider {
    async fn fetch_records(&self) -> Result<serde_json::Value, LoadError> {
        tracing::debug!("Fetching guest list from: {}", self.endpoint);

        let mut request = self.client.get(&self.endpoint);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LoadError::Unreachable(e.to_string()))?;

        let status = response.status();
        tracing::debug!("Guest list response status: {}", status);
        if !status.is_success() {
            return Err(LoadError::Unreachable(format!(
                "provider answered with HTTP {}",
                status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LoadError::Unreachable(e.to_string()))?;

        serde_json::from_slice(&body)
            .map_err(|e| LoadError::BadFormat(format!("response is not JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_records_returns_raw_json() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/sheet");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([{"Nama": "Alice"}]));
        });

        let provider = SheetListProvider::new(server.url("/sheet"));
        let records = provider.fetch_records().await.unwrap();

        api_mock.assert();
        assert_eq!(records, serde_json::json!([{"Nama": "Alice"}]));
    }

    #[tokio::test]
    async fn test_non_success_status_is_unreachable() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/sheet");
            then.status(503);
        });

        let provider = SheetListProvider::new(server.url("/sheet"));
        let err = provider.fetch_records().await.unwrap_err();

        api_mock.assert();
        assert!(matches!(err, LoadError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // 連接埠 1 沒有服務在聽
        let provider = SheetListProvider::new("http://127.0.0.1:1/sheet")
            .with_request_timeout(Duration::from_secs(5));
        let err = provider.fetch_records().await.unwrap_err();

        assert!(matches!(err, LoadError::Unreachable(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_html_body_is_bad_format() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/sheet");
            then.status(200).body("<html>not json</html>");
        });

        let provider = SheetListProvider::new(server.url("/sheet"));
        let err = provider.fetch_records().await.unwrap_err();
        assert!(matches!(err, LoadError::BadFormat(_)));
    }

    #[tokio::test]
    async fn test_sends_configured_headers() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/sheet").header("X-Api-Key", "secret");
            then.status(200).json_body(serde_json::json!([]));
        });

        let mut headers = HashMap::new();
        headers.insert("X-Api-Key".to_string(), "secret".to_string());
        let provider = SheetListProvider::new(server.url("/sheet")).with_headers(headers);

        provider.fetch_records().await.unwrap();
        api_mock.assert();
    }
}
