//! HTTP client for Meilisearch-compatible engines.

use super::{
    Document, DocumentsPage, DocumentsQuery, EnqueuedTask, IndexInfo, SearchClient, Settings, Task,
};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Error body returned by the engine on non-success statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// REST client for a single engine instance.
pub struct HttpClient {
    /// Base URL without trailing slash.
    base_url: String,
    /// API key sent as a bearer token.
    api_key: Option<SecretString>,
    /// HTTP client with connection pooling.
    client: reqwest::Client,
}

impl HttpClient {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a client for the engine at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            client: build_http_client(Self::DEFAULT_TIMEOUT),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    /// Sends a request and decodes the JSON response.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::operation(operation, format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, code) = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(parsed) => (parsed.message, parsed.code),
                Err(_) if body.is_empty() => (status.to_string(), None),
                Err(_) => (body, None),
            };
            tracing::warn!(operation, status = status.as_u16(), code = ?code, "engine rejected request");
            return Err(Error::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        metrics::counter!("engine_requests_total", "operation" => operation.to_string())
            .increment(1);

        response
            .json::<T>()
            .await
            .map_err(|e| Error::operation(operation, format!("invalid response body: {e}")))
    }
}

/// Builds an async HTTP client with the given timeout.
fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(format!("Searchdeck/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("Failed to build HTTP client: {err}");
            reqwest::Client::new()
        })
}

impl SearchClient for HttpClient {
    #[tracing::instrument(skip(self, query), fields(offset = query.offset, limit = query.limit))]
    async fn get_documents(&self, index_uid: &str, query: &DocumentsQuery) -> Result<DocumentsPage> {
        let request = self
            .client
            .post(self.url(&format!("/indexes/{index_uid}/documents/fetch")))
            .json(query);
        self.send(request, "get_documents").await
    }

    #[tracing::instrument(skip(self, documents), fields(count = documents.len()))]
    async fn add_documents(
        &self,
        index_uid: &str,
        documents: &[Document],
        primary_key: Option<&str>,
    ) -> Result<EnqueuedTask> {
        let mut request = self
            .client
            .post(self.url(&format!("/indexes/{index_uid}/documents")))
            .json(documents);
        if let Some(primary_key) = primary_key {
            request = request.query(&[("primaryKey", primary_key)]);
        }
        self.send(request, "add_documents").await
    }

    async fn get_task(&self, task_uid: u64) -> Result<Task> {
        let request = self.client.get(self.url(&format!("/tasks/{task_uid}")));
        self.send(request, "get_task").await
    }

    async fn get_index(&self, index_uid: &str) -> Result<IndexInfo> {
        let request = self.client.get(self.url(&format!("/indexes/{index_uid}")));
        self.send(request, "get_index").await
    }

    #[tracing::instrument(skip(self))]
    async fn create_index(&self, index_uid: &str, primary_key: Option<&str>) -> Result<EnqueuedTask> {
        let body = serde_json::json!({ "uid": index_uid, "primaryKey": primary_key });
        let request = self.client.post(self.url("/indexes")).json(&body);
        self.send(request, "create_index").await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_index(&self, index_uid: &str) -> Result<EnqueuedTask> {
        let request = self.client.delete(self.url(&format!("/indexes/{index_uid}")));
        self.send(request, "delete_index").await
    }

    #[tracing::instrument(skip(self))]
    async fn swap_indexes(&self, first: &str, second: &str) -> Result<EnqueuedTask> {
        let body = serde_json::json!([{ "indexes": [first, second] }]);
        let request = self.client.post(self.url("/swap-indexes")).json(&body);
        self.send(request, "swap_indexes").await
    }

    async fn get_settings(&self, index_uid: &str) -> Result<Settings> {
        let request = self
            .client
            .get(self.url(&format!("/indexes/{index_uid}/settings")));
        self.send(request, "get_settings").await
    }

    #[tracing::instrument(skip(self, settings))]
    async fn update_settings(&self, index_uid: &str, settings: &Settings) -> Result<EnqueuedTask> {
        let request = self
            .client
            .patch(self.url(&format!("/indexes/{index_uid}/settings")))
            .json(settings);
        self.send(request, "update_settings").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = HttpClient::new("http://localhost:7700/");
        assert_eq!(client.base_url(), "http://localhost:7700");
        assert_eq!(client.url("/tasks/1"), "http://localhost:7700/tasks/1");
    }

    #[test]
    fn test_api_error_body_parses() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"message":"Index `x` not found.","code":"index_not_found","type":"invalid_request","link":"https://docs"}"#,
        )
        .unwrap();
        assert_eq!(body.code.as_deref(), Some("index_not_found"));
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_operation_failure() {
        let client = HttpClient::new("http://127.0.0.1:1").with_timeout(Duration::from_millis(200));

        let err = client.get_task(1).await.unwrap_err();

        assert!(matches!(err, Error::OperationFailed { ref operation, .. } if operation == "get_task"));
    }
}
