//! REST client for the hosted row-oriented database API.
//!
//! Wraps `GET/POST/PATCH/DELETE {base}/rest/v1/{table}` using [`reqwest`].
//! Writes always ask for `return=representation` so callers observe the
//! rows the backend actually stored.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use serde::de::DeserializeOwned;
use wasura_core::error::CoreError;

use crate::query::{parse_content_range_total, ListQuery};

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";
const COUNT_EXACT: &str = "count=exact";
const MERGE_DUPLICATES: &str = "return=representation,resolution=merge-duplicates";

/// HTTP client for one REST backend project.
pub struct RestApi {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum RestApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("REST API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<RestApiError> for CoreError {
    fn from(err: RestApiError) -> Self {
        match err {
            RestApiError::Request(e) => CoreError::network(e.to_string()),
            RestApiError::ApiError { status, body } => {
                let detail = serde_json::from_str::<serde_json::Value>(&body).ok();
                let message = detail
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or(body);
                CoreError::Transport {
                    status: Some(status),
                    message,
                    detail,
                }
            }
        }
    }
}

/// A page of rows plus the backend's total when it was requested.
#[derive(Debug)]
pub struct Rows<T> {
    pub rows: Vec<T>,
    pub total: Option<u64>,
}

impl RestApi {
    /// Create a client for a backend project.
    ///
    /// * `project_url` - e.g. `https://xyz.supabase.co`.
    /// * `anon_key`    - public key sent as `apikey` and bearer token.
    pub fn new(project_url: &str, anon_key: String) -> Self {
        Self::with_client(reqwest::Client::new(), project_url, anon_key)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (shared pool and timeout settings).
    pub fn with_client(client: reqwest::Client, project_url: &str, anon_key: String) -> Self {
        Self {
            client,
            base_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            anon_key,
        }
    }

    /// Table endpoint, e.g. `https://xyz.supabase.co/rest/v1/faq_items`.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    /// `GET` rows matching `query`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &ListQuery,
    ) -> Result<Rows<T>, RestApiError> {
        let mut request = self
            .client
            .get(self.table_url(table))
            .headers(self.auth_headers())
            .query(&query.to_pairs());
        if query.wants_count() {
            request = request.header(PREFER, COUNT_EXACT);
        }

        let response = Self::ensure_success(request.send().await?).await?;
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let rows = response.json::<Vec<T>>().await?;

        tracing::debug!(table, count = rows.len(), ?total, "Selected rows");
        Ok(Rows { rows, total })
    }

    /// `POST` one or more rows and return what was stored.
    pub async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &serde_json::Value,
    ) -> Result<Vec<T>, RestApiError> {
        let response = self
            .client
            .post(self.table_url(table))
            .headers(self.auth_headers())
            .header(PREFER, RETURN_REPRESENTATION)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `POST` rows with merge-on-conflict over the `on_conflict` columns.
    pub async fn upsert<T: DeserializeOwned>(
        &self,
        table: &str,
        on_conflict: &str,
        rows: &serde_json::Value,
    ) -> Result<Vec<T>, RestApiError> {
        let response = self
            .client
            .post(self.table_url(table))
            .headers(self.auth_headers())
            .header(PREFER, MERGE_DUPLICATES)
            .query(&[("on_conflict", on_conflict)])
            .json(rows)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `PATCH` the rows matched by `filter`. An empty result means nothing
    /// matched.
    pub async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<Vec<T>, RestApiError> {
        let response = self
            .client
            .patch(self.table_url(table))
            .headers(self.auth_headers())
            .header(PREFER, RETURN_REPRESENTATION)
            .query(filter)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `DELETE` the rows matched by `filter`, returning the deleted rows.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &[(String, String)],
    ) -> Result<Vec<T>, RestApiError> {
        let response = self
            .client
            .delete(self.table_url(table))
            .headers(self.auth_headers())
            .header(PREFER, RETURN_REPRESENTATION)
            .query(filter)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(key) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.anon_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`RestApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RestApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RestApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RestApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
