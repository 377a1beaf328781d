//! PostgREST table client for the Glorious Church site
//!
//! A small, builder-style client over the PostgREST endpoint of a Supabase
//! project. It covers exactly what the site needs from the database:
//!
//! - `select` with equality filters, ordering and limits
//! - exact row counts (`Prefer: count=exact` + `Content-Range`)
//! - append-only `insert_minimal`
//!
//! There is no update or delete path.

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_RANGE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Structured error body returned by PostgREST
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostgrestApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for PostgrestApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum PostgrestError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: PostgrestApiErrorDetails,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl PostgrestError {
    /// The message a person should see, when the server supplied one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            PostgrestError::ApiError { details, .. } => details.message.as_deref(),
            PostgrestError::UnparsedApiError { message, .. } if !message.is_empty() => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Rows returned together with the total reported by the server
#[derive(Debug, Clone, PartialEq)]
pub struct CountedRows<T> {
    pub rows: Vec<T>,
    /// `None` when the server did not report a total (`*/…` or no header).
    pub count: Option<u64>,
}

/// Extracts the total from a `Content-Range` value such as `0-24/3573` or `*/0`.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    if total == "*" {
        return None;
    }
    total.trim().parse().ok()
}

/// PostgREST client bound to one table
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    base_url: String,
    table: String,
    http_client: Client,
    headers: HeaderMap,
    query_params: HashMap<String, String>,
    exact_count: bool,
}

impl PostgrestClient {
    /// Create a client for `table` under `<base_url>/rest/v1/`
    pub fn new(base_url: &str, api_key: &str, table: &str, http_client: Client) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(api_key) {
            headers.insert("apikey", value);
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            http_client,
            headers,
            query_params: HashMap::new(),
            exact_count: false,
        }
    }

    /// Add a request header
    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, PostgrestError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header value: {}", value))
        })?;
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Send requests on behalf of a signed-in user
    pub fn with_auth(self, token: &str) -> Result<Self, PostgrestError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    /// Columns to return
    pub fn select(mut self, columns: &str) -> Self {
        self.query_params
            .insert("select".to_string(), columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("eq.{}", value));
        self
    }

    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.query_params
            .insert("order".to_string(), format!("{}.{}", column, order.as_str()));
        self
    }

    pub fn limit(mut self, count: u32) -> Self {
        self.query_params
            .insert("limit".to_string(), count.to_string());
        self
    }

    /// Ask the server to report the exact number of matching rows
    pub fn exact_count(mut self) -> Self {
        self.exact_count = true;
        self
    }

    /// Fetch matching rows
    pub async fn execute<T: for<'de> Deserialize<'de>>(&self) -> Result<Vec<T>, PostgrestError> {
        let response = self.send_get().await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
    }

    /// Fetch matching rows along with the server-reported total
    pub async fn execute_with_count<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<CountedRows<T>, PostgrestError> {
        let response = self.send_get().await?;
        let count = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let rows = response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))?;

        Ok(CountedRows { rows, count })
    }

    /// Insert without reading the row back.
    ///
    /// Anonymous writers usually cannot select what they insert (row-level
    /// security), so the server is asked for `return=minimal`.
    pub async fn insert_minimal<T: Serialize>(&self, values: T) -> Result<(), PostgrestError> {
        let url = self.build_url()?;
        let mut headers = self.headers.clone();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=minimal"),
        );
        let body = serde_json::to_vec(&values)?;

        debug!("POST {}", url);
        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(PostgrestError::NetworkError)?;

        check_status(response).await?;
        Ok(())
    }

    async fn send_get(&self) -> Result<Response, PostgrestError> {
        let url = self.build_url()?;
        let mut headers = self.headers.clone();
        if self.exact_count {
            headers.insert(
                HeaderName::from_static("prefer"),
                HeaderValue::from_static("count=exact"),
            );
        }

        debug!("GET {}", url);
        let response = self
            .http_client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(PostgrestError::NetworkError)?;

        check_status(response).await
    }

    fn build_url(&self) -> Result<String, PostgrestError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;

        for (key, value) in &self.query_params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(url.to_string())
    }
}

/// Turns a non-success response into the matching error variant
async fn check_status(response: Response) -> Result<Response, PostgrestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    warn!("PostgREST request failed with status {}", status);

    match serde_json::from_str::<PostgrestApiErrorDetails>(&error_text) {
        Ok(details) => Err(PostgrestError::ApiError { details, status }),
        Err(_) => Err(PostgrestError::UnparsedApiError {
            message: error_text,
            status,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, table: &str) -> PostgrestClient {
        PostgrestClient::new(&server.uri(), "fake-key", table, reqwest::Client::new())
    }

    #[test]
    fn content_range_totals() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn api_error_display_joins_known_parts() {
        let details = PostgrestApiErrorDetails {
            code: Some("42501".to_string()),
            message: Some("permission denied".to_string()),
            details: None,
            hint: None,
        };
        assert_eq!(
            details.to_string(),
            "Code: 42501, Message: permission denied"
        );
    }

    #[tokio::test]
    async fn test_select_with_filter_order_and_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/live_streams"))
            .and(query_param("select", "*"))
            .and(query_param("is_live", "eq.true"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("limit", "1"))
            .and(header("apikey", "fake-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "s1", "title": "Sunday Service" }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = client_for(&mock_server, "live_streams")
            .select("*")
            .eq("is_live", "true")
            .order("created_at", SortOrder::Descending)
            .limit(1)
            .execute::<Value>()
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "Sunday Service");
    }

    #[tokio::test]
    async fn test_exact_count_reads_content_range() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(query_param("select", "id"))
            .and(header("Prefer", "count=exact"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Range", "0-1/2")
                    .set_body_json(json!([{ "id": "a" }, { "id": "b" }])),
            )
            .mount(&mock_server)
            .await;

        let counted = client_for(&mock_server, "posts")
            .select("id")
            .exact_count()
            .execute_with_count::<Value>()
            .await
            .unwrap();

        assert_eq!(counted.count, Some(2));
        assert_eq!(counted.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_minimal_accepts_empty_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/donations"))
            .and(header("Prefer", "return=minimal"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!([{ "amount": 10 }])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        client_for(&mock_server, "donations")
            .insert_minimal(json!([{ "amount": 10 }]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_structured_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/ebook_orders"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": "42501",
                "message": "new row violates row-level security policy",
                "details": null,
                "hint": null
            })))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server, "ebook_orders")
            .insert_minimal(json!([{}]))
            .await
            .unwrap_err();

        match &err {
            PostgrestError::ApiError { details, status } => {
                assert_eq!(*status, StatusCode::FORBIDDEN);
                assert_eq!(details.code.as_deref(), Some("42501"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
        assert_eq!(
            err.user_message(),
            Some("new row violates row-level security policy")
        );
    }

    #[tokio::test]
    async fn test_unparsed_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/sermons"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server, "sermons")
            .select("*")
            .execute::<Value>()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PostgrestError::UnparsedApiError { status, .. } if status == StatusCode::BAD_GATEWAY
        ));
    }

    #[tokio::test]
    async fn test_with_auth_sends_bearer() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/prayer_requests"))
            .and(header("Authorization", "Bearer admin-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = client_for(&mock_server, "prayer_requests")
            .with_auth("admin-token")
            .unwrap()
            .select("*")
            .execute::<Value>()
            .await
            .unwrap();

        assert!(rows.is_empty());
    }
}
