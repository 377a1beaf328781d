//! The remote data capability every page talks to
//!
//! Pages never hold a PostgREST client directly; they take a `&dyn Gateway`
//! so a page can be driven against any backing store.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use church_postgrest::{PostgrestClient, SortOrder};

use crate::error::{Error, Result};
use crate::models::Table;

/// A read against one table: columns, equality filters, ordering and limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    columns: String,
    filters: Vec<(String, String)>,
    order: Option<(String, SortOrder)>,
    limit: Option<u32>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }
}

impl Query {
    /// Every column of every row
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.order = Some((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn apply(&self, mut client: PostgrestClient) -> PostgrestClient {
        client = client.select(&self.columns);
        for (column, value) in &self.filters {
            client = client.eq(column, value);
        }
        if let Some((column, order)) = &self.order {
            client = client.order(column, *order);
        }
        if let Some(limit) = self.limit {
            client = client.limit(limit);
        }
        client
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Rows of `table` matching `query`, as raw JSON
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>>;

    /// Exact number of rows in `table`
    async fn count(&self, table: Table) -> Result<u64>;

    /// Append one record
    async fn insert(&self, table: Table, record: Value) -> Result<()>;
}

/// Typed read through any gateway
pub async fn fetch<T: DeserializeOwned>(
    gateway: &dyn Gateway,
    table: Table,
    query: &Query,
) -> Result<Vec<T>> {
    gateway
        .select(table, query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(Error::from))
        .collect()
}

/// Typed insert through any gateway
pub async fn insert_record<T: Serialize>(gateway: &dyn Gateway, table: Table, record: &T) -> Result<()> {
    let value = serde_json::to_value(record)?;
    gateway.insert(table, value).await
}

/// [`Gateway`] backed by the project's PostgREST endpoint
#[derive(Debug, Clone)]
pub struct PostgrestGateway {
    base_url: String,
    api_key: String,
    http_client: Client,
    access_token: Option<String>,
}

impl PostgrestGateway {
    pub fn new(base_url: &str, api_key: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client,
            access_token: None,
        }
    }

    /// Send requests as a signed-in user instead of the anonymous role
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn client(&self, table: Table) -> Result<PostgrestClient> {
        let client = PostgrestClient::new(
            &self.base_url,
            &self.api_key,
            table.as_str(),
            self.http_client.clone(),
        );
        Ok(match &self.access_token {
            Some(token) => client.with_auth(token)?,
            None => client,
        })
    }
}

#[async_trait]
impl Gateway for PostgrestGateway {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        debug!(table = table.as_str(), "select");
        let client = query.apply(self.client(table)?);
        Ok(client.execute::<Value>().await?)
    }

    async fn count(&self, table: Table) -> Result<u64> {
        debug!(table = table.as_str(), "count");
        let counted = self
            .client(table)?
            .select("id")
            .exact_count()
            .execute_with_count::<Value>()
            .await?;
        Ok(counted.count.unwrap_or(counted.rows.len() as u64))
    }

    async fn insert(&self, table: Table, record: Value) -> Result<()> {
        debug!(table = table.as_str(), "insert");
        Ok(self.client(table)?.insert_minimal(record).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Leader;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_decodes_ordered_rows() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/leaders"))
            .and(query_param("select", "*"))
            .and(query_param("order", "display_order.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "l1", "name": "Rev. Samuel", "role": "Senior Pastor", "image_url": "", "display_order": 1 }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let gateway = PostgrestGateway::new(&mock_server.uri(), "anon", Client::new());
        let leaders: Vec<Leader> = fetch(
            &gateway,
            Table::Leaders,
            &Query::all().order("display_order", SortOrder::Ascending),
        )
        .await
        .unwrap();

        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].role, "Senior Pastor");
    }

    #[tokio::test]
    async fn count_uses_content_range() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/events"))
            .and(header("Prefer", "count=exact"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Range", "0-2/3")
                    .set_body_json(json!([{ "id": "a" }, { "id": "b" }, { "id": "c" }])),
            )
            .mount(&mock_server)
            .await;

        let gateway = PostgrestGateway::new(&mock_server.uri(), "anon", Client::new());
        assert_eq!(gateway.count(Table::Events).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn signed_in_insert_carries_bearer() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/prayer_requests"))
            .and(header("Authorization", "Bearer token-1"))
            .and(body_json(json!({ "message": "Peace" })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let gateway = PostgrestGateway::new(&mock_server.uri(), "anon", Client::new())
            .with_access_token("token-1");
        gateway
            .insert(Table::PrayerRequests, json!({ "message": "Peace" }))
            .await
            .unwrap();
    }
}
