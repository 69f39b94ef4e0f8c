//! Thin PostgREST client for the hosted record store.
//!
//! Only what the app needs: `eq` filters, ordering, limits, single and
//! maybe-single reads, insert, upsert, update and delete. Every request
//! carries the anon key plus the signed-in user's access token so row-level
//! security applies server-side.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::config::BackendConfig;
use crate::error::{CkStyleError, Result};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
}

impl RestClient {
    pub fn new(config: &BackendConfig, http: reqwest::Client) -> Result<Self> {
        let (_, anon_key) = config.endpoint()?;
        Ok(Self {
            http,
            base: config.service_url("rest/v1/")?,
            anon_key: anon_key.to_string(),
        })
    }

    pub fn from(&self, table: &str) -> TableQuery<'_> {
        TableQuery::new(self, table)
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        self.base
            .join(table)
            .map_err(|e| CkStyleError::Config(format!("Bad table name '{}': {}", table, e)))
    }
}

/// A request against one table, built up fluently and sent by one of the
/// terminal methods (`fetch`, `single`, `insert`, ...).
pub struct TableQuery<'a> {
    client: &'a RestClient,
    table: String,
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
    on_conflict: Option<String>,
    access_token: Option<String>,
}

impl<'a> TableQuery<'a> {
    fn new(client: &'a RestClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            on_conflict: None,
            access_token: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.split_whitespace().collect::<Vec<_>>().join(""));
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{}.{}", column, dir));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.on_conflict = Some(columns.to_string());
        self
    }

    /// Act as the given user. Without a token the anon key is used.
    pub fn auth(mut self, access_token: Option<&str>) -> Self {
        self.access_token = access_token.map(str::to_string);
        self
    }

    /// Query-string pairs in the order PostgREST will see them.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(select) = &self.select {
            pairs.push(("select".to_string(), select.clone()));
        }
        pairs.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            pairs.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(on_conflict) = &self.on_conflict {
            pairs.push(("on_conflict".to_string(), on_conflict.clone()));
        }
        pairs
    }

    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let response = self.send(Method::GET, false, None::<&()>).await?;
        decode(response).await
    }

    /// Exactly one row; zero or several rows is an error from the server.
    pub async fn single<T: DeserializeOwned>(self) -> Result<T> {
        let response = self
            .send(Method::GET, true, None::<&()>)
            .await?;
        decode(response).await
    }

    /// Zero or one row.
    pub async fn maybe_single<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let table = self.table.clone();
        let mut rows: Vec<T> = self.fetch().await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(CkStyleError::Store(format!(
                "Expected at most one row from {}, got {}",
                table, n
            ))),
        }
    }

    /// Insert and return the created rows.
    pub async fn insert<B, T>(self, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .with_prefer("return=representation")
            .send(Method::POST, false, Some(body))
            .await?;
        decode(response).await
    }

    pub async fn insert_silent<B: Serialize + ?Sized>(self, body: &B) -> Result<()> {
        self.with_prefer("return=minimal")
            .send(Method::POST, false, Some(body))
            .await
            .map(|_| ())
    }

    pub async fn upsert<B: Serialize + ?Sized>(self, body: &B) -> Result<()> {
        self.with_prefer("resolution=merge-duplicates,return=minimal")
            .send(Method::POST, false, Some(body))
            .await
            .map(|_| ())
    }

    pub async fn update<B: Serialize + ?Sized>(self, patch: &B) -> Result<()> {
        self.with_prefer("return=minimal")
            .send(Method::PATCH, false, Some(patch))
            .await
            .map(|_| ())
    }

    pub async fn delete(self) -> Result<()> {
        self.with_prefer("return=minimal")
            .send(Method::DELETE, false, None::<&()>)
            .await
            .map(|_| ())
    }

    fn with_prefer(self, prefer: &str) -> PreferQuery<'a> {
        PreferQuery {
            query: self,
            prefer: prefer.to_string(),
        }
    }

    fn request(&self, method: Method, single: bool) -> Result<RequestBuilder> {
        let url = self.client.table_url(&self.table)?;
        let bearer = self
            .access_token
            .as_deref()
            .unwrap_or(&self.client.anon_key);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.client.anon_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);
        if single {
            headers.insert(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT));
        }

        Ok(self
            .client
            .http
            .request(method, url)
            .headers(headers)
            .query(&self.query_pairs()))
    }

    async fn send<B: Serialize + ?Sized>(
        self,
        method: Method,
        single: bool,
        body: Option<&B>,
    ) -> Result<Response> {
        let mut request = self.request(method.clone(), single)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        execute(&self.table, &method, request).await
    }
}

/// A write request with a `Prefer` header attached.
struct PreferQuery<'a> {
    query: TableQuery<'a>,
    prefer: String,
}

impl PreferQuery<'_> {
    async fn send<B: Serialize + ?Sized>(
        self,
        method: Method,
        single: bool,
        body: Option<&B>,
    ) -> Result<Response> {
        let mut request = self
            .query
            .request(method.clone(), single)?
            .header("Prefer", header_value(&self.prefer)?);
        if let Some(body) = body {
            request = request.json(body);
        }
        execute(&self.query.table, &method, request).await
    }
}

async fn execute(table: &str, method: &Method, request: RequestBuilder) -> Result<Response> {
    info!("Record store {} {}", method, table);
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = store_error_message(status, &body);
    warn!("Record store {} {} failed ({}): {}", method, table, status, message);
    Err(CkStyleError::Store(message))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CkStyleError::Store(format!("Unexpected response from record store: {}", e)))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| CkStyleError::Config(format!("Invalid header value: {}", e)))
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// The server's own message when it sent one, else the HTTP status.
pub fn store_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(PostgrestError {
            message: Some(message),
            ..
        }) if !message.is_empty() => message,
        Ok(PostgrestError {
            details: Some(details),
            ..
        }) if !details.is_empty() => details,
        Ok(PostgrestError { hint: Some(hint), .. }) if !hint.is_empty() => hint,
        _ => format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_URL};
    use reqwest::StatusCode;

    fn client() -> RestClient {
        let config = BackendConfig::from_lookup(|k| match k {
            ENV_SUPABASE_URL => Some("https://demo.supabase.co".to_string()),
            ENV_SUPABASE_ANON_KEY => Some("anon-key".to_string()),
            _ => None,
        });
        RestClient::new(&config, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn test_query_pairs_for_filtered_select() {
        let client = client();
        let query = client
            .from("notifications")
            .select("*")
            .eq("user_id", "u-1")
            .eq("is_read", false)
            .order("created_at", false)
            .limit(1);

        assert_eq!(
            query.query_pairs(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("user_id".to_string(), "eq.u-1".to_string()),
                ("is_read".to_string(), "eq.false".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_strips_whitespace() {
        let client = client();
        let query = client.from("collections").select("*, collection_images(image_url)");
        assert_eq!(
            query.query_pairs()[0].1,
            "*,collection_images(image_url)".to_string()
        );
    }

    #[test]
    fn test_upsert_carries_conflict_target() {
        let client = client();
        let query = client.from("profiles").on_conflict("id");
        assert_eq!(
            query.query_pairs(),
            vec![("on_conflict".to_string(), "id".to_string())]
        );
    }

    #[test]
    fn test_table_url() {
        let client = client();
        assert_eq!(
            client.table_url("measurement_items").unwrap().as_str(),
            "https://demo.supabase.co/rest/v1/measurement_items"
        );
    }

    #[test]
    fn test_store_error_message_prefers_server_message() {
        let body = r#"{"code":"23505","details":"Key exists","hint":null,"message":"duplicate key value violates unique constraint"}"#;
        assert_eq!(
            store_error_message(StatusCode::CONFLICT, body),
            "duplicate key value violates unique constraint"
        );
    }

    #[test]
    fn test_store_error_message_falls_back_to_status() {
        assert_eq!(
            store_error_message(StatusCode::FORBIDDEN, "not json"),
            "403 Forbidden"
        );
        assert_eq!(
            store_error_message(StatusCode::BAD_REQUEST, r#"{"message":"","details":"bad filter"}"#),
            "bad filter"
        );
    }
}
