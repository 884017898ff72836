//! Outbound search-engine client.
//!
//! The only I/O in the crate: one blocking request/response per search,
//! count or facet call. No retry, batching or cancellation here — a failed
//! call surfaces as a single error and retries belong to the caller.

use crate::config::schema::CatalogConfig;
use crate::error::{FacetGateError, Result};
use crate::facets::{FacetDecoder, FacetPage};
use crate::query::aggregation::AggregationBuilder;
use crate::query::builder::SearchBuilder;
use crate::types::{FilterParams, SearchRequest};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;

/// HTTP transport to the search engine.
#[derive(Debug, Clone)]
pub struct Transport {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    http: reqwest::Client,
}

impl Transport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Transport {
            base_url,
            username: None,
            password: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Transport from `ELASTIC_URL` / `ELASTIC_USER` / `ELASTIC_PASSWORD`.
    pub fn from_env() -> Self {
        let base = std::env::var("ELASTIC_URL").unwrap_or_default();
        let mut transport = Transport::new(base);
        if let Ok(username) = std::env::var("ELASTIC_USER") {
            let password = std::env::var("ELASTIC_PASSWORD").unwrap_or_default();
            transport = transport.with_basic_auth(username, password);
        }
        transport
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/{path}", self.base_url);
        let mut request = self.http.request(method, &url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Send and decode a JSON response, mapping non-2xx statuses to
    /// [`FacetGateError::SearchEngine`].
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let response = self.send(method, path, body).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FacetGateError::SearchEngine {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

/// High-level catalog search operations against one index alias.
///
/// Owns the builders and the decoder; all of them are read-only after
/// construction, so one manager can serve concurrent requests.
pub struct SearchManager {
    transport: Transport,
    config: Arc<CatalogConfig>,
    search: SearchBuilder,
    aggregation: AggregationBuilder,
    decoder: FacetDecoder,
}

impl SearchManager {
    pub fn new(config: CatalogConfig, transport: Transport) -> Self {
        let search = SearchBuilder::new(&config);
        let aggregation = AggregationBuilder::new(&config);
        let decoder = FacetDecoder::new(&config);
        SearchManager {
            transport,
            config: Arc::new(config),
            search,
            aggregation,
            decoder,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Matching hits for a search request.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Value>> {
        let body = self.search.search_body(request);
        tracing::debug!(index = %self.config.name, page = request.page, "search");
        let result = self
            .transport
            .request(Method::POST, &format!("{}/_search", self.config.name), Some(&body))
            .await?;
        Ok(result
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Number of documents matching the filters.
    pub async fn count(&self, params: &FilterParams) -> Result<u64> {
        let body = self.search.build(params);
        let result = self
            .transport
            .request(Method::POST, &format!("{}/_count", self.config.name), Some(&body))
            .await?;
        Ok(result.get("count").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Facet counts for the given filters, decoded to the presentation
    /// model.
    pub async fn facets(&self, params: &FilterParams) -> Result<FacetPage> {
        let raw = self.aggregate_raw(params).await?;
        Ok(self.decoder.decode(&raw))
    }

    /// Raw aggregation response: `size: 0` plus the query and aggregation
    /// documents for the filters.
    pub async fn aggregate_raw(&self, params: &FilterParams) -> Result<Value> {
        let mut body = serde_json::Map::new();
        body.insert("size".to_string(), json!(0));
        merge_into(&mut body, self.search.build(params));
        merge_into(&mut body, self.aggregation.build(params));
        tracing::debug!(index = %self.config.name, "facet aggregation");
        self.transport
            .request(
                Method::POST,
                &format!("{}/_search", self.config.name),
                Some(&Value::Object(body)),
            )
            .await
    }

    // ── index lifecycle ─────────────────────────────────────────────────

    /// Create a timestamped physical index carrying the schema's settings
    /// and mapping. Returns the physical name; promote it behind the alias
    /// with [`promote_index`](Self::promote_index) once populated.
    pub async fn create_index(&self) -> Result<String> {
        let physical = format!(
            "{}_{}",
            self.config.name,
            chrono::Utc::now().format("%Y_%m_%d_%H_%M_%S")
        );

        let mut body = serde_json::Map::new();
        if !self.config.settings.is_null() {
            body.insert("settings".to_string(), self.config.settings.clone());
        }
        body.insert(
            "mappings".to_string(),
            json!({ "properties": self.config.mapping_properties() }),
        );

        match self
            .transport
            .request(Method::PUT, &physical, Some(&Value::Object(body)))
            .await
        {
            Ok(_) => Ok(physical),
            Err(e) => {
                tracing::warn!(index = %physical, error = %e, "index creation failed, cleaning up");
                let _ = self.delete_index(&physical).await;
                Err(e)
            }
        }
    }

    /// Drop whatever currently answers to the alias and point it at the
    /// given physical index.
    pub async fn promote_index(&self, physical: &str) -> Result<()> {
        self.delete_index(&self.config.name).await?;
        let body = json!({
            "actions": [
                {"add": {"index": physical, "alias": self.config.name}}
            ]
        });
        self.transport
            .request(Method::POST, "_aliases", Some(&body))
            .await?;
        Ok(())
    }

    /// Delete an index, resolving an alias to its physical indexes first.
    /// Returns whether anything was deleted; resolution failures are not
    /// errors.
    pub async fn delete_index(&self, name: &str) -> Result<bool> {
        let Ok(aliases) = self
            .transport
            .request(Method::GET, &format!("{name}/_alias"), None)
            .await
        else {
            return Ok(false);
        };

        let physical: Vec<String> = match aliases.as_object() {
            Some(map) if !map.is_empty() => map.keys().cloned().collect(),
            _ => vec![name.to_string()],
        };
        for index in physical {
            if self
                .transport
                .request(Method::DELETE, &index, None)
                .await
                .is_err()
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub async fn index_exists(&self, name: &str) -> Result<bool> {
        let response = self.send_head(name).await?;
        match response.status().as_u16() {
            200..=299 => Ok(true),
            404 => Ok(false),
            status => Err(FacetGateError::SearchEngine {
                status,
                body: String::new(),
            }),
        }
    }

    async fn send_head(&self, path: &str) -> Result<reqwest::Response> {
        self.transport.send(Method::HEAD, path, None).await
    }

    // ── documents ───────────────────────────────────────────────────────

    pub async fn add_document(&self, id: &str, source: &Value) -> Result<()> {
        self.transport
            .request(
                Method::PUT,
                &format!("{}/_create/{id}", self.config.name),
                Some(source),
            )
            .await?;
        Ok(())
    }

    /// Replace a document, tolerating that it may not exist yet.
    pub async fn update_document(&self, id: &str, source: &Value) -> Result<()> {
        if let Err(e) = self.delete_document(id).await {
            tracing::debug!(id, error = %e, "stale document delete skipped");
        }
        self.add_document(id, source).await
    }

    /// Merge the given fields over the stored document and reindex it.
    pub async fn patch_document(&self, id: &str, diff: &Value) -> Result<()> {
        let Some(mut element) = self.get_document(id).await? else {
            return Err(FacetGateError::DocumentNotFound(id.to_string()));
        };
        if let (Some(target), Some(patch)) = (element.as_object_mut(), diff.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        self.delete_document(id).await?;
        self.add_document(id, &element).await
    }

    pub async fn delete_document(&self, id: &str) -> Result<()> {
        self.transport
            .request(
                Method::DELETE,
                &format!("{}/_doc/{id}", self.config.name),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<Value>> {
        match self
            .transport
            .request(Method::GET, &format!("{}/_doc/{id}", self.config.name), None)
            .await
        {
            Ok(result) => Ok(result.get("_source").cloned()),
            Err(FacetGateError::SearchEngine { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn merge_into(body: &mut serde_json::Map<String, Value>, document: Value) {
    if let Value::Object(map) = document {
        for (key, value) in map {
            body.insert(key, value);
        }
    }
}
