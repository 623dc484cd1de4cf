use async_trait::async_trait;
use elasticsearch::{
    BulkParts, Elasticsearch, SearchParts,
    auth::Credentials as EsCredentials,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesRefreshParts},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::types::{Item, SearchResult, SearchResults};

const BULK_BATCH: usize = 500;

/// Elasticsearch driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub credentials: Option<ElasticsearchCredentials>,
    #[serde(default = "default_index")]
    pub index: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElasticsearchCredentials {
    Basic { username: String, password: String },
    ApiKey { id: String, key: String },
    Bearer { token: String },
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "example_index".to_string()
}

pub struct ElasticsearchDriver {
    name: String,
    config: ElasticsearchConfig,
    client: Option<Elasticsearch>,
}

impl ElasticsearchDriver {
    pub fn new(name: impl Into<String>, config: ElasticsearchConfig) -> Self {
        Self {
            name: name.into(),
            config,
            client: None,
        }
    }

    fn client(&self) -> Result<&Elasticsearch> {
        self.client.as_ref().ok_or(Error::NotConnected)
    }

    fn connect(&mut self) -> Result<&Elasticsearch> {
        if self.client.is_none() {
            let url = self
                .config
                .url
                .parse()
                .map_err(|e| Error::Config(format!("Invalid URL: {}", e)))?;

            let pool = SingleNodeConnectionPool::new(url);
            let mut builder = TransportBuilder::new(pool);

            if let Some(creds) = &self.config.credentials {
                builder = match creds {
                    ElasticsearchCredentials::Basic { username, password } => {
                        builder.auth(EsCredentials::Basic(username.clone(), password.clone()))
                    }
                    ElasticsearchCredentials::ApiKey { id, key } => {
                        builder.auth(EsCredentials::ApiKey(id.clone(), key.clone()))
                    }
                    ElasticsearchCredentials::Bearer { token } => {
                        builder.auth(EsCredentials::Bearer(token.clone()))
                    }
                };
            }

            let transport = builder
                .build()
                .map_err(|e| Error::Connection(e.to_string()))?;

            debug!(url = %self.config.url, "Connected to Elasticsearch");
            self.client = Some(Elasticsearch::new(transport));
        }
        self.client()
    }

    /// Delete the index, treating "not found" as success
    async fn delete_index(&self, client: &Elasticsearch) -> Result<()> {
        let response = client
            .indices()
            .delete(IndicesDeleteParts::Index(&[&self.config.index]))
            .send()
            .await
            .map_err(|e| Error::QueryExecution(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() || status.as_u16() == 404 {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::QueryExecution(format!("Delete index failed: {}", body)))
    }
}

#[async_trait]
impl Driver for ElasticsearchDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_ready(&mut self) -> bool {
        let Ok(client) = self.connect() else {
            return false;
        };
        match client.cat().health().send().await {
            Ok(response) => response.status_code().is_success(),
            Err(_) => false,
        }
    }

    async fn setup(&mut self, dim: usize) -> Result<()> {
        self.connect()?;
        let client = self.client()?;
        self.delete_index(client).await?;

        let body = json!({
            "mappings": {
                "properties": {
                    "text": { "type": "text" },
                    "category": { "type": "keyword" },
                    "vector": {
                        "type": "dense_vector",
                        "dims": dim,
                        "index": true,
                        "similarity": "cosine"
                    }
                }
            }
        });

        let response = client
            .indices()
            .create(IndicesCreateParts::Index(&self.config.index))
            .body(body)
            .send()
            .await
            .map_err(|e| Error::QueryExecution(e.to_string()))?;

        if !response.status_code().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Error::QueryExecution(format!(
                "Create index failed: {}",
                error_body
            )));
        }

        info!(index = %self.config.index, dim, "Created Elasticsearch index");
        Ok(())
    }

    async fn insert_data(&mut self, items: &[Item]) -> Result<()> {
        let client = self.client()?;

        for batch in items.chunks(BULK_BATCH) {
            let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(batch.len() * 2);
            for item in batch {
                body.push(json!({ "index": { "_id": item.id.to_string() } }).into());
                body.push(
                    json!({
                        "text": item.text,
                        "category": item.category(),
                        "vector": item.vector,
                    })
                    .into(),
                );
            }

            let response = client
                .bulk(BulkParts::Index(&self.config.index))
                .body(body)
                .send()
                .await
                .map_err(|e| Error::QueryExecution(e.to_string()))?;

            let response_body: Value = response
                .json()
                .await
                .map_err(|e| Error::InvalidResponse(e.to_string()))?;

            if response_body["errors"].as_bool().unwrap_or(false) {
                return Err(Error::QueryExecution(format!(
                    "Bulk insert reported errors: {}",
                    response_body["items"]
                )));
            }
        }

        // documents are only searchable after a refresh
        let response = client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[&self.config.index]))
            .send()
            .await
            .map_err(|e| Error::QueryExecution(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(Error::QueryExecution("Index refresh failed".into()));
        }

        debug!(items = items.len(), "Bulk indexed documents");
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<SearchResults> {
        let client = self.client()?;

        let body = json!({
            "size": limit,
            "knn": {
                "field": "vector",
                "query_vector": vector,
                "k": limit,
                "num_candidates": limit * 10
            },
            "_source": ["text", "category"]
        });

        let response = client
            .search(SearchParts::Index(&[&self.config.index]))
            .body(body)
            .send()
            .await
            .map_err(|e| Error::QueryExecution(e.to_string()))?;

        if !response.status_code().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Error::QueryExecution(format!(
                "Search failed: {}",
                error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        let took_ms = response_body["took"].as_u64();
        let total_hits = response_body["hits"]["total"]["value"].as_u64();

        let hits = response_body["hits"]["hits"]
            .as_array()
            .ok_or_else(|| Error::InvalidResponse("Missing hits array".into()))?;

        let results: Vec<SearchResult> = hits
            .iter()
            .filter_map(|hit| {
                let id = hit["_id"].as_str()?.to_string();
                let score = hit["_score"].as_f64().unwrap_or(0.0) as f32;
                let payload = hit.get("_source").cloned();
                Some(SearchResult { id, score, payload })
            })
            .collect();

        let mut search_results = SearchResults::new(results);
        if let Some(took) = took_ms {
            search_results = search_results.with_took(took);
        }
        if let Some(total) = total_hits {
            search_results = search_results.with_total_hits(total);
        }

        Ok(search_results)
    }

    async fn teardown(&mut self) -> Result<()> {
        let Some(client) = self.client.as_ref() else {
            return Ok(());
        };
        self.delete_index(client).await?;
        self.client = None;
        Ok(())
    }
}
