use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeleteCollectionBuilder, Distance, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::types::{Item, SearchResult, SearchResults};

const UPSERT_BATCH: usize = 256;

/// Qdrant driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// gRPC endpoint
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_collection() -> String {
    "example_collection".to_string()
}

pub struct QdrantDriver {
    name: String,
    config: QdrantConfig,
    client: Option<Qdrant>,
}

impl QdrantDriver {
    pub fn new(name: impl Into<String>, config: QdrantConfig) -> Self {
        Self {
            name: name.into(),
            config,
            client: None,
        }
    }

    fn client(&self) -> Result<&Qdrant> {
        self.client.as_ref().ok_or(Error::NotConnected)
    }

    fn connect(&mut self) -> Result<&Qdrant> {
        if self.client.is_none() {
            let mut builder = Qdrant::from_url(&self.config.url);
            if let Some(key) = &self.config.api_key {
                builder = builder.api_key(key.clone());
            }
            let client = builder
                .build()
                .map_err(|e| Error::Connection(e.to_string()))?;
            debug!(url = %self.config.url, "Connected to Qdrant");
            self.client = Some(client);
        }
        self.client()
    }

    async fn collection_exists(&self, client: &Qdrant) -> Result<bool> {
        let collections = client
            .list_collections()
            .await
            .map_err(|e| Error::QueryExecution(e.to_string()))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.config.collection))
    }
}

#[async_trait]
impl Driver for QdrantDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_ready(&mut self) -> bool {
        let Ok(client) = self.connect() else {
            return false;
        };
        client.health_check().await.is_ok()
    }

    async fn setup(&mut self, dim: usize) -> Result<()> {
        self.connect()?;
        let client = self.client()?;
        let collection = &self.config.collection;

        if self.collection_exists(client).await? {
            client
                .delete_collection(DeleteCollectionBuilder::new(collection.as_str()))
                .await
                .map_err(|e| Error::QueryExecution(e.to_string()))?;
        }

        client
            .create_collection(
                CreateCollectionBuilder::new(collection.as_str())
                    .vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| Error::QueryExecution(e.to_string()))?;

        info!(collection = %collection, dim, "Created Qdrant collection");
        Ok(())
    }

    async fn insert_data(&mut self, items: &[Item]) -> Result<()> {
        let client = self.client()?;

        for batch in items.chunks(UPSERT_BATCH) {
            let points = batch
                .iter()
                .map(|item| {
                    let payload = Payload::try_from(json!({
                        "text": item.text,
                        "category": item.category(),
                    }))
                    .map_err(|e| Error::QueryExecution(e.to_string()))?;
                    Ok(PointStruct::new(item.id, item.vector.clone(), payload))
                })
                .collect::<Result<Vec<_>>>()?;

            // wait=true makes the points searchable before the call returns
            client
                .upsert_points(
                    UpsertPointsBuilder::new(self.config.collection.as_str(), points).wait(true),
                )
                .await
                .map_err(|e| Error::QueryExecution(e.to_string()))?;
        }

        debug!(items = items.len(), "Upserted points");
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<SearchResults> {
        let client = self.client()?;

        let search = SearchPointsBuilder::new(
            self.config.collection.as_str(),
            vector.to_vec(),
            limit as u64,
        )
        .with_payload(true);

        let response = client
            .search_points(search)
            .await
            .map_err(|e| Error::QueryExecution(e.to_string()))?;

        let results: Vec<SearchResult> = response
            .result
            .into_iter()
            .map(|point| {
                let id = match point.id {
                    Some(PointId {
                        point_id_options: Some(id),
                    }) => match id {
                        PointIdOptions::Num(n) => n.to_string(),
                        PointIdOptions::Uuid(s) => s,
                    },
                    _ => "unknown".to_string(),
                };

                SearchResult {
                    id,
                    score: point.score,
                    payload: serde_json::to_value(&point.payload).ok(),
                }
            })
            .collect();

        Ok(SearchResults::new(results))
    }

    async fn teardown(&mut self) -> Result<()> {
        let Some(client) = self.client.as_ref() else {
            return Ok(());
        };

        if self.collection_exists(client).await? {
            client
                .delete_collection(DeleteCollectionBuilder::new(
                    self.config.collection.as_str(),
                ))
                .await
                .map_err(|e| Error::QueryExecution(e.to_string()))?;
        }
        self.client = None;
        Ok(())
    }
}
