use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::types::{Item, SearchResult, SearchResults};

/// In-process driver options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Delay after inserting, mimicking a backend that refreshes asynchronously
    #[serde(default)]
    pub settle_ms: u64,
}

struct Collection {
    dim: usize,
    items: Vec<Item>,
}

/// Brute-force cosine search over an in-memory collection.
///
/// Needs no external process; register it with an external container spec.
pub struct MemoryDriver {
    name: String,
    config: MemoryConfig,
    collection: Option<Collection>,
}

impl MemoryDriver {
    pub fn new(name: impl Into<String>, config: MemoryConfig) -> Self {
        Self {
            name: name.into(),
            config,
            collection: None,
        }
    }

    /// Number of stored items (zero when no collection exists)
    pub fn len(&self) -> usize {
        self.collection.as_ref().map_or(0, |c| c.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collection(&self) -> Result<&Collection> {
        self.collection
            .as_ref()
            .ok_or_else(|| Error::QueryExecution("collection does not exist".into()))
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new("memory", MemoryConfig::default())
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_ready(&mut self) -> bool {
        true
    }

    async fn setup(&mut self, dim: usize) -> Result<()> {
        self.collection = Some(Collection {
            dim,
            items: Vec::new(),
        });
        debug!(dim, "Created in-memory collection");
        Ok(())
    }

    async fn insert_data(&mut self, items: &[Item]) -> Result<()> {
        let collection = self
            .collection
            .as_mut()
            .ok_or_else(|| Error::QueryExecution("collection does not exist".into()))?;

        if let Some(bad) = items.iter().find(|i| i.vector.len() != collection.dim) {
            return Err(Error::QueryExecution(format!(
                "item {} has dimension {}, collection expects {}",
                bad.id,
                bad.vector.len(),
                collection.dim
            )));
        }
        collection.items.extend_from_slice(items);

        if self.config.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<SearchResults> {
        let collection = self.collection()?;
        if vector.len() != collection.dim {
            return Err(Error::QueryExecution(format!(
                "query has dimension {}, collection expects {}",
                vector.len(),
                collection.dim
            )));
        }

        let mut scored: Vec<(f32, &Item)> = collection
            .items
            .iter()
            .map(|item| (cosine_similarity(vector, &item.vector), item))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let results = scored
            .into_iter()
            .take(limit)
            .map(|(score, item)| SearchResult {
                id: item.id.to_string(),
                score,
                payload: Some(json!({
                    "text": item.text,
                    "category": item.category(),
                })),
            })
            .collect();

        Ok(SearchResults::new(results).with_total_hits(collection.items.len() as u64))
    }

    async fn teardown(&mut self) -> Result<()> {
        self.collection = None;
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
