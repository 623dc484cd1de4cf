use serde::{Deserialize, Serialize};

/// A single dataset entry loaded into every backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub metadata: ItemMetadata,
    pub vector: Vec<f32>,
}

impl Item {
    pub fn category(&self) -> &str {
        &self.metadata.category
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub category: String,
}

/// A single search hit returned by a driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Document identifier
    pub id: String,
    /// Relevance/similarity score
    pub score: f32,
    /// Optional payload/document content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// Collection of search results from a query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    /// Time taken by the search engine (if reported), in milliseconds
    pub took_ms: Option<u64>,
    /// Total hits (may be more than returned results)
    pub total_hits: Option<u64>,
}

impl SearchResults {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            took_ms: None,
            total_hits: None,
        }
    }

    pub fn with_took(mut self, took_ms: u64) -> Self {
        self.took_ms = Some(took_ms);
        self
    }

    pub fn with_total_hits(mut self, total: u64) -> Self {
        self.total_hits = Some(total);
        self
    }

    /// Document IDs in the order the backend returned them
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
