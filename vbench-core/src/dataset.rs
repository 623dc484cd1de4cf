use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::types::Item;

/// Immutable, validated set of items shared by every backend run
#[derive(Debug, Clone)]
pub struct Dataset {
    items: Arc<[Item]>,
    dimension: usize,
}

impl Dataset {
    /// Validate items: non-empty, and every vector has the first item's length
    pub fn new(items: Vec<Item>) -> Result<Self> {
        let first = items
            .first()
            .ok_or_else(|| Error::Dataset("dataset contains no items".into()))?;
        let dimension = first.vector.len();
        if dimension == 0 {
            return Err(Error::Dataset(format!("item {} has an empty vector", first.id)));
        }

        if let Some(bad) = items.iter().find(|item| item.vector.len() != dimension) {
            return Err(Error::Dataset(format!(
                "item {} has dimension {}, expected {}",
                bad.id,
                bad.vector.len(),
                dimension
            )));
        }

        Ok(Self {
            items: items.into(),
            dimension,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Dataset(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_str(&contents)
    }

    pub fn from_str(json: &str) -> Result<Self> {
        let items: Vec<Item> = serde_json::from_str(json)?;
        Self::new(items)
    }

    /// Replicate `seed` cyclically up to `target_count` items, renumbering ids from 1
    pub fn synthesize(seed: &Dataset, target_count: usize) -> Result<Self> {
        if target_count == 0 {
            return Err(Error::Dataset("target count must be at least 1".into()));
        }

        let items = seed
            .items
            .iter()
            .cycle()
            .take(target_count)
            .zip(1u64..)
            .map(|(item, id)| Item {
                id,
                ..item.clone()
            })
            .collect();
        Self::new(items)
    }

    /// Build `output` from the seed file at `seed_path` and write it to disk
    pub fn synthesize_file(
        seed_path: impl AsRef<Path>,
        output: impl AsRef<Path>,
        target_count: usize,
    ) -> Result<Self> {
        let seed = Self::from_file(seed_path.as_ref())?;
        let dataset = Self::synthesize(&seed, target_count)?;
        dataset.write_to(output.as_ref())?;
        info!(
            items = dataset.len(),
            path = %output.as_ref().display(),
            "Synthesized dataset"
        );
        Ok(dataset)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&*self.items)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Vector dimension shared by all items
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The vector every search trial queries with
    pub fn query_vector(&self) -> &[f32] {
        &self.items[0].vector
    }
}
