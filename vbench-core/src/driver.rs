use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Item, SearchResults};

/// Uniform contract every benchmarked backend implements.
///
/// The runner calls `setup` before `insert_data` and `insert_data` before
/// `search`. `teardown` may be called at any point, including on a driver
/// that never connected.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Human-readable name for this driver
    fn name(&self) -> &str;

    /// Probe whether the backend accepts schema and data operations.
    ///
    /// Drivers connect lazily here; any failure is reported as `false`.
    async fn check_ready(&mut self) -> bool;

    /// Drop and recreate the collection/table sized for `dim`
    async fn setup(&mut self, dim: usize) -> Result<()>;

    /// Bulk-load items; returns once they are visible to `search`
    async fn insert_data(&mut self, items: &[Item]) -> Result<()>;

    /// Nearest-neighbour query in the backend's own similarity order
    async fn search(&self, vector: &[f32], limit: usize) -> Result<SearchResults>;

    /// Best-effort removal of whatever `setup` created
    async fn teardown(&mut self) -> Result<()>;
}
