pub mod config;
pub mod dataset;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod readiness;
pub mod registry;
pub mod report;
pub mod runner;
pub mod types;

// re-exports
pub use config::{BackendConfig, BenchmarkConfig, Config};
pub use dataset::Dataset;
pub use driver::Driver;
pub use error::{Error, Result};
pub use lifecycle::{ComposeLifecycle, ContainerDescriptor, ContainerSpec, Lifecycle};
pub use metrics::LatencySummary;
pub use readiness::ReadinessProber;
pub use registry::{BackendSpec, Registry, Selection};
pub use report::{BenchmarkRecord, FailureCause, RunReport, Status};
pub use runner::{BenchmarkRunner, Phase};
pub use types::{Item, ItemMetadata, SearchResult, SearchResults};
