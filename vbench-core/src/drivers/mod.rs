mod memory;

#[cfg(feature = "elasticsearch")]
pub mod elastic;

#[cfg(feature = "pgvector")]
pub mod pgvector;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use memory::{MemoryConfig, MemoryDriver};

// re-export driver types when features are enabled
#[cfg(feature = "elasticsearch")]
pub use elastic::ElasticsearchDriver;

#[cfg(feature = "pgvector")]
pub use pgvector::PgvectorDriver;

#[cfg(feature = "qdrant")]
pub use qdrant::QdrantDriver;

use std::str::FromStr;

use serde::de::DeserializeOwned;

use crate::driver::Driver;
use crate::error::{Error, Result};

/// Every driver implementation vbench knows about, compiled in or not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Memory,
    Qdrant,
    Pgvector,
    Elasticsearch,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Memory => "memory",
            DriverKind::Qdrant => "qdrant",
            DriverKind::Pgvector => "pgvector",
            DriverKind::Elasticsearch => "elasticsearch",
        }
    }

    /// Whether this build contains the driver
    pub fn is_available(&self) -> bool {
        match self {
            DriverKind::Memory => true,
            DriverKind::Qdrant => cfg!(feature = "qdrant"),
            DriverKind::Pgvector => cfg!(feature = "pgvector"),
            DriverKind::Elasticsearch => cfg!(feature = "elasticsearch"),
        }
    }
}

impl FromStr for DriverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(DriverKind::Memory),
            "qdrant" => Ok(DriverKind::Qdrant),
            "pgvector" | "postgres" => Ok(DriverKind::Pgvector),
            "elasticsearch" | "elastic" => Ok(DriverKind::Elasticsearch),
            _ => Err(Error::UnknownDriver(s.to_string())),
        }
    }
}

/// Construct the driver named by `driver` for `backend`, configured from `options`
pub fn build(backend: &str, driver: &str, options: &serde_yaml::Value) -> Result<Box<dyn Driver>> {
    let kind: DriverKind = driver.parse()?;
    if !kind.is_available() {
        return Err(Error::DriverUnavailable {
            backend: backend.to_string(),
            driver: kind.as_str().to_string(),
        });
    }

    match kind {
        DriverKind::Memory => Ok(Box::new(MemoryDriver::new(backend, parse_options(options)?))),
        #[cfg(feature = "qdrant")]
        DriverKind::Qdrant => Ok(Box::new(QdrantDriver::new(backend, parse_options(options)?))),
        #[cfg(feature = "pgvector")]
        DriverKind::Pgvector => Ok(Box::new(PgvectorDriver::new(
            backend,
            parse_options(options)?,
        ))),
        #[cfg(feature = "elasticsearch")]
        DriverKind::Elasticsearch => Ok(Box::new(ElasticsearchDriver::new(
            backend,
            parse_options(options)?,
        ))),
        #[allow(unreachable_patterns)]
        _ => Err(Error::DriverUnavailable {
            backend: backend.to_string(),
            driver: kind.as_str().to_string(),
        }),
    }
}

/// Deserialize driver options; an absent block means "all defaults"
fn parse_options<T: DeserializeOwned>(options: &serde_yaml::Value) -> Result<T> {
    let options = match options {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
        other => other.clone(),
    };
    serde_yaml::from_value(options)
        .map_err(|e| Error::Config(format!("invalid driver options: {}", e)))
}
