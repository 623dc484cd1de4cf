use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Driver not connected")]
    NotConnected,

    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// The driver kind exists but was not compiled into this build
    #[error("Driver '{driver}' for backend '{backend}' is not compiled in (enable the '{driver}' feature)")]
    DriverUnavailable { backend: String, driver: String },

    /// No driver implementation goes by this name
    #[error("No driver named '{0}'")]
    UnknownDriver(String),

    /// A client library or server-side extension the driver relies on is absent
    #[error("Dependency missing: {0}")]
    DependencyMissing(String),

    #[error("Backend not ready after {attempts} attempts ({waited:?})")]
    Timeout { attempts: u32, waited: Duration },

    #[error("Driver panicked: {0}")]
    Panic(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    SerdeYaml(#[from] serde_yaml::Error),
}
