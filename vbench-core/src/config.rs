use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lifecycle::ContainerSpec;

/// Top-level configuration for vbench
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workload parameters shared by every backend
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    /// Where the dataset lives and how to synthesize it
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Path of the JSON report written at the end of a run
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// How backend containers are brought up and down
    #[serde(default)]
    pub compose: ComposeConfig,
    /// Root under which each backend's compose directory is looked up
    #[serde(default = "default_backends_dir")]
    pub backends_dir: PathBuf,
    /// Registered backends, in the order `all` runs them
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.benchmark.validate()?;

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.name.trim().is_empty() {
                return Err(Error::Config("Backend name must not be empty".into()));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(Error::Config(format!(
                    "Backend '{}' is registered more than once",
                    backend.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            benchmark: BenchmarkConfig::default(),
            dataset: DatasetConfig::default(),
            output: default_output(),
            compose: ComposeConfig::default(),
            backends_dir: default_backends_dir(),
            backends: default_backends(),
        }
    }
}

/// Workload settings applied uniformly to every backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Number of timed single-query searches per backend
    #[serde(default = "default_search_trials")]
    pub search_trials: usize,
    /// Top-k for each search
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Readiness probe attempts before giving up
    #[serde(default = "default_ready_attempts")]
    pub ready_attempts: u32,
    /// Delay between readiness probes in milliseconds
    #[serde(default = "default_ready_interval_ms")]
    pub ready_interval_ms: u64,
}

impl BenchmarkConfig {
    pub fn ready_interval(&self) -> Duration {
        Duration::from_millis(self.ready_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search_trials == 0 {
            return Err(Error::Config("search_trials must be at least 1".into()));
        }
        if self.search_limit == 0 {
            return Err(Error::Config("search_limit must be at least 1".into()));
        }
        if self.ready_attempts == 0 {
            return Err(Error::Config("ready_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

fn default_search_trials() -> usize {
    10
}
fn default_search_limit() -> usize {
    5
}
fn default_ready_attempts() -> u32 {
    30
}
fn default_ready_interval_ms() -> u64 {
    2000
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            search_trials: default_search_trials(),
            search_limit: default_search_limit(),
            ready_attempts: default_ready_attempts(),
            ready_interval_ms: default_ready_interval_ms(),
        }
    }
}

/// Dataset location and synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset file to benchmark with
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
    /// Seed file replicated when the default dataset is missing
    #[serde(default = "default_seed_path")]
    pub seed: PathBuf,
    /// Number of items to synthesize from the seed
    #[serde(default = "default_synthesize_count")]
    pub synthesize_count: usize,
}

pub const DEFAULT_DATASET_PATH: &str = "data/dataset_large.json";

fn default_dataset_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATASET_PATH)
}
fn default_seed_path() -> PathBuf {
    PathBuf::from("data/dataset.json")
}
fn default_synthesize_count() -> usize {
    1000
}

impl DatasetConfig {
    /// Only the default dataset path is synthesized on demand
    pub fn is_default_path(&self) -> bool {
        self.path == Path::new(DEFAULT_DATASET_PATH)
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            seed: default_seed_path(),
            synthesize_count: default_synthesize_count(),
        }
    }
}

/// Compose invocation used to bring backends up and down
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Program and leading arguments, e.g. `[docker, compose]` or `[docker-compose]`
    #[serde(default = "default_compose_command")]
    pub command: Vec<String>,
}

fn default_compose_command() -> Vec<String> {
    vec!["docker".to_string(), "compose".to_string()]
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            command: default_compose_command(),
        }
    }
}

/// One registered backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name used on the command line and in the report
    pub name: String,
    /// Driver kind (`memory`, `qdrant`, `pgvector`, `elasticsearch`)
    pub driver: String,
    /// Compose directory; defaults to `<backends_dir>/<name>`
    #[serde(default)]
    pub compose_dir: Option<PathBuf>,
    /// The backend process is managed outside vbench
    #[serde(default)]
    pub external: bool,
    /// Driver-specific options, deserialized by the driver itself
    #[serde(default)]
    pub options: serde_yaml::Value,
}

impl BackendConfig {
    pub fn new(name: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: driver.into(),
            compose_dir: None,
            external: false,
            options: serde_yaml::Value::Null,
        }
    }

    pub fn container(&self, backends_dir: &Path) -> ContainerSpec {
        if self.external {
            return ContainerSpec::External;
        }
        let dir = self
            .compose_dir
            .clone()
            .unwrap_or_else(|| backends_dir.join(&self.name));
        ContainerSpec::Compose { dir }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("metrics.json")
}

fn default_backends_dir() -> PathBuf {
    PathBuf::from("backends")
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new("qdrant", "qdrant"),
        BackendConfig::new("postgres", "pgvector"),
        BackendConfig::new("elasticsearch", "elasticsearch"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("{}").unwrap();
        assert_eq!(config.benchmark.search_trials, 10);
        assert_eq!(config.benchmark.search_limit, 5);
        assert_eq!(config.benchmark.ready_attempts, 30);
        assert_eq!(config.benchmark.ready_interval(), Duration::from_secs(2));
        assert_eq!(config.output, PathBuf::from("metrics.json"));
        assert!(config.dataset.is_default_path());

        let names: Vec<&str> = config.backends.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["qdrant", "postgres", "elasticsearch"]);
    }

    #[test]
    fn test_parse_backends() {
        let yaml = r#"
benchmark:
  search_trials: 3
compose:
  command: [docker-compose]
backends:
  - name: local
    driver: memory
    external: true
  - name: qdrant
    driver: qdrant
    compose_dir: infra/qdrant
    options:
      url: http://localhost:6334
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.benchmark.search_trials, 3);
        assert_eq!(config.compose.command, vec!["docker-compose"]);
        assert_eq!(config.backends.len(), 2);

        let root = Path::new("backends");
        assert!(matches!(
            config.backends[0].container(root),
            ContainerSpec::External
        ));
        match config.backends[1].container(root) {
            ContainerSpec::Compose { dir } => assert_eq!(dir, PathBuf::from("infra/qdrant")),
            other => panic!("unexpected container spec: {other:?}"),
        }
    }

    #[test]
    fn test_compose_dir_defaults_to_backend_name() {
        let backend = BackendConfig::new("postgres", "pgvector");
        match backend.container(Path::new("/srv/backends")) {
            ContainerSpec::Compose { dir } => {
                assert_eq!(dir, PathBuf::from("/srv/backends/postgres"))
            }
            other => panic!("unexpected container spec: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_invalid_workload() {
        let err = Config::from_str("benchmark:\n  search_trials: 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_str("benchmark:\n  ready_attempts: 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_duplicate_backends() {
        let yaml = r#"
backends:
  - { name: a, driver: memory }
  - { name: a, driver: qdrant }
"#;
        let err = Config::from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
