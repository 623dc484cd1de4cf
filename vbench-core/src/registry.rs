use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::driver::Driver;
use crate::drivers;
use crate::error::{Error, Result};
use crate::lifecycle::ContainerSpec;

/// Constructs a fresh driver for a single run
pub type DriverFactory = Arc<dyn Fn() -> Result<Box<dyn Driver>> + Send + Sync>;

/// A registered backend: its name, where its process is defined, and how to
/// build its driver
#[derive(Clone)]
pub struct BackendSpec {
    pub name: String,
    pub container: ContainerSpec,
    factory: DriverFactory,
}

impl BackendSpec {
    pub fn new<F>(name: impl Into<String>, container: ContainerSpec, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Driver>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            container,
            factory: Arc::new(factory),
        }
    }

    /// Build a new driver; never reused across runs
    pub fn build_driver(&self) -> Result<Box<dyn Driver>> {
        (self.factory)()
    }
}

impl fmt::Debug for BackendSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSpec")
            .field("name", &self.name)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

/// Fixed, ordered mapping from backend name to its spec
#[derive(Debug, Clone, Default)]
pub struct Registry {
    backends: Vec<BackendSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every backend named in the configuration.
    ///
    /// Driver kinds are resolved when a driver is built, so a misconfigured
    /// backend only fails its own run.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for backend in &config.backends {
            let name = backend.name.clone();
            let driver = backend.driver.clone();
            let options = backend.options.clone();
            registry.register(BackendSpec::new(
                backend.name.clone(),
                backend.container(&config.backends_dir),
                move || drivers::build(&name, &driver, &options),
            ));
        }
        registry
    }

    /// Add a backend, replacing any existing one with the same name in place
    pub fn register(&mut self, spec: BackendSpec) {
        match self.backends.iter_mut().find(|b| b.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.backends.push(spec),
        }
    }

    pub fn get(&self, name: &str) -> Result<&BackendSpec> {
        self.backends
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Which backends a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Named(Vec<String>),
}

impl Selection {
    /// Parse `all` or a comma-separated list; order is kept, duplicates are not merged
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.eq_ignore_ascii_case("all") {
            return Selection::All;
        }
        Selection::Named(
            input
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Backend names to run, in order; unknown names are kept so they get a record
    pub fn resolve(&self, registry: &Registry) -> Vec<String> {
        match self {
            Selection::All => registry.names().into_iter().map(str::to_string).collect(),
            Selection::Named(names) => names.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::BackendConfig;
    use crate::drivers::MemoryDriver;

    fn memory_spec(name: &str) -> BackendSpec {
        BackendSpec::new(name, ContainerSpec::External, || {
            Ok(Box::new(MemoryDriver::default()) as Box<dyn Driver>)
        })
    }

    #[test]
    fn test_selection_parse() {
        assert_eq!(Selection::parse("all"), Selection::All);
        assert_eq!(Selection::parse(" ALL "), Selection::All);
        assert_eq!(
            Selection::parse("qdrant, postgres,,qdrant "),
            Selection::Named(vec![
                "qdrant".to_string(),
                "postgres".to_string(),
                "qdrant".to_string()
            ])
        );
        assert_eq!(Selection::parse(""), Selection::Named(vec![]));
    }

    #[test]
    fn test_resolve_all_in_registration_order() {
        let mut registry = Registry::new();
        registry.register(memory_spec("b"));
        registry.register(memory_spec("a"));
        registry.register(memory_spec("b"));

        assert_eq!(registry.len(), 2);
        assert_eq!(Selection::All.resolve(&registry), vec!["b", "a"]);
        assert_eq!(
            Selection::parse("a,zzz").resolve(&registry),
            vec!["a", "zzz"]
        );
    }

    #[test]
    fn test_unknown_backend() {
        let registry = Registry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(Error::UnknownBackend(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_factory_runs_per_build() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let mut registry = Registry::new();
        registry.register(BackendSpec::new("m", ContainerSpec::External, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MemoryDriver::default()) as Box<dyn Driver>)
        }));
        assert_eq!(built.load(Ordering::SeqCst), 0);

        let spec = registry.get("m").unwrap();
        spec.build_driver().unwrap();
        spec.build_driver().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_config_defers_driver_errors() {
        let config = Config {
            backends: vec![
                BackendConfig::new("local", "memory"),
                BackendConfig::new("mystery", "mongodb"),
            ],
            ..Config::default()
        };
        let registry = Registry::from_config(&config);
        assert_eq!(registry.names(), vec!["local", "mystery"]);

        assert!(registry.get("local").unwrap().build_driver().is_ok());
        assert!(matches!(
            registry.get("mystery").unwrap().build_driver(),
            Err(Error::UnknownDriver(kind)) if kind == "mongodb"
        ));
    }
}
