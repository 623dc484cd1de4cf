//! Fake drivers and a recording lifecycle for runner tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vbench_core::{
    BackendSpec, ContainerDescriptor, ContainerSpec, Dataset, Driver, Error, Item, ItemMetadata,
    Lifecycle, Result, SearchResult, SearchResults,
};

/// How many times each driver operation ran
#[derive(Debug, Default)]
pub struct Calls {
    pub built: AtomicUsize,
    pub check_ready: AtomicUsize,
    pub setup: AtomicUsize,
    pub insert: AtomicUsize,
    pub search: AtomicUsize,
    pub teardown: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Which phase the fake should break in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    NeverReady,
    SetupError,
    SetupDependencyMissing,
    InsertError,
    SearchError,
    InsertPanic,
    TeardownError,
}

/// In-memory driver that counts calls and fails on demand
pub struct FakeDriver {
    calls: Arc<Calls>,
    fault: Fault,
    dim: Option<usize>,
    items: Vec<Item>,
}

impl FakeDriver {
    pub fn new(calls: Arc<Calls>, fault: Fault) -> Self {
        Self {
            calls,
            fault,
            dim: None,
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl Driver for FakeDriver {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_ready(&mut self) -> bool {
        self.calls.check_ready.fetch_add(1, Ordering::SeqCst);
        self.fault != Fault::NeverReady
    }

    async fn setup(&mut self, dim: usize) -> Result<()> {
        self.calls.setup.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::SetupError => Err(Error::QueryExecution("schema rejected".into())),
            Fault::SetupDependencyMissing => {
                Err(Error::DependencyMissing("vector extension".into()))
            }
            _ => {
                self.dim = Some(dim);
                self.items.clear();
                Ok(())
            }
        }
    }

    async fn insert_data(&mut self, items: &[Item]) -> Result<()> {
        self.calls.insert.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::InsertError => Err(Error::QueryExecution("disk full".into())),
            Fault::InsertPanic => panic!("insert exploded"),
            _ => {
                if self.dim.is_none() {
                    return Err(Error::QueryExecution("setup not called".into()));
                }
                self.items.extend_from_slice(items);
                Ok(())
            }
        }
    }

    async fn search(&self, _vector: &[f32], limit: usize) -> Result<SearchResults> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::SearchError {
            return Err(Error::QueryExecution("index corrupted".into()));
        }
        let results = self
            .items
            .iter()
            .take(limit)
            .map(|item| SearchResult {
                id: item.id.to_string(),
                score: 1.0,
                payload: None,
            })
            .collect();
        Ok(SearchResults::new(results))
    }

    async fn teardown(&mut self) -> Result<()> {
        self.calls.teardown.fetch_add(1, Ordering::SeqCst);
        self.items.clear();
        if self.fault == Fault::TeardownError {
            return Err(Error::QueryExecution("collection locked".into()));
        }
        Ok(())
    }
}

/// Register a fake backend whose driver shares `calls`
pub fn fake_backend(
    name: &str,
    container: ContainerSpec,
    fault: Fault,
) -> (BackendSpec, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let shared = calls.clone();
    let spec = BackendSpec::new(name, container, move || {
        shared.built.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDriver::new(shared.clone(), fault)) as Box<dyn Driver>)
    });
    (spec, calls)
}

/// Lifecycle that records every start and stop instead of running commands
#[derive(Clone, Default)]
pub struct RecordingLifecycle {
    inner: Arc<LifecycleLog>,
    fail_start: bool,
}

#[derive(Default)]
pub struct LifecycleLog {
    pub started: Mutex<Vec<(String, ContainerDescriptor)>>,
    pub stopped: Mutex<Vec<String>>,
}

impl RecordingLifecycle {
    pub fn failing() -> Self {
        Self {
            inner: Arc::default(),
            fail_start: true,
        }
    }

    pub fn started(&self) -> Vec<String> {
        self.inner
            .started
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn descriptors(&self) -> Vec<ContainerDescriptor> {
        self.inner
            .started
            .lock()
            .unwrap()
            .iter()
            .map(|(_, d)| d.clone())
            .collect()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.inner.stopped.lock().unwrap().clone()
    }
}

#[async_trait]
impl Lifecycle for RecordingLifecycle {
    async fn start(&self, backend: &str, descriptor: &ContainerDescriptor) -> bool {
        self.inner
            .started
            .lock()
            .unwrap()
            .push((backend.to_string(), descriptor.clone()));
        !self.fail_start
    }

    async fn stop(&self, backend: &str, _descriptor: &ContainerDescriptor) {
        self.inner.stopped.lock().unwrap().push(backend.to_string());
    }
}

/// `count` items of dimension `dim` with distinct vectors
pub fn dataset(count: usize, dim: usize) -> Dataset {
    let items = (0..count)
        .map(|i| Item {
            id: i as u64 + 1,
            text: format!("document {i}"),
            metadata: ItemMetadata {
                category: if i % 2 == 0 { "even" } else { "odd" }.to_string(),
            },
            vector: (0..dim).map(|d| ((i + d) % 7) as f32 / 7.0 + 0.1).collect(),
        })
        .collect();
    Dataset::new(items).expect("valid dataset")
}
