use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::BenchmarkConfig;
use crate::dataset::Dataset;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::lifecycle::{ContainerLease, Lifecycle};
use crate::metrics::TrialTimer;
use crate::readiness::ReadinessProber;
use crate::registry::{Registry, Selection};
use crate::report::{BenchmarkRecord, FailureCause, RecordBuilder, RunReport};

/// Where a backend run is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Started,
    Ready,
    Setup,
    Inserted,
    Searched,
    TornDown,
}

/// Drives each requested backend through start, readiness, setup, insert,
/// search trials and teardown, one backend at a time
pub struct BenchmarkRunner {
    registry: Registry,
    lifecycle: Box<dyn Lifecycle>,
    config: BenchmarkConfig,
    prober: ReadinessProber,
}

impl BenchmarkRunner {
    pub fn new(registry: Registry, lifecycle: Box<dyn Lifecycle>, config: BenchmarkConfig) -> Self {
        let prober = ReadinessProber::from_config(&config);
        Self {
            registry,
            lifecycle,
            config,
            prober,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Benchmark every selected backend in order; never fails as a whole
    pub async fn run(&self, selection: &Selection, dataset: &Dataset) -> RunReport {
        let names = selection.resolve(&self.registry);
        info!(backends = names.len(), items = dataset.len(), "Starting benchmark run");

        let mut report = RunReport::new();
        for name in &names {
            let record = self.run_backend(name, dataset).await;
            report.push(record);
        }
        report
    }

    /// Benchmark a single backend and produce its finalized record
    pub async fn run_backend(&self, name: &str, dataset: &Dataset) -> BenchmarkRecord {
        let span = info_span!("backend", backend = %name);
        let record = self.run_backend_inner(name, dataset).instrument(span).await;

        match &record.error {
            None => info!(backend = %name, "Finished"),
            Some(cause) => warn!(backend = %name, %cause, "Failed"),
        }
        record
    }

    async fn run_backend_inner(&self, name: &str, dataset: &Dataset) -> BenchmarkRecord {
        let mut record = RecordBuilder::new(name);
        info!("Benchmarking");

        let spec = match self.registry.get(name) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(error = %e, "Skipping unknown backend");
                record.fail_with(Phase::Init, &e);
                return record.finish();
            }
        };

        let Some(descriptor) = spec.container.locate() else {
            warn!(container = ?spec.container, "No container descriptor, skipping");
            record.fail(
                FailureCause::NoContainerDescriptor,
                format!("no compose file found for {:?}", spec.container),
            );
            return record.finish();
        };

        let (lease, started) = ContainerLease::acquire(&*self.lifecycle, name, descriptor).await;

        let mut driver: Option<Box<dyn Driver>> = None;
        if !started {
            record.fail(FailureCause::ContainerStartFailed, "container start command failed");
        } else {
            match spec.build_driver() {
                Ok(built) => driver = Some(built),
                Err(e) => {
                    warn!(error = %e, "Could not construct driver");
                    record.fail_with(Phase::Started, &e);
                }
            }
        }

        if let Some(driver) = driver.as_deref_mut() {
            if let Err((phase, e)) = self.drive(driver, dataset, &mut record).await {
                warn!(?phase, error = %e, "Benchmark phase failed");
                record.fail_with(phase, &e);
            } else {
                record.succeed();
            }
        }

        // always runs: teardown, then stop
        if let Some(driver) = driver.as_deref_mut() {
            info!("Teardown");
            if let Err(e) = guarded(driver.teardown()).await {
                warn!(error = %e, "Teardown failed");
            } else {
                debug!(phase = ?Phase::TornDown, "Torn down");
            }
        }
        lease.release().await;

        record.finish()
    }

    /// Ready → Setup → Inserted → Searched; the first failing phase is returned
    async fn drive(
        &self,
        driver: &mut dyn Driver,
        dataset: &Dataset,
        record: &mut RecordBuilder,
    ) -> std::result::Result<(), (Phase, Error)> {
        let outcome = self
            .prober
            .wait(driver)
            .await
            .map_err(|e| (Phase::Ready, e))?;
        info!(attempts = outcome.attempts, "Backend ready");

        info!(dim = dataset.dimension(), "Setup");
        let start = Instant::now();
        guarded(driver.setup(dataset.dimension()))
            .await
            .map_err(|e| (Phase::Setup, e))?;
        let elapsed = start.elapsed();
        record.setup_time(elapsed);
        debug!(elapsed_ms = elapsed.as_millis() as u64, "Setup complete");

        info!(items = dataset.len(), "Inserting");
        let start = Instant::now();
        guarded(driver.insert_data(dataset.items()))
            .await
            .map_err(|e| (Phase::Inserted, e))?;
        let elapsed = start.elapsed();
        record.insert_time(elapsed, dataset.len());
        debug!(elapsed_ms = elapsed.as_millis() as u64, "Insert complete");

        info!(
            trials = self.config.search_trials,
            limit = self.config.search_limit,
            "Searching"
        );
        let query = dataset.query_vector();
        let mut timer = TrialTimer::with_capacity(self.config.search_trials);
        for _ in 0..self.config.search_trials {
            let start = Instant::now();
            let results = guarded(driver.search(query, self.config.search_limit))
                .await
                .map_err(|e| (Phase::Searched, e))?;
            timer.record(start.elapsed());
            debug!(hits = results.len(), "Search trial");
        }

        if let Some(summary) = timer.summary() {
            record.search_latency(&summary);
            info!(
                avg_ms = summary.mean * 1000.0,
                p50_ms = summary.p50 * 1000.0,
                p99_ms = summary.p99 * 1000.0,
                max_ms = summary.max * 1000.0,
                "Search complete"
            );
        }
        Ok(())
    }
}

/// Await a driver call, converting a panic into `Error::Panic`
async fn guarded<T>(fut: impl Future<Output = Result<T>>) -> Result<T> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
