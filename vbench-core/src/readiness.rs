use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::BenchmarkConfig;
use crate::driver::Driver;
use crate::error::{Error, Result};

/// Result of a successful readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Attempt (1-based) on which the driver reported ready
    pub attempts: u32,
    pub waited: Duration,
}

/// Polls a driver's `check_ready` with a fixed delay and bounded attempts
#[derive(Debug, Clone, Copy)]
pub struct ReadinessProber {
    attempts: u32,
    interval: Duration,
}

impl ReadinessProber {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    pub fn from_config(config: &BenchmarkConfig) -> Self {
        Self::new(config.ready_attempts, config.ready_interval())
    }

    /// Upper bound on time spent sleeping between probes
    pub fn ceiling(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }

    /// Block until the driver is ready, or fail with `Error::Timeout`
    pub async fn wait(&self, driver: &mut dyn Driver) -> Result<ProbeOutcome> {
        let start = Instant::now();
        info!(
            attempts = self.attempts,
            interval_ms = self.interval.as_millis() as u64,
            "Waiting for backend to be ready"
        );

        for attempt in 1..=self.attempts {
            // a panicking probe is just another "not ready"
            let ready = AssertUnwindSafe(driver.check_ready())
                .catch_unwind()
                .await
                .unwrap_or(false);

            if ready {
                let outcome = ProbeOutcome {
                    attempts: attempt,
                    waited: start.elapsed(),
                };
                debug!(attempt, waited_ms = outcome.waited.as_millis() as u64, "Backend ready");
                return Ok(outcome);
            }

            debug!(attempt, "Backend not ready yet");
            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(Error::Timeout {
            attempts: self.attempts,
            waited: start.elapsed(),
        })
    }
}

impl Default for ReadinessProber {
    fn default() -> Self {
        Self::from_config(&BenchmarkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::types::{Item, SearchResults};

    /// Becomes ready after a fixed number of failed probes
    struct SlowStarter {
        remaining: u32,
        probes: u32,
    }

    #[async_trait]
    impl Driver for SlowStarter {
        fn name(&self) -> &str {
            "slow"
        }

        async fn check_ready(&mut self) -> bool {
            self.probes += 1;
            if self.remaining == 0 {
                return true;
            }
            self.remaining -= 1;
            false
        }

        async fn setup(&mut self, _dim: usize) -> Result<()> {
            Ok(())
        }

        async fn insert_data(&mut self, _items: &[Item]) -> Result<()> {
            Ok(())
        }

        async fn search(&self, _vector: &[f32], _limit: usize) -> Result<SearchResults> {
            Ok(SearchResults::default())
        }

        async fn teardown(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_retries() {
        let mut driver = SlowStarter {
            remaining: 3,
            probes: 0,
        };
        let prober = ReadinessProber::new(30, Duration::from_secs(2));

        let outcome = prober.wait(&mut driver).await.unwrap();
        assert_eq!(outcome.attempts, 4);
        assert_eq!(driver.probes, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_budget() {
        let mut driver = SlowStarter {
            remaining: u32::MAX,
            probes: 0,
        };
        let prober = ReadinessProber::new(5, Duration::from_secs(2));

        let err = prober.wait(&mut driver).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 5, .. }));
        assert_eq!(driver.probes, 5);
    }

    #[test]
    fn test_ceiling() {
        let prober = ReadinessProber::default();
        assert_eq!(prober.ceiling(), Duration::from_secs(58));
    }
}
