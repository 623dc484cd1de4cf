use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Latency statistics over a set of search trials, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub samples: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p99: f64,
}

impl LatencySummary {
    /// Summarize trial latencies; `None` when no trial ran
    pub fn from_samples(latencies: &[Duration]) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }

        let mut sorted: Vec<f64> = latencies.iter().map(Duration::as_secs_f64).collect();
        sorted.sort_by(f64::total_cmp);

        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;

        Some(Self {
            samples: sorted.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            p50: nearest_rank(&sorted, 0.50),
            p99: nearest_rank(&sorted, 0.99),
        })
    }
}

/// Nearest-rank percentile: `sorted[floor(p * n)]`, no interpolation.
///
/// `sorted` must be ascending and non-empty.
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    let idx = (p * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Times a sequence of trials
#[derive(Debug, Default)]
pub struct TrialTimer {
    latencies: Vec<Duration>,
}

impl TrialTimer {
    pub fn with_capacity(trials: usize) -> Self {
        Self {
            latencies: Vec::with_capacity(trials),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.latencies.push(latency);
    }

    pub fn latencies(&self) -> &[Duration] {
        &self.latencies
    }

    pub fn summary(&self) -> Option<LatencySummary> {
        LatencySummary::from_samples(&self.latencies)
    }
}
