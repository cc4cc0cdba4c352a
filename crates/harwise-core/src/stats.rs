use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of the API-like samples of one capture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiStats {
    pub total_requests: usize,
    pub average_time: f64,
    pub average_size: f64,
    pub status_counts: BTreeMap<i64, usize>,
    pub slowest_requests: Vec<SlowRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowRequest {
    pub key: String,
    pub time: f64,
    pub status: i64,
}

pub struct StatsAnalyzer {
    top_n: usize,
}

impl StatsAnalyzer {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn analyze(&self, samples: &[Sample]) -> ApiStats {
        tracing::debug!("Analyzing {} samples", samples.len());

        if samples.is_empty() {
            return ApiStats::default();
        }

        let total = samples.len();
        let average_time = samples.iter().map(|s| s.time).sum::<f64>() / total as f64;
        let average_size = samples.iter().map(|s| s.size as f64).sum::<f64>() / total as f64;

        let mut status_counts = BTreeMap::new();
        for sample in samples {
            *status_counts.entry(sample.status).or_insert(0) += 1;
        }

        let mut slowest: Vec<_> = samples
            .iter()
            .map(|s| SlowRequest {
                key: s.key.clone(),
                time: s.time,
                status: s.status,
            })
            .collect();
        slowest.sort_by(|a, b| b.time.total_cmp(&a.time));
        slowest.truncate(self.top_n);

        tracing::info!(
            "Stats complete: {} requests, avg={:.2}ms",
            total,
            average_time
        );

        ApiStats {
            total_requests: total,
            average_time,
            average_size,
            status_counts,
            slowest_requests: slowest,
        }
    }
}

impl Default for StatsAnalyzer {
    fn default() -> Self {
        Self::new(10)
    }
}
