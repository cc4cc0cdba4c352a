use crate::engine::{TestResult, TestStatus};
use serde::{Deserialize, Serialize};

/// Aggregate figures of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_time: f64,
    /// Mean duration rounded to the nearest millisecond
    pub avg_time: f64,
    pub p50: f64,
    pub p95: f64,
}

impl RunSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let total = results.len();
        let passed = results
            .iter()
            .filter(|r| r.status == TestStatus::Pass)
            .count();
        let times: Vec<f64> = results.iter().map(|r| r.time).collect();
        let total_time: f64 = times.iter().sum();
        let avg_time = if total == 0 {
            0.0
        } else {
            (total_time / total as f64).round()
        };

        Self {
            total,
            passed,
            failed: total - passed,
            total_time,
            avg_time,
            p50: percentile(&times, 50.0),
            p95: percentile(&times, 95.0),
        }
    }
}

/// Nearest-rank percentile; 0 for an empty set
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}
