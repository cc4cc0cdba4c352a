mod report;

pub use report::render_markdown;

use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Correlation outcome for one endpoint key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub endpoint: String,
    pub status_old: i64,
    pub status_new: i64,
    pub time_old: f64,
    pub time_new: f64,
    pub size_old: i64,
    pub size_new: i64,
    pub delta_pct: f64,
    pub regression: bool,
}

/// Percentage increases above which a change counts as a regression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub time_pct: f64,
    pub size_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            time_pct: 10.0,
            size_pct: 15.0,
        }
    }
}

/// Result of comparing a baseline capture against a new one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comparison {
    pub results: Vec<ComparisonResult>,
}

impl Comparison {
    pub fn has_regression(&self) -> bool {
        self.results.iter().any(|r| r.regression)
    }

    pub fn regressions(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.results.iter().filter(|r| r.regression)
    }
}

/// Samples indexed by key, remembering the order in which keys first appeared
struct KeyedSamples<'a> {
    order: Vec<&'a str>,
    by_key: HashMap<&'a str, &'a Sample>,
}

impl<'a> KeyedSamples<'a> {
    /// Later samples overwrite earlier ones under the same key
    fn new(samples: &'a [Sample]) -> Self {
        let mut order = Vec::new();
        let mut by_key = HashMap::new();
        for sample in samples {
            if by_key.insert(sample.key.as_str(), sample).is_none() {
                order.push(sample.key.as_str());
            }
        }
        Self { order, by_key }
    }

    fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Sample)> + '_ {
        self.order.iter().map(|key| (*key, self.by_key[key]))
    }

    fn get(&self, key: &str) -> Option<&'a Sample> {
        self.by_key.get(key).copied()
    }

    fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }
}

/// Join two sample sets by key and classify every difference.
///
/// Every key present in either set appears exactly once in the output:
/// baseline keys first (in first-seen order), then keys only present in
/// the new set.
pub fn compare(baseline: &[Sample], new: &[Sample], thresholds: &Thresholds) -> Comparison {
    tracing::debug!(
        "Comparing {} baseline samples against {} new samples",
        baseline.len(),
        new.len()
    );

    let baseline_map = KeyedSamples::new(baseline);
    let new_map = KeyedSamples::new(new);
    let mut results = Vec::with_capacity(baseline_map.order.len() + new_map.order.len());

    for (key, old) in baseline_map.iter() {
        let result = match new_map.get(key) {
            Some(current) => compare_pair(key, old, current, thresholds),
            None => ComparisonResult {
                endpoint: key.to_string(),
                status_old: old.status,
                status_new: 0,
                time_old: old.time,
                time_new: 0.0,
                size_old: old.size,
                size_new: 0,
                delta_pct: -100.0,
                regression: true,
            },
        };
        results.push(result);
    }

    for (key, current) in new_map.iter() {
        if baseline_map.contains(key) {
            continue;
        }
        // Additions are never regressions
        results.push(ComparisonResult {
            endpoint: key.to_string(),
            status_old: 0,
            status_new: current.status,
            time_old: 0.0,
            time_new: current.time,
            size_old: 0,
            size_new: current.size,
            delta_pct: 100.0,
            regression: false,
        });
    }

    let comparison = Comparison { results };
    tracing::info!(
        "Comparison complete: {} endpoints, {} regressions",
        comparison.results.len(),
        comparison.regressions().count()
    );
    comparison
}

fn compare_pair(
    key: &str,
    old: &Sample,
    current: &Sample,
    thresholds: &Thresholds,
) -> ComparisonResult {
    let time_regression = current.time > old.time * (1.0 + thresholds.time_pct / 100.0);
    let size_regression =
        current.size as f64 > old.size as f64 * (1.0 + thresholds.size_pct / 100.0);
    let status_regression = current.status != old.status;

    let delta_pct = if old.time > 0.0 {
        (current.time - old.time) / old.time * 100.0
    } else {
        0.0
    };

    ComparisonResult {
        endpoint: key.to_string(),
        status_old: old.status,
        status_new: current.status,
        time_old: old.time,
        time_new: current.time,
        size_old: old.size,
        size_new: current.size,
        delta_pct,
        regression: time_regression || size_regression || status_regression,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(key: &str, status: i64, time: f64, size: i64) -> Sample {
        Sample {
            key: key.to_string(),
            status,
            time,
            size,
            ..Default::default()
        }
    }

    #[test]
    fn test_slower_endpoint_is_regression() {
        let baseline = vec![sample("GET https://h/v1/login", 200, 100.0, 200)];
        let new = vec![sample("GET https://h/v1/login", 200, 130.0, 200)];

        let comparison = compare(&baseline, &new, &Thresholds::default());

        assert_eq!(comparison.results.len(), 1);
        let result = &comparison.results[0];
        assert!(result.regression);
        assert!((result.delta_pct - 30.0).abs() < 1e-9);
        assert!(comparison.has_regression());
    }

    #[test]
    fn test_within_threshold_is_clean() {
        let baseline = vec![sample("GET /a", 200, 100.0, 1000)];
        let new = vec![sample("GET /a", 200, 109.0, 1100)];

        let comparison = compare(&baseline, &new, &Thresholds::default());
        assert!(!comparison.results[0].regression);
        assert!(!comparison.has_regression());
    }

    #[test]
    fn test_size_and_status_regressions() {
        let baseline = vec![sample("GET /a", 200, 100.0, 1000), sample("GET /b", 200, 50.0, 10)];
        let new = vec![sample("GET /a", 200, 90.0, 1151), sample("GET /b", 500, 40.0, 10)];

        let comparison = compare(&baseline, &new, &Thresholds::default());
        assert!(comparison.results[0].regression, "size grew by more than 15%");
        assert!(comparison.results[1].regression, "status changed");
        assert!(comparison.results[1].delta_pct < 0.0);
    }

    #[test]
    fn test_custom_thresholds() {
        let baseline = vec![sample("GET /a", 200, 100.0, 100)];
        let new = vec![sample("GET /a", 200, 140.0, 100)];
        let thresholds = Thresholds {
            time_pct: 50.0,
            size_pct: 15.0,
        };

        assert!(!compare(&baseline, &new, &thresholds).has_regression());
    }

    #[test]
    fn test_missing_endpoint_is_regression() {
        let baseline = vec![sample("GET /gone", 200, 80.0, 64)];

        let comparison = compare(&baseline, &[], &Thresholds::default());
        let result = &comparison.results[0];
        assert_eq!(result.delta_pct, -100.0);
        assert!(result.regression);
        assert_eq!(result.status_new, 0);
        assert_eq!(result.time_new, 0.0);
        assert_eq!(result.size_new, 0);
    }

    #[test]
    fn test_added_endpoint_is_not_regression() {
        let new = vec![sample("GET /fresh", 201, 80.0, 64)];

        let comparison = compare(&[], &new, &Thresholds::default());
        let result = &comparison.results[0];
        assert_eq!(result.delta_pct, 100.0);
        assert!(!result.regression);
        assert_eq!(result.status_old, 0);
        assert!(!comparison.has_regression());
    }

    #[test]
    fn test_zero_baseline_time_has_zero_delta() {
        let baseline = vec![sample("GET /a", 200, 0.0, 0)];
        let new = vec![sample("GET /a", 200, 0.0, 0)];

        let comparison = compare(&baseline, &new, &Thresholds::default());
        assert_eq!(comparison.results[0].delta_pct, 0.0);
        assert!(!comparison.results[0].regression);
    }

    #[test]
    fn test_every_key_appears_exactly_once() {
        let baseline = vec![
            sample("GET /a", 200, 10.0, 1),
            sample("GET /b", 200, 10.0, 1),
            sample("GET /a", 200, 12.0, 1),
        ];
        let new = vec![
            sample("GET /b", 200, 10.0, 1),
            sample("GET /c", 200, 10.0, 1),
            sample("GET /c", 200, 11.0, 1),
        ];

        let comparison = compare(&baseline, &new, &Thresholds::default());
        let endpoints: Vec<_> = comparison
            .results
            .iter()
            .map(|r| r.endpoint.as_str())
            .collect();
        assert_eq!(endpoints, vec!["GET /a", "GET /b", "GET /c"]);
    }

    #[test]
    fn test_last_sample_wins_on_duplicate_key() {
        let baseline = vec![sample("GET /a", 200, 10.0, 1), sample("GET /a", 200, 100.0, 1)];
        let new = vec![sample("GET /a", 200, 105.0, 1)];

        let comparison = compare(&baseline, &new, &Thresholds::default());
        assert_eq!(comparison.results[0].time_old, 100.0);
        assert!(!comparison.results[0].regression);
    }
}
