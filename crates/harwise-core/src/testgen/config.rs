use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resolved configuration for one test generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    pub assertions: AssertionConfig,
    pub extract: Vec<ExtractRule>,
    pub substitute: Vec<SubstituteRule>,
    /// Lower-case request header names that are never copied into tests
    pub mask_headers: Vec<String>,
    /// Overrides the origin of every request when non-empty
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionConfig {
    pub global: GlobalAssertions,
    pub by_url: Vec<UrlAssertions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAssertions {
    /// Accepted status codes as `[min, max)`
    pub status_range: [i64; 2],
    /// Allowed slowdown relative to the captured time, in percent
    pub max_time_pct_over_sample: f64,
}

/// JSONPath assertions applied to requests whose path matches `match`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlAssertions {
    #[serde(rename = "match")]
    pub match_pattern: String,
    #[serde(default)]
    pub jsonpath: Vec<JsonPathRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPathRule {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
}

/// Store the first JSONPath result of `from` into the context variable `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRule {
    #[serde(rename = "match")]
    pub match_pattern: String,
    pub from: String,
    pub to: String,
}

/// Replace `pattern` in the URL and body with the context variable `var`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstituteRule {
    #[serde(rename = "match")]
    pub match_pattern: String,
    pub pattern: String,
    pub var: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            assertions: AssertionConfig {
                global: GlobalAssertions {
                    status_range: [200, 399],
                    max_time_pct_over_sample: 25.0,
                },
                by_url: vec![],
            },
            extract: vec![],
            substitute: vec![],
            mask_headers: vec!["authorization".to_string(), "cookie".to_string()],
            base_url: String::new(),
        }
    }
}

impl TestConfig {
    /// Defaults overridden by every field set in `partial`.
    ///
    /// Scalars replace the default; lists replace the default list
    /// wholesale and are never concatenated.
    pub fn merged(partial: PartialTestConfig) -> Self {
        let mut config = Self::default();

        if let Some(assertions) = partial.assertions {
            if let Some(global) = assertions.global {
                if let Some(range) = global.status_range {
                    config.assertions.global.status_range = range;
                }
                if let Some(pct) = global.max_time_pct_over_sample {
                    config.assertions.global.max_time_pct_over_sample = pct;
                }
            }
            if let Some(by_url) = assertions.by_url {
                config.assertions.by_url = by_url;
            }
        }
        if let Some(extract) = partial.extract {
            config.extract = extract;
        }
        if let Some(substitute) = partial.substitute {
            config.substitute = substitute;
        }
        if let Some(mask) = partial.mask_headers {
            config.mask_headers = mask.into_iter().map(|h| h.to_lowercase()).collect();
        }
        if let Some(base_url) = partial.base_url {
            config.base_url = base_url;
        }

        config
    }

    /// Whether a request header must be left out of generated tests
    pub fn is_masked(&self, header: &str) -> bool {
        self.mask_headers
            .iter()
            .any(|masked| masked.eq_ignore_ascii_case(header))
    }

    /// Largest allowed duration for a request captured at `sample_time` ms
    pub fn max_time_for(&self, sample_time: f64) -> u64 {
        let pct = self.assertions.global.max_time_pct_over_sample;
        (sample_time * (1.0 + pct / 100.0)).ceil().max(0.0) as u64
    }
}

/// User-supplied configuration; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialTestConfig {
    pub assertions: Option<PartialAssertions>,
    pub extract: Option<Vec<ExtractRule>>,
    pub substitute: Option<Vec<SubstituteRule>>,
    pub mask_headers: Option<Vec<String>>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialAssertions {
    pub global: Option<PartialGlobalAssertions>,
    pub by_url: Option<Vec<UrlAssertions>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialGlobalAssertions {
    pub status_range: Option<[i64; 2]>,
    pub max_time_pct_over_sample: Option<f64>,
}

impl PartialTestConfig {
    /// Read a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading test config from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}
