pub mod canonical;

use crate::filter::{ApiFilter, generate_key};
use crate::har::{Entry, Har, Header};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One normalized API exchange extracted from a capture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub method: String,
    /// Canonical URL: origin + path + sorted query, no fragment
    pub url: String,
    /// URL exactly as captured
    pub original_url: String,
    /// Canonical URL with identifier segments replaced; `None` when templating is off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templated_url: Option<String>,
    pub status: i64,
    /// Sum of all timing phases, in milliseconds
    pub time: f64,
    /// Response content size in bytes
    pub size: i64,
    pub mime: String,
    pub req_headers: BTreeMap<String, String>,
    pub res_headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub res_body: Option<String>,
    /// Correlation key, empty until the sample survives filtering
    pub key: String,
}

impl Sample {
    /// Normalize a single capture entry. The key is left empty.
    pub fn from_entry(entry: &Entry, template: bool) -> Self {
        let request = &entry.request;
        let response = &entry.response;
        let content = response.content.as_ref();
        let normalized = canonical::normalize(&request.url);

        Self {
            method: request.method.clone(),
            url: normalized.canonical,
            original_url: request.url.clone(),
            templated_url: template.then_some(normalized.templated),
            status: response.status,
            time: entry.total_time(),
            size: content.and_then(|c| c.size).unwrap_or(0),
            mime: content
                .and_then(|c| c.mime_type.clone())
                .unwrap_or_default(),
            req_headers: header_map(&request.headers),
            res_headers: header_map(&response.headers),
            req_body: request.post_data.as_ref().and_then(|p| p.text.clone()),
            res_body: content.and_then(|c| c.text.clone()),
            key: String::new(),
        }
    }

    /// The URL used to identify the logical endpoint: templated when available
    pub fn identity_url(&self) -> &str {
        self.templated_url.as_deref().unwrap_or(&self.url)
    }

    /// Query-stripped path of the identity URL, e.g. `/v1/users/{id}`
    pub fn path_pattern(&self) -> String {
        canonical::path_pattern(self.identity_url())
    }
}

/// Lower-case header names; the last header with a given name wins
fn header_map(headers: &[Header]) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|h| (h.name.to_lowercase(), h.value.clone()))
        .collect()
}

/// Options controlling which samples are kept and how they are keyed
#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Keep only samples whose URL matches this regex
    pub include: Option<String>,
    /// Drop samples whose URL matches this regex
    pub exclude: Option<String>,
    /// Replace identifier path segments before filtering and keying
    pub template: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            include: None,
            exclude: None,
            template: true,
        }
    }
}

/// Extract, filter and key the API-like samples of a capture
pub fn extract_samples(har: &Har, options: &SampleOptions) -> Vec<Sample> {
    tracing::debug!(
        "Extracting samples from {} entries",
        har.log.entries.len()
    );

    let filter = ApiFilter::from_options(options);

    let samples: Vec<Sample> = har
        .log
        .entries
        .iter()
        .map(|entry| Sample::from_entry(entry, options.template))
        .filter(|sample| filter.matches(sample))
        .map(|mut sample| {
            sample.key = generate_key(&sample);
            sample
        })
        .collect();

    tracing::info!(
        "Kept {} API-like samples out of {} entries",
        samples.len(),
        har.log.entries.len()
    );

    samples
}
