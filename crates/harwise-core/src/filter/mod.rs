mod pattern;

pub use pattern::{compile_lenient, lenient_match};

use crate::sample::{Sample, SampleOptions};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref API_MIME: Regex = Regex::new(r"(?i)(json|xml|text|javascript)").unwrap();
    static ref API_PATH: Regex = Regex::new(r"/api/|/v[0-9]+/").unwrap();
}

/// Filter that keeps API-like samples matching the include/exclude rules
///
/// All conditions are combined with AND logic: a sample must look like an
/// API call, match the include pattern (if any) and not match the exclude
/// pattern (if any).
#[derive(Debug, Default)]
pub struct ApiFilter {
    /// Samples must match this pattern
    pub include: Option<Regex>,
    /// Samples must not match this pattern
    pub exclude: Option<Regex>,
    /// Match patterns against the canonical URL instead of the templated one
    pub use_canonical: bool,
}

impl ApiFilter {
    /// Create a filter that only applies the API-likeness heuristic
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from extraction options.
    ///
    /// Invalid include/exclude patterns are reported and skipped.
    pub fn from_options(options: &SampleOptions) -> Self {
        let mut filter = Self::new();
        if let Some(include) = &options.include {
            filter = filter.with_include(include);
        }
        if let Some(exclude) = &options.exclude {
            filter = filter.with_exclude(exclude);
        }
        filter.use_canonical = !options.template;
        filter
    }

    /// Set the include pattern
    pub fn with_include(mut self, pattern: &str) -> Self {
        self.include = compile_lenient(pattern);
        self
    }

    /// Set the exclude pattern
    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.exclude = compile_lenient(pattern);
        self
    }

    /// Check if a sample passes the filter
    pub fn matches(&self, sample: &Sample) -> bool {
        if !is_api_like(sample) {
            return false;
        }

        let target = if self.use_canonical {
            sample.url.as_str()
        } else {
            sample.identity_url()
        };

        if !self.matches_include(target) {
            return false;
        }
        if !self.matches_exclude(target) {
            return false;
        }
        true
    }

    fn matches_include(&self, target: &str) -> bool {
        match &self.include {
            None => true,
            Some(re) => re.is_match(target),
        }
    }

    fn matches_exclude(&self, target: &str) -> bool {
        match &self.exclude {
            None => true,
            Some(re) => !re.is_match(target),
        }
    }
}

/// Heuristic for "this exchange is an API call rather than a page asset"
pub fn is_api_like(sample: &Sample) -> bool {
    // XHR / fetch
    if sample
        .req_headers
        .get("x-requested-with")
        .is_some_and(|v| v == "XMLHttpRequest")
        || sample
            .req_headers
            .get("fetch-mode")
            .is_some_and(|v| !v.is_empty())
    {
        return true;
    }

    if API_MIME.is_match(&sample.mime) {
        return true;
    }

    API_PATH.is_match(&sample.url)
}

/// Correlation key: `"<METHOD> <templated-or-canonical url>"`
pub fn generate_key(sample: &Sample) -> String {
    format!("{} {}", sample.method, sample.identity_url())
}
