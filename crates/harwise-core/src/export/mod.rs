mod curl;
mod insomnia;

pub use curl::generate_curl_suite;
pub use insomnia::generate_insomnia_collection;

/// Options shared by the collection exporters
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Origin the exported requests are rewritten against; empty keeps URLs as captured
    pub base_url: String,
    /// Lower-case request header names whose values must not be exported
    pub mask_headers: Vec<String>,
    /// Emit `set -euo pipefail` in curl suites
    pub strict: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            mask_headers: vec!["authorization".to_string(), "cookie".to_string()],
            strict: false,
        }
    }
}

impl ExportOptions {
    pub fn is_masked(&self, header: &str) -> bool {
        self.mask_headers
            .iter()
            .any(|masked| masked.eq_ignore_ascii_case(header))
    }
}
