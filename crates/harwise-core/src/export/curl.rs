use super::ExportOptions;
use crate::sample::Sample;
use crate::sample::canonical::{origin_of, path_and_query};
use crate::testgen::is_connection_header;

/// Render a bash script with one curl invocation per sample.
///
/// Masked headers and headers curl derives itself are left out entirely. When a base URL is set, requests
/// are sent to it instead of the captured origin.
pub fn generate_curl_suite(samples: &[Sample], options: &ExportOptions) -> String {
    tracing::debug!("Generating curl suite for {} samples", samples.len());

    let mut script = String::new();
    script.push_str("#!/usr/bin/env bash\n");
    script.push_str("# Generated by harwise\n");
    if options.strict {
        script.push_str("set -euo pipefail\n");
    }
    script.push('\n');

    for (index, sample) in samples.iter().enumerate() {
        script.push_str(&format!("# [{}] {}\n", index, sample.key));
        script.push_str(&format!(
            "curl -sS -o /dev/null -w '%{{http_code}} %{{time_total}}s\\n' -X {} {}",
            sample.method,
            shell_quote(&target_url(sample, &options.base_url))
        ));

        for (name, value) in &sample.req_headers {
            if options.is_masked(name) || is_connection_header(name) {
                continue;
            }
            script.push_str(&format!(
                " \\\n  -H {}",
                shell_quote(&format!("{}: {}", name, value))
            ));
        }

        if let Some(body) = sample.req_body.as_deref().filter(|b| !b.is_empty()) {
            script.push_str(&format!(" \\\n  --data-raw {}", shell_quote(body)));
        }
        script.push_str("\n\n");
    }

    script
}

fn target_url(sample: &Sample, base_url: &str) -> String {
    if base_url.is_empty() || origin_of(base_url).is_none() {
        return sample.url.clone();
    }
    match path_and_query(&sample.url) {
        Some(path) => format!("{}{}", base_url.trim_end_matches('/'), path),
        None => sample.url.clone(),
    }
}

/// Single-quote a value for bash
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> Sample {
        let mut req_headers = BTreeMap::new();
        req_headers.insert("accept".to_string(), "application/json".to_string());
        req_headers.insert("authorization".to_string(), "Bearer secret".to_string());
        req_headers.insert("content-length".to_string(), "15".to_string());
        req_headers.insert("host".to_string(), "api.example.com".to_string());

        Sample {
            method: "POST".to_string(),
            url: "https://api.example.com/v1/notes?a=1".to_string(),
            req_headers,
            req_body: Some(r#"{"text":"it's"}"#.to_string()),
            key: "POST https://api.example.com/v1/notes?a=1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_curl_line_per_sample() {
        let script = generate_curl_suite(&[sample(), sample()], &ExportOptions::default());

        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(!script.contains("set -euo pipefail"));
        assert_eq!(script.matches("curl -sS").count(), 2);
        assert!(script.contains("-X POST 'https://api.example.com/v1/notes?a=1'"));
        assert!(script.contains("-H 'accept: application/json'"));
        assert!(!script.contains("secret"));
        assert!(script.contains(r#"--data-raw '{"text":"it'\''s"}'"#));
    }

    #[test]
    fn test_strict_and_base_url() {
        let options = ExportOptions {
            base_url: "http://localhost:3000/".to_string(),
            strict: true,
            ..Default::default()
        };
        let script = generate_curl_suite(&[sample()], &options);

        assert!(script.contains("set -euo pipefail\n"));
        assert!(script.contains("'http://localhost:3000/v1/notes?a=1'"));
        assert!(!script.contains("-H 'host:"));
        assert!(!script.contains("-H 'content-length:"));
    }
}
