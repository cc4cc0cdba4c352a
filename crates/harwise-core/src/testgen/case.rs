use super::config::TestConfig;
use crate::filter::lenient_match;
use crate::sample::Sample;
use crate::sample::canonical::{origin_of, path_and_query};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Structured, self-contained description of one generated test.
///
/// Execution interprets the descriptor directly: apply substitutions,
/// send the request, check assertions in order, then run extractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub index: usize,
    pub name: String,
    /// Query-stripped templated path the per-URL rules were matched against
    pub path_pattern: String,
    pub request: RequestTemplate,
    pub substitutions: Vec<Substitution>,
    pub assertions: Vec<Assertion>,
    pub extractions: Vec<Extraction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Replace every match of `pattern` with the context variable `var`, if set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    pub pattern: String,
    pub var: String,
}

/// Store the first result of the JSONPath query `from` under `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// `min <= status < max`
    StatusRange { min: i64, max: i64 },
    /// Response content-type contains the captured MIME type
    ContentType { contains: String },
    /// Round-trip duration must not exceed `max_ms`
    MaxDuration { max_ms: u64, sample_ms: f64 },
    /// JSONPath query must produce at least one result
    JsonPathExists { path: String },
    /// JSONPath query must produce at least `min` results
    JsonPathMinLength { path: String, min: usize },
}

impl Assertion {
    /// Whether the assertion inspects the parsed response body
    pub fn needs_body(&self) -> bool {
        matches!(
            self,
            Assertion::JsonPathExists { .. } | Assertion::JsonPathMinLength { .. }
        )
    }
}

impl TestCase {
    /// Build the descriptor for one sample. Deterministic in its inputs.
    pub fn build(sample: &Sample, index: usize, config: &TestConfig) -> Self {
        let path_pattern = sample.path_pattern();

        let request = RequestTemplate {
            method: sample.method.clone(),
            url: request_url(sample, config),
            headers: sample
                .req_headers
                .iter()
                .filter(|(name, _)| !config.is_masked(name) && !is_connection_header(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            body: sample.req_body.clone(),
        };

        let substitutions = config
            .substitute
            .iter()
            .filter(|rule| lenient_match(&rule.match_pattern, &path_pattern))
            .map(|rule| Substitution {
                pattern: rule.pattern.clone(),
                var: rule.var.clone(),
            })
            .collect();

        let global = &config.assertions.global;
        let mut assertions = vec![Assertion::StatusRange {
            min: global.status_range[0],
            max: global.status_range[1],
        }];
        if !sample.mime.is_empty() {
            assertions.push(Assertion::ContentType {
                contains: sample.mime.clone(),
            });
        }
        assertions.push(Assertion::MaxDuration {
            max_ms: config.max_time_for(sample.time),
            sample_ms: sample.time,
        });

        // Only the first matching rule set applies
        if let Some(url_rules) = config
            .assertions
            .by_url
            .iter()
            .find(|rules| lenient_match(&rules.match_pattern, &path_pattern))
        {
            for rule in &url_rules.jsonpath {
                if rule.exists == Some(true) {
                    assertions.push(Assertion::JsonPathExists {
                        path: rule.path.clone(),
                    });
                }
                if let Some(min) = rule.min_length.filter(|min| *min > 0) {
                    assertions.push(Assertion::JsonPathMinLength {
                        path: rule.path.clone(),
                        min,
                    });
                }
            }
        }

        let extractions = config
            .extract
            .iter()
            .filter(|rule| lenient_match(&rule.match_pattern, &path_pattern))
            .map(|rule| Extraction {
                from: rule.from.clone(),
                to: rule.to.clone(),
            })
            .collect();

        Self {
            index,
            name: format!("{} {}", sample.method, sample.url),
            path_pattern,
            request,
            substitutions,
            assertions,
            extractions,
        }
    }

    /// File name of the descriptor inside a suite directory
    pub fn file_name(&self) -> String {
        format!("test_{}.json", self.index)
    }

    /// Read a descriptor file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Headers the HTTP client derives from the actual request and connection.
///
/// Replaying the captured values would send a stale `content-length` once a
/// substitution changes the body, or the wrong `host` under a base URL override.
pub fn is_connection_header(name: &str) -> bool {
    const DERIVED: [&str; 6] = [
        "content-length",
        "host",
        "transfer-encoding",
        "connection",
        "keep-alive",
        "upgrade",
    ];
    name.starts_with(':') || DERIVED.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Base URL (override or the sample's own origin) followed by path and query
fn request_url(sample: &Sample, config: &TestConfig) -> String {
    let base = if config.base_url.is_empty() {
        origin_of(&sample.url)
    } else {
        Some(config.base_url.trim_end_matches('/').to_string())
    };

    match (base, path_and_query(&sample.url)) {
        (Some(base), Some(path)) => format!("{}{}", base, path),
        _ => sample.url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testgen::config::{
        ExtractRule, JsonPathRule, PartialTestConfig, SubstituteRule, UrlAssertions,
    };

    fn sample() -> Sample {
        let mut req_headers = BTreeMap::new();
        req_headers.insert("accept".to_string(), "application/json".to_string());
        req_headers.insert("authorization".to_string(), "Bearer secret".to_string());
        req_headers.insert("cookie".to_string(), "sid=1".to_string());

        Sample {
            method: "GET".to_string(),
            url: "https://api.example.com/v1/users/42?limit=10".to_string(),
            original_url: "https://api.example.com/v1/users/42?limit=10".to_string(),
            templated_url: Some("https://api.example.com/v1/users/{id}?limit=10".to_string()),
            status: 200,
            time: 150.0,
            size: 100,
            mime: "application/json".to_string(),
            req_headers,
            key: "GET https://api.example.com/v1/users/{id}?limit=10".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_descriptor() {
        let case = TestCase::build(&sample(), 3, &TestConfig::default());

        assert_eq!(case.index, 3);
        assert_eq!(case.file_name(), "test_3.json");
        assert_eq!(case.name, "GET https://api.example.com/v1/users/42?limit=10");
        assert_eq!(case.path_pattern, "/v1/users/{id}");
        assert_eq!(case.request.url, "https://api.example.com/v1/users/42?limit=10");
        assert_eq!(case.request.headers.len(), 1);
        assert_eq!(case.request.headers["accept"], "application/json");
        assert_eq!(
            case.assertions,
            vec![
                Assertion::StatusRange { min: 200, max: 399 },
                Assertion::ContentType {
                    contains: "application/json".to_string()
                },
                Assertion::MaxDuration {
                    max_ms: 188,
                    sample_ms: 150.0
                },
            ]
        );
        assert!(case.substitutions.is_empty());
        assert!(case.extractions.is_empty());
    }

    #[test]
    fn test_connection_headers_are_not_replayed() {
        let mut s = sample();
        for (name, value) in [
            ("content-length", "18"),
            ("host", "api.example.com"),
            ("connection", "keep-alive"),
            ("transfer-encoding", "chunked"),
            (":authority", "api.example.com"),
            (":path", "/v1/users/42"),
            ("content-type", "application/json"),
        ] {
            s.req_headers.insert(name.to_string(), value.to_string());
        }

        let case = TestCase::build(&s, 0, &TestConfig::default());
        let names: Vec<&str> = case.request.headers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["accept", "content-type"]);
    }

    #[test]
    fn test_empty_mime_skips_content_type() {
        let mut s = sample();
        s.mime = String::new();
        let case = TestCase::build(&s, 0, &TestConfig::default());
        assert!(!case
            .assertions
            .iter()
            .any(|a| matches!(a, Assertion::ContentType { .. })));
    }

    #[test]
    fn test_base_url_override() {
        let config = TestConfig::merged(PartialTestConfig {
            base_url: Some("http://localhost:3000/".to_string()),
            ..Default::default()
        });
        let case = TestCase::build(&sample(), 0, &config);
        assert_eq!(case.request.url, "http://localhost:3000/v1/users/42?limit=10");
    }

    #[test]
    fn test_url_rules_match_templated_path() {
        let config = TestConfig::merged(PartialTestConfig {
            extract: Some(vec![
                ExtractRule {
                    match_pattern: r"^/v1/users/\{id\}$".to_string(),
                    from: "$.id".to_string(),
                    to: "user_id".to_string(),
                },
                ExtractRule {
                    match_pattern: "/orders".to_string(),
                    from: "$.id".to_string(),
                    to: "order_id".to_string(),
                },
                ExtractRule {
                    match_pattern: "(broken".to_string(),
                    from: "$.id".to_string(),
                    to: "never".to_string(),
                },
            ]),
            substitute: Some(vec![SubstituteRule {
                match_pattern: "/users/".to_string(),
                pattern: "42".to_string(),
                var: "user_id".to_string(),
            }]),
            ..Default::default()
        });

        let case = TestCase::build(&sample(), 0, &config);
        assert_eq!(
            case.extractions,
            vec![Extraction {
                from: "$.id".to_string(),
                to: "user_id".to_string()
            }]
        );
        assert_eq!(case.substitutions.len(), 1);
        assert_eq!(case.substitutions[0].var, "user_id");
    }

    #[test]
    fn test_only_first_matching_url_assertions_apply() {
        let mut config = TestConfig::default();
        config.assertions.by_url = vec![
            UrlAssertions {
                match_pattern: "/users".to_string(),
                jsonpath: vec![
                    JsonPathRule {
                        path: "$.data[*].id".to_string(),
                        exists: Some(true),
                        min_length: None,
                    },
                    JsonPathRule {
                        path: "$.data".to_string(),
                        exists: None,
                        min_length: Some(1),
                    },
                    JsonPathRule {
                        path: "$.ignored".to_string(),
                        exists: Some(false),
                        min_length: Some(0),
                    },
                ],
            },
            UrlAssertions {
                match_pattern: "/v1".to_string(),
                jsonpath: vec![JsonPathRule {
                    path: "$.second".to_string(),
                    exists: Some(true),
                    min_length: None,
                }],
            },
        ];

        let case = TestCase::build(&sample(), 0, &config);
        let body_assertions: Vec<_> = case.assertions.iter().filter(|a| a.needs_body()).collect();
        assert_eq!(
            body_assertions,
            vec![
                &Assertion::JsonPathExists {
                    path: "$.data[*].id".to_string()
                },
                &Assertion::JsonPathMinLength {
                    path: "$.data".to_string(),
                    min: 1
                },
            ]
        );
    }

    #[test]
    fn test_request_body_is_kept() {
        let mut s = sample();
        s.method = "POST".to_string();
        s.req_body = Some(r#"{"user":"42"}"#.to_string());

        let case = TestCase::build(&s, 0, &TestConfig::default());
        assert_eq!(case.request.body.as_deref(), Some(r#"{"user":"42"}"#));
    }

    #[test]
    fn test_descriptor_serialization_is_tagged() {
        let case = TestCase::build(&sample(), 0, &TestConfig::default());
        let json = serde_json::to_value(&case).unwrap();
        assert_eq!(json["assertions"][0]["type"], "status_range");
        assert_eq!(json["assertions"][2]["type"], "max_duration");

        let back: TestCase = serde_json::from_value(json).unwrap();
        assert_eq!(back, case);
    }
}
