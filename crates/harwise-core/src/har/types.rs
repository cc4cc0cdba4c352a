use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Top-level HAR object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Har {
    pub log: Log,
}

/// Main HAR log object
///
/// Only the parts of the log needed for sample extraction are modeled;
/// everything else in the capture is ignored on read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Log {
    #[serde(default)]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// Creator/Browser information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Individual HTTP transaction entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "startedDateTime", skip_serializing_if = "Option::is_none")]
    pub started_date_time: Option<String>,
    pub request: Request,
    pub response: Response,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<Timings>,
}

/// HTTP request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(rename = "postData", default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<PostData>,
}

/// HTTP response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, deserialize_with = "lenient_int")]
    pub status: i64,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
}

/// HTTP header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// POST data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostData {
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(
        default,
        deserialize_with = "lenient_opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<i64>,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Timing phases of an entry, keyed by phase name (`blocked`, `dns`, `wait`, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timings {
    phases: Map<String, Value>,
}

impl Timings {
    /// Sum of every numeric phase. Non-numeric phases (e.g. `comment`) are ignored.
    pub fn total(&self) -> f64 {
        self.phases.values().filter_map(Value::as_f64).sum()
    }
}

impl Entry {
    /// Total time of the entry in milliseconds, derived from its timing phases
    pub fn total_time(&self) -> f64 {
        self.timings.as_ref().map(Timings::total).unwrap_or(0.0)
    }
}

/// Any JSON number, truncated toward zero
fn number_as_int(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_as_int(&value).unwrap_or(0))
}

fn lenient_opt_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_as_int(&value))
}
