use super::types::{Creator, Entry, Har, Log};
use crate::{Error, Result};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct HarReader;

impl HarReader {
    /// Read and parse a HAR file from the given path
    pub fn from_file(path: &Path) -> Result<Har> {
        tracing::debug!("Reading HAR file from: {}", path.display());

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let value: Value = serde_json::from_reader(reader)?;
        let har = Self::from_value(&value)?;

        tracing::info!(
            "Successfully parsed HAR file with {} entries",
            har.log.entries.len()
        );

        Ok(har)
    }

    /// Parse a HAR file from a JSON string
    pub fn from_str(content: &str) -> Result<Har> {
        tracing::debug!("Parsing HAR from string");

        let value: Value = serde_json::from_str(content)?;
        let har = Self::from_value(&value)?;

        tracing::info!(
            "Successfully parsed HAR from string with {} entries",
            har.log.entries.len()
        );

        Ok(har)
    }

    /// Build a HAR from an already parsed JSON document.
    ///
    /// A document without a `log.entries` array yields an empty log, and
    /// entries that do not have the request/response shape are skipped.
    /// Only a document that is not a JSON object at all is rejected.
    pub fn from_value(value: &Value) -> Result<Har> {
        if !value.is_object() {
            return Err(Error::InvalidStructure(
                "HAR document must be a JSON object".to_string(),
            ));
        }

        let Some(log) = value.get("log") else {
            tracing::warn!("HAR document has no 'log' object");
            return Ok(Har::default());
        };

        let version = log
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let creator = log
            .get("creator")
            .and_then(|c| serde_json::from_value::<Creator>(c.clone()).ok());

        let Some(raw_entries) = log.get("entries").and_then(Value::as_array) else {
            tracing::warn!("HAR log has no 'entries' array");
            return Ok(Har {
                log: Log {
                    version,
                    creator,
                    entries: vec![],
                },
            });
        };

        let mut entries = Vec::with_capacity(raw_entries.len());
        for (idx, raw) in raw_entries.iter().enumerate() {
            match serde_json::from_value::<Entry>(raw.clone()) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping malformed entry {}: {}", idx, e),
            }
        }

        Ok(Har {
            log: Log {
                version,
                creator,
                entries,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_har() {
        let har_json = r#"{
            "log": {
                "version": "1.2",
                "creator": {"name": "test", "version": "1.0"},
                "entries": []
            }
        }"#;

        let har = HarReader::from_str(har_json).unwrap();
        assert_eq!(har.log.version, "1.2");
        assert_eq!(har.log.entries.len(), 0);
        assert_eq!(har.log.creator.unwrap().name, "test");
    }

    #[test]
    fn test_missing_entries_is_empty_not_error() {
        let har = HarReader::from_str(r#"{"log": {"version": "1.2"}}"#).unwrap();
        assert!(har.log.entries.is_empty());

        let har = HarReader::from_str(r#"{"log": {"entries": "nope"}}"#).unwrap();
        assert!(har.log.entries.is_empty());

        let har = HarReader::from_str(r#"{"something": "else"}"#).unwrap();
        assert!(har.log.entries.is_empty());
    }

    #[test]
    fn test_float_content_size_keeps_entry() {
        let har = HarReader::from_str(
            r#"{"log": {"entries": [{
                "request": {"method": "GET", "url": "https://example.com/api/items"},
                "response": {"status": 200, "content": {"size": 12.0, "mimeType": "application/json"}}
            }]}}"#,
        )
        .unwrap();

        assert_eq!(har.log.entries.len(), 1);
        let size = har.log.entries[0].response.content.as_ref().and_then(|c| c.size);
        assert_eq!(size, Some(12));
    }

    #[test]
    fn test_non_object_document_is_error() {
        assert!(matches!(
            HarReader::from_str("[1, 2, 3]"),
            Err(Error::InvalidStructure(_))
        ));
        assert!(matches!(HarReader::from_str("{not json"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_malformed_entry_is_skipped() {
        let har_json = r#"{
            "log": {
                "entries": [
                    {"request": {"method": "GET"}},
                    {
                        "request": {"method": "GET", "url": "https://example.com/api/x"},
                        "response": {"status": 200}
                    }
                ]
            }
        }"#;

        let har = HarReader::from_str(har_json).unwrap();
        assert_eq!(har.log.entries.len(), 1);
        assert_eq!(har.log.entries[0].request.url, "https://example.com/api/x");
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(HarReader::from_str("{not json").is_err());
    }
}
