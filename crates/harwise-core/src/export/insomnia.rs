use super::ExportOptions;
use crate::Result;
use crate::sample::Sample;
use crate::sample::canonical::{origin_of, path_and_query, strip_origin};
use crate::testgen::is_connection_header;
use serde_json::{Value, json};

const BASE_ENV_ID: &str = "env_base";
const ROOT_GROUP_ID: &str = "fld_root";

/// Build an Insomnia v4 export document from a sample set.
///
/// The document holds a base environment, one request group and one
/// request per sample, in sample order.
pub fn generate_insomnia_collection(samples: &[Sample], options: &ExportOptions) -> Result<String> {
    tracing::debug!("Generating Insomnia collection for {} samples", samples.len());

    let mut resources = vec![
        json!({
            "_id": BASE_ENV_ID,
            "_type": "environment",
            "name": "Base",
            "data": {
                "base_url": options.base_url,
                "auth_token": first_bearer_token(samples).unwrap_or_default(),
            }
        }),
        json!({
            "_id": ROOT_GROUP_ID,
            "_type": "request_group",
            "name": "harwise import",
        }),
    ];

    for (index, sample) in samples.iter().enumerate() {
        resources.push(json!({
            "_id": format!("req_{}", index),
            "_type": "request",
            "parentId": ROOT_GROUP_ID,
            "name": format!("{} {}", sample.method, strip_origin(sample.identity_url())),
            "method": sample.method,
            "url": rebase_url(&sample.url, &options.base_url),
            "headers": headers(sample, options),
            "body": body(sample),
        }));
    }

    let export = json!({
        "_type": "export",
        "__export_format": 4,
        "resources": resources,
    });

    Ok(serde_json::to_string_pretty(&export)?)
}

fn first_bearer_token(samples: &[Sample]) -> Option<String> {
    samples.iter().find_map(|sample| {
        sample
            .req_headers
            .get("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}

/// Rewrite `url` to `{{ base_url }}<path>` when it shares the base origin
fn rebase_url(url: &str, base_url: &str) -> String {
    if base_url.is_empty() {
        return url.to_string();
    }

    match (origin_of(url), origin_of(base_url), path_and_query(url)) {
        (Some(origin), Some(base), Some(path)) if origin == base => {
            format!("{{{{ base_url }}}}{}", path)
        }
        _ => url.to_string(),
    }
}

fn headers(sample: &Sample, options: &ExportOptions) -> Vec<Value> {
    sample
        .req_headers
        .iter()
        .filter(|(name, _)| !is_connection_header(name))
        .map(|(name, value)| {
            let value = if !options.is_masked(name) {
                value.clone()
            } else if name == "authorization" && value.starts_with("Bearer ") {
                "Bearer {{ auth_token }}".to_string()
            } else {
                "[MASKED]".to_string()
            };
            json!({ "name": name, "value": value })
        })
        .collect()
}

fn body(sample: &Sample) -> Value {
    let Some(text) = sample.req_body.as_deref().filter(|t| !t.is_empty()) else {
        return json!({});
    };

    let content_type = sample
        .req_headers
        .get("content-type")
        .map(String::as_str)
        .unwrap_or_default();

    if content_type.contains("application/json") {
        if let Ok(parsed) = serde_json::from_str::<Value>(text) {
            if let Ok(pretty) = serde_json::to_string_pretty(&parsed) {
                return json!({ "mimeType": "application/json", "text": pretty });
            }
        }
    }

    let mime_type = if content_type.is_empty() {
        "text/plain"
    } else {
        content_type
    };
    json!({ "mimeType": mime_type, "text": text })
}
