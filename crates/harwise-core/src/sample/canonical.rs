use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;
use url::form_urlencoded;

lazy_static! {
    static ref UUID_SEGMENT: Regex = Regex::new(
        r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$"
    )
    .unwrap();
    static ref NUMERIC_SEGMENT: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

/// Placeholder for UUID path segments
pub const UUID_PLACEHOLDER: &str = "{uuid}";
/// Placeholder for numeric path segments
pub const ID_PLACEHOLDER: &str = "{id}";

/// The two normalized forms of a captured request URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// origin + path + sorted query, fragment dropped
    pub canonical: String,
    /// canonical URL with identifier-like path segments replaced
    pub templated: String,
}

/// Canonicalize a raw URL and build its templated variant.
///
/// Query parameters are sorted by name, then by value, so two requests that
/// only differ in parameter order normalize to the same URL. A URL that
/// cannot be parsed (or has no host) is kept verbatim as the canonical form
/// and templated segment-wise as a plain path.
pub fn normalize(raw: &str) -> NormalizedUrl {
    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Falling back to raw URL {}: {}", raw, e);
            return fallback(raw);
        }
    };

    let Some(origin) = origin(&parsed) else {
        tracing::debug!("URL has no host, falling back to raw: {}", raw);
        return fallback(raw);
    };

    let path = match parsed.path() {
        "" => "/",
        p => p,
    };
    let query = sorted_query(&parsed);

    NormalizedUrl {
        canonical: format!("{}{}{}", origin, path, query),
        templated: format!("{}{}{}", origin, template_path(path), query),
    }
}

fn fallback(raw: &str) -> NormalizedUrl {
    NormalizedUrl {
        canonical: raw.to_string(),
        templated: template_path(raw),
    }
}

/// `scheme://host[:port]`, or `None` for URLs without a host
fn origin(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Sorted, re-encoded query string including the leading `?`, or empty
fn sorted_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if pairs.is_empty() {
        return String::new();
    }

    pairs.sort();

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish();
    format!("?{}", encoded)
}

/// Replace identifier-like path segments with placeholders.
///
/// Each `/`-separated segment is percent-decoded before matching. UUIDs
/// (versions 1-5) become `{uuid}`, all-digit segments become `{id}`, and
/// everything else is kept exactly as written.
pub fn template_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.is_empty() {
                return segment.to_string();
            }
            let decoded = percent_decode_str(segment)
                .decode_utf8()
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string());

            if UUID_SEGMENT.is_match(&decoded) {
                UUID_PLACEHOLDER.to_string()
            } else if NUMERIC_SEGMENT.is_match(&decoded) {
                ID_PLACEHOLDER.to_string()
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Origin (`scheme://host[:port]`) of a raw URL, if it parses
pub fn origin_of(raw: &str) -> Option<String> {
    Url::parse(raw).ok().as_ref().and_then(origin)
}

/// Path plus query of a raw URL, if it parses
pub fn path_and_query(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.host_str()?;
    Some(match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    })
}

/// Path and query of a normalized URL with the `scheme://host` prefix removed.
///
/// Works on the string form so that `{id}` placeholders in templated URLs
/// survive untouched.
pub fn strip_origin(url: &str) -> &str {
    match url.find("://") {
        Some(idx) => {
            let after_scheme = &url[idx + 3..];
            match after_scheme.find(['/', '?']) {
                Some(slash) => &after_scheme[slash..],
                None => "/",
            }
        }
        None => url,
    }
}

/// Query-stripped path of a normalized URL, used to match per-URL rules
pub fn path_pattern(url: &str) -> String {
    let without_origin = strip_origin(url);
    let path = without_origin
        .split('?')
        .next()
        .unwrap_or(without_origin);
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_order_is_irrelevant() {
        let a = normalize("https://api.example.com/v1/items?b=2&a=1");
        let b = normalize("https://api.example.com/v1/items?a=1&b=2");
        assert_eq!(a.canonical, b.canonical);
        assert_eq!(a.canonical, "https://api.example.com/v1/items?a=1&b=2");
    }

    #[test]
    fn test_query_sorted_by_value_for_repeated_keys() {
        let url = normalize("https://example.com/api/search?tag=zeta&tag=alpha");
        assert_eq!(url.canonical, "https://example.com/api/search?tag=alpha&tag=zeta");
    }

    #[test]
    fn test_fragment_is_dropped() {
        let url = normalize("https://example.com/app/page?x=1#section");
        assert_eq!(url.canonical, "https://example.com/app/page?x=1");
    }

    #[test]
    fn test_non_default_port_is_kept() {
        let url = normalize("http://localhost:8080/api/users/7");
        assert_eq!(url.canonical, "http://localhost:8080/api/users/7");
        assert_eq!(url.templated, "http://localhost:8080/api/users/{id}");
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let raw = "https://example.com/api/a%20b/list?z=last&a=first%20one&a=0#frag";
        let once = normalize(raw);
        let twice = normalize(&once.canonical);
        assert_eq!(once.canonical, twice.canonical);
    }

    #[test]
    fn test_template_numeric_and_uuid_segments() {
        let url = normalize(
            "https://example.com/v1/orgs/550e8400-e29b-41d4-a716-446655440000/users/42?expand=1",
        );
        assert_eq!(
            url.templated,
            "https://example.com/v1/orgs/{uuid}/users/{id}?expand=1"
        );
    }

    #[test]
    fn test_uppercase_uuid_is_templated() {
        assert_eq!(
            template_path("/items/550E8400-E29B-41D4-A716-446655440000"),
            "/items/{uuid}"
        );
    }

    #[test]
    fn test_non_v1_to_v5_uuid_is_kept() {
        // version nibble 7 is outside the recognized range
        let path = "/items/550e8400-e29b-71d4-a716-446655440000";
        assert_eq!(template_path(path), path);
    }

    #[test]
    fn test_mixed_segments_are_kept() {
        assert_eq!(template_path("/v2/users/42abc/profile"), "/v2/users/42abc/profile");
    }

    #[test]
    fn test_templating_is_stable() {
        let once = template_path("/v1/users/42/posts/550e8400-e29b-41d4-a716-446655440000");
        let twice = template_path(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_percent_encoded_digits_are_templated() {
        assert_eq!(template_path("/users/%34%32"), "/users/{id}");
    }

    #[test]
    fn test_unparsable_url_falls_back_to_raw() {
        let url = normalize("not a url/123/details");
        assert_eq!(url.canonical, "not a url/123/details");
        assert_eq!(url.templated, "not a url/{id}/details");
    }

    #[test]
    fn test_path_pattern_strips_origin_and_query() {
        assert_eq!(
            path_pattern("https://example.com/v1/users/{id}?limit=10"),
            "/v1/users/{id}"
        );
        assert_eq!(path_pattern("https://example.com"), "/");
        assert_eq!(path_pattern("/relative/path?x=1"), "/relative/path");
        assert_eq!(
            strip_origin("https://example.com:8080/v1/users/{id}?a=1"),
            "/v1/users/{id}?a=1"
        );
    }

    #[test]
    fn test_origin_and_path_helpers() {
        assert_eq!(
            origin_of("https://api.example.com:8443/v1/x?y=1").as_deref(),
            Some("https://api.example.com:8443")
        );
        assert_eq!(
            path_and_query("https://api.example.com/v1/x?y=1").as_deref(),
            Some("/v1/x?y=1")
        );
        assert_eq!(origin_of("garbage"), None);
    }
}
