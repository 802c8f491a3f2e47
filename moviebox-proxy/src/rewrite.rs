//! Payload URL rewriting
//!
//! CDN hosts used by the upstream are blocked in some regions, so direct
//! media links are rewritten into same-origin `/api/proxy?url=...` links
//! before a payload reaches the browser.

use serde_json::Value;

/// Build a same-origin proxy link for an original URL.
#[must_use]
pub fn proxy_url(original: &str, origin: &str) -> String {
    if original.is_empty() {
        return String::new();
    }
    format!("{origin}/api/proxy?url={}", percent_encode(original))
}

/// Recursively rewrite URL fields in a JSON payload.
///
/// Pure and total over JSON trees: arrays map element-wise, object
/// entries go through the candidate heuristic, every other scalar passes
/// through unchanged. A string value is a candidate when it starts with
/// `http://`/`https://` or its field name contains `url` or `link`
/// (case-insensitive).
#[must_use]
pub fn rewrite_urls(value: &Value, origin: &str) -> Value {
    match value {
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| rewrite_urls(item, origin)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), rewrite_entry(key, value, origin)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn rewrite_entry(key: &str, value: &Value, origin: &str) -> Value {
    if let Value::String(s) = value {
        if is_candidate(key, s) {
            return Value::String(proxy_url(s, origin));
        }
    }
    rewrite_urls(value, origin)
}

fn is_candidate(key: &str, value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return true;
    }
    let key = key.to_lowercase();
    key.contains("url") || key.contains("link")
}

/// Percent-encode a URL for use as a query parameter value.
#[must_use]
pub fn percent_encode(input: &str) -> String {
    use std::fmt::Write;
    let mut result = String::with_capacity(input.len() * 2);
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                let _ = write!(result, "%{byte:02X}");
            }
        }
    }
    result
}
