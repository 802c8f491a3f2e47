//! Response classification
//!
//! The upstream intermittently serves anti-bot HTML or captcha pages with
//! HTTP 200 where JSON is expected. Classification turns every completed
//! response into either unwrapped data or an error carrying a short,
//! human-readable diagnostic instead of kilobytes of markup.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{MovieBoxError, MAX_RESPONSE_SIZE};

// These patterns are compile-time constants; Regex::new cannot fail on them.
static RE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").expect("invalid title regex"));
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("invalid tag regex"));

/// Cap on extracted diagnostic snippets.
pub const SNIPPET_LIMIT: usize = 300;

/// Extract a short message from an HTML body: the `<title>` text when
/// present, otherwise the tag-stripped, whitespace-collapsed text
/// truncated to [`SNIPPET_LIMIT`] characters.
#[must_use]
pub fn html_snippet(body: &str) -> String {
    if body.is_empty() {
        return String::new();
    }
    if let Some(caps) = RE_TITLE.captures(body) {
        return caps[1].trim().to_string();
    }
    let stripped = RE_TAG.replace_all(body, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(SNIPPET_LIMIT).collect()
}

/// Unwrap the standard `{code, message, data}` envelope.
///
/// `code == 0 && message == "ok"` yields `data`; any other combination is
/// a logical upstream failure carrying the envelope message.
pub fn unwrap_envelope(mut json: Value) -> Result<Value, MovieBoxError> {
    let code = json.get("code").and_then(Value::as_i64);
    let ok = json.get("message").and_then(Value::as_str) == Some("ok");
    if code == Some(0) && ok {
        return Ok(json.get_mut("data").map(Value::take).unwrap_or(Value::Null));
    }

    let message = match json.get("message").and_then(Value::as_str) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => "Unknown error".to_string(),
    };
    Err(MovieBoxError::Api { message })
}

/// Envelope-aware unwrap for endpoints that sometimes answer outside the
/// envelope: bodies carrying both `code` and `message` go through the
/// envelope check, anything else is returned as-is.
pub fn unwrap_envelope_or_raw(json: Value) -> Result<Value, MovieBoxError> {
    if json.get("code").is_some() && json.get("message").is_some() {
        unwrap_envelope(json)
    } else {
        Ok(json)
    }
}

/// Classify a non-2xx response body.
///
/// Cookies have already been absorbed by this point. A failure status
/// whose body still parses as the standard envelope is a logical upstream
/// error carrying the envelope message; anything else is an HTTP failure
/// with a diagnostic snippet.
#[must_use]
pub fn classify_failure(status: reqwest::StatusCode, body: &str) -> MovieBoxError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if json.get("code").is_some() && json.get("message").is_some() {
            if let Err(err) = unwrap_envelope(json) {
                return err;
            }
        }
    }
    MovieBoxError::Http {
        status,
        snippet: html_snippet(body),
    }
}

/// Read a response body as text with a size cap.
///
/// A body-read failure never propagates; a placeholder string is
/// substituted so classification and logging can proceed.
pub async fn text_with_limit(response: reqwest::Response) -> String {
    if let Some(len) = response.content_length() {
        if len as usize > MAX_RESPONSE_SIZE {
            return format!("<response body too large: {len} bytes>");
        }
    }
    match response.bytes().await {
        Ok(bytes) if bytes.len() > MAX_RESPONSE_SIZE => {
            format!("<response body too large: {} bytes>", bytes.len())
        }
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => format!("<failed to read body: {e}>"),
    }
}
