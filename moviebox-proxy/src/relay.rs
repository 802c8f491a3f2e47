//! Streaming relay
//!
//! Fetches a CDN URL server-side with browser-spoofed headers and pipes
//! the bytes back, forwarding range headers in both directions so video
//! seeking works through the proxy.

use std::sync::LazyLock;

use axum::body::Body;
use axum::http::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, RANGE, REFERER, USER_AGENT,
};
use axum::http::Response as HttpResponse;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use moviebox_core::resilience::timeout;

/// Referer the CDN accepts for media requests.
const ALLOWED_REFERER: &str = "https://www.themoviedb.org/";
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Media streams may outlive any sensible total timeout, so the relay
/// client only bounds the connect phase and follows redirects.
static RELAY_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(timeout::HTTP_CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("Failed to build relay HTTP client")
});

/// A successfully relayed upstream response.
#[derive(Debug)]
pub enum Relayed {
    /// Upstream answered with JSON; buffered so the caller can wrap it.
    Json(Value),
    /// Anything else: the body streams through unmodified.
    Stream(HttpResponse<Body>),
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to fetch resource: {status}")]
    Upstream {
        status: reqwest::StatusCode,
        status_text: String,
    },

    #[error("Proxy request failed: {0}")]
    Network(String),
}

/// Fetch `url` and relay the response.
///
/// The inbound `Range` header is forwarded so the CDN can answer 206;
/// `Content-Range`, `Accept-Ranges` and `Content-Length` come back
/// untouched. Transfer is requested uncompressed: the bytes are piped
/// through verbatim and a coded transfer would invalidate range offsets
/// and the forwarded length.
pub async fn relay_fetch(url: &str, client_headers: &HeaderMap) -> Result<Relayed, RelayError> {
    let mut request = RELAY_CLIENT
        .get(url)
        .header(USER_AGENT, BROWSER_UA)
        .header(REFERER, ALLOWED_REFERER)
        .header(ACCEPT, "*/*")
        .header(ACCEPT_ENCODING, "identity");

    if let Some(range) = client_headers.get(RANGE) {
        request = request.header(RANGE, range.clone());
    }

    let response = request.send().await.map_err(|e| {
        warn!(%url, error = %e, "relay fetch failed");
        RelayError::Network(e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!(%url, %status, "relay upstream returned non-ok");
        return Err(RelayError::Upstream {
            status,
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    if content_type.contains("application/json") {
        let json = response
            .json::<Value>()
            .await
            .map_err(|e| RelayError::Network(format!("Failed to read JSON body: {e}")))?;
        return Ok(Relayed::Json(json));
    }

    let mut builder = HttpResponse::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
        );
        // range semantics pass through untouched
        for name in [CONTENT_RANGE, ACCEPT_RANGES, CONTENT_LENGTH] {
            if let Some(value) = response.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=31536000"),
        );
    }

    builder
        .body(Body::from_stream(response.bytes_stream()))
        .map_err(|e| RelayError::Network(format!("Failed to build response: {e}")))
        .map(Relayed::Stream)
}

impl RelayError {
    /// HTTP status the gateway should answer with.
    #[must_use]
    pub fn response_status(&self) -> u16 {
        match self {
            Self::Upstream { status, .. } if status.as_u16() >= 400 => status.as_u16(),
            Self::Upstream { .. } => 500,
            Self::Network(_) => 500,
        }
    }
}
