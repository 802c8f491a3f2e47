//! Session cookie store
//!
//! The upstream issues session cookies (sometimes from error responses)
//! that must accompany every later request. Cookies are idempotent tokens
//! from a single upstream domain family, so a plain name→value map with
//! last-write-wins semantics is sufficient: no TTL, no domain partitioning.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, SET_COOKIE};

/// Shared cookie store, cloneable across concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct CookieStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl CookieStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or overwrite a cookie.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.write().insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.read().get(name).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Render a `Cookie` header snapshot, `None` when no cookies are held.
    #[must_use]
    pub fn header(&self) -> Option<String> {
        let cookies = self.inner.read();
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Capture every `Set-Cookie` value from a response header map.
    ///
    /// Called on every response, success or failure, before any error
    /// handling.
    pub fn absorb(&self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            if let Ok(raw) = value.to_str() {
                self.merge_set_cookie(raw);
            }
        }
    }

    /// Merge a raw `Set-Cookie` header value, which may carry several
    /// cookies joined by commas. Attributes (Path, Expires, ...) are
    /// dropped; only the leading name=value pair of each cookie is kept.
    pub fn merge_set_cookie(&self, raw: &str) {
        for cookie in split_set_cookie(raw) {
            let pair = cookie.split(';').next().unwrap_or("").trim();
            if let Some(eq) = pair.find('=') {
                let name = pair[..eq].trim();
                let value = pair[eq + 1..].trim();
                if !name.is_empty() {
                    self.set(name, value);
                }
            }
        }
    }
}

/// Split a possibly comma-joined `Set-Cookie` value into individual
/// cookies. A comma only starts a new cookie when what follows looks like
/// a fresh `name=value` pair; commas inside `Expires` dates do not.
fn split_set_cookie(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, byte) in raw.bytes().enumerate() {
        if byte == b',' && starts_new_cookie(&raw[i + 1..]) {
            parts.push(raw[start..i].trim());
            start = i + 1;
        }
    }
    parts.push(raw[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// `name=value` with a non-empty name free of `;` and `=`.
fn starts_new_cookie(rest: &str) -> bool {
    match rest.find('=') {
        Some(0) | None => false,
        Some(eq) => {
            let name = &rest[..eq];
            !name.contains(';') && matches!(rest.as_bytes().get(eq + 1), Some(b) if *b != b';' && *b != b'=')
        }
    }
}
