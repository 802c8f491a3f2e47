//! Mirror host resolution
//!
//! The upstream API is served identically from several interchangeable
//! hostnames. One host is primary (configurable); the rest are fallbacks
//! tried in listed order, so behavior is deterministic and reproducible.

use url::Url;

/// Known upstream mirrors, in fallback order.
pub const MIRROR_HOSTS: [&str; 7] = [
    "h5.aoneroom.com",
    "movieboxapp.in",
    "moviebox.pk",
    "moviebox.ph",
    "moviebox.id",
    "v.moviebox.ph",
    "netnaija.video",
];

/// Ordered mirror host set with a designated primary.
#[derive(Debug, Clone)]
pub struct MirrorHosts {
    scheme: String,
    primary: String,
    mirrors: Vec<String>,
}

impl Default for MirrorHosts {
    fn default() -> Self {
        Self::new(None, "https")
    }
}

impl MirrorHosts {
    /// Built-in mirror list with an optional primary override.
    #[must_use]
    pub fn new(primary: Option<&str>, scheme: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            primary: primary.unwrap_or(MIRROR_HOSTS[0]).to_string(),
            mirrors: MIRROR_HOSTS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Explicit host set; used by deployments pointing at private mirrors
    /// and by tests.
    #[must_use]
    pub fn with_mirrors(primary: &str, mirrors: Vec<String>, scheme: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            primary: primary.to_string(),
            mirrors,
        }
    }

    #[must_use]
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Base URL of the primary host, with trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}/", self.scheme, self.primary)
    }

    /// `{scheme}://{host}` origin for an arbitrary mirror.
    #[must_use]
    pub fn host_base(&self, host: &str) -> String {
        format!("{}://{host}", self.scheme)
    }

    /// Resolve a relative path against the primary base URL.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        let base = self.base_url();
        match Url::parse(&base).ok().and_then(|b| b.join(path).ok()) {
            Some(url) => url.to_string(),
            None => format!("{base}{}", path.trim_start_matches('/')),
        }
    }

    /// Primary first, then remaining mirrors in listed order, deduplicated.
    /// This order is the fallback policy.
    #[must_use]
    pub fn hosts_to_try(&self) -> Vec<&str> {
        let mut hosts = vec![self.primary.as_str()];
        for mirror in &self.mirrors {
            if !hosts.contains(&mirror.as_str()) {
                hosts.push(mirror.as_str());
            }
        }
        hosts
    }

    /// Swap only the authority of an absolute URL, preserving scheme, path
    /// and query. A non-absolute input is treated as a path on the given
    /// host; anything else passes through unchanged. Never panics.
    #[must_use]
    pub fn rehost(&self, url: &str, host: &str) -> String {
        let (name, port) = split_host_port(host);
        if let Ok(mut parsed) = Url::parse(url) {
            if parsed.has_host() && parsed.set_host(Some(name)).is_ok() {
                let _ = parsed.set_port(port);
                return parsed.to_string();
            }
        }
        if url.starts_with('/') {
            return format!("{}://{host}{url}", self.scheme);
        }
        url.to_string()
    }
}

/// Split an optional `:port` suffix off a host string.
fn split_host_port(host: &str) -> (&str, Option<u16>) {
    match host.rsplit_once(':') {
        Some((name, port)) => match port.parse::<u16>() {
            Ok(port) => (name, Some(port)),
            Err(_) => (host, None),
        },
        None => (host, None),
    }
}
