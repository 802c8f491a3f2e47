use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 3000,
        }
    }
}

/// Upstream mirror selection
///
/// `host` overrides which mirror is tried first; unset means the first
/// entry of the built-in mirror list. `scheme` exists for local mirrors
/// and integration tests; production traffic is always https.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub host: Option<String>,
    pub scheme: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: None,
            scheme: "https".to_string(),
        }
    }
}

/// Proxy URL construction
///
/// `origin` is the public origin of this deployment, used to build
/// same-origin `/api/proxy?url=...` links when rewriting payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub origin: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration with priority: environment variables
    /// (`MOVIEBOX_*`) over config file over defaults.
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // MOVIEBOX_UPSTREAM_HOST, MOVIEBOX_PROXY_ORIGIN, MOVIEBOX_SERVER_HOST, ...
        builder = builder.add_source(
            Environment::with_prefix("MOVIEBOX")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Get HTTP bind address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.upstream.scheme, "https");
        assert!(config.upstream.host.is_none());
        assert_eq!(config.proxy.origin, "http://localhost:3000");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_http_address() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                http_port: 8080,
            },
            ..Config::default()
        };

        assert_eq!(config.http_address(), "127.0.0.1:8080");
    }
}
