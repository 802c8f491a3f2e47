//! Client error types

use thiserror::Error;

/// Maximum response body size for upstream HTTP calls (16 MB).
/// Prevents OOM from malicious or misconfigured upstream servers.
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Error type for the MovieBox HTTP client.
///
/// Diagnostic snippets are short, pre-extracted summaries (page title or
/// tag-stripped text), never the raw HTML body.
#[derive(Debug, Error)]
pub enum MovieBoxError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status}: {snippet}")]
    Http {
        status: reqwest::StatusCode,
        snippet: String,
    },

    #[error("Unsuccessful response from server: {message}")]
    Api { message: String },

    #[error("Invalid JSON response (status {status}): {snippet}")]
    Malformed {
        status: reqwest::StatusCode,
        snippet: String,
    },

    #[error("All mirror hosts attempted and failed: {hosts}")]
    MirrorsExhausted { hosts: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl MovieBoxError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Transport failures and upstream 5xx are transient; logical API
    /// errors and malformed bodies are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for MovieBoxError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for MovieBoxError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_network() {
        let err = MovieBoxError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn test_error_display_api() {
        let err = MovieBoxError::Api {
            message: "rate limited".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsuccessful response from server: rate limited"
        );
    }

    #[test]
    fn test_error_display_malformed_carries_snippet() {
        let err = MovieBoxError::Malformed {
            status: reqwest::StatusCode::OK,
            snippet: "Verify you are human".to_string(),
        };
        assert!(err.to_string().contains("Verify you are human"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(MovieBoxError::Network("timed out".to_string()).is_transient());
        assert!(MovieBoxError::Http {
            status: reqwest::StatusCode::BAD_GATEWAY,
            snippet: String::new(),
        }
        .is_transient());
        assert!(!MovieBoxError::Http {
            status: reqwest::StatusCode::FORBIDDEN,
            snippet: String::new(),
        }
        .is_transient());
        assert!(!MovieBoxError::Api {
            message: "nope".to_string(),
        }
        .is_transient());
    }
}
