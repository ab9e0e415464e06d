//! Error types for Solidafy Pager
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for Solidafy Pager
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Background fetch did not complete: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    // ============================================================================
    // Pagination Errors
    // ============================================================================
    #[error("Malformed page at '{path}': {message}")]
    MalformedPage { path: String, message: String },

    #[error("Response does not report a total page count at '{path}'")]
    MissingTotalPages { path: String },

    #[error("Strategy '{strategy}' does not support async pagination")]
    AsyncUnsupported { strategy: String },

    #[error("Snapshot does not match this paginator: {message}")]
    ResumeMismatch { message: String },

    #[error("Snapshot error: {message}")]
    Snapshot { message: String },

    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed page error
    pub fn malformed_page(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a resume mismatch error
    pub fn resume_mismatch(message: impl Into<String>) -> Self {
        Self::ResumeMismatch {
            message: message.into(),
        }
    }

    /// Create a snapshot error
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Create a JSONPath error
    pub fn json_path(message: impl Into<String>) -> Self {
        Self::JsonPath {
            message: message.into(),
        }
    }

    /// Check if this error came from the HTTP layer
    ///
    /// These are the failures that stop a paginator; retrying them is left
    /// to the caller.
    pub fn is_http_failure(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::HttpStatus { .. } | Error::Timeout { .. }
        )
    }
}

/// Result type alias for Solidafy Pager
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("pagination");
        assert_eq!(err.to_string(), "Missing required config field: pagination");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::malformed_page("data", "expected an array");
        assert_eq!(
            err.to_string(),
            "Malformed page at 'data': expected an array"
        );
    }

    #[test]
    fn test_is_http_failure() {
        assert!(Error::http_status(500, "").is_http_failure());
        assert!(Error::http_status(404, "").is_http_failure());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_http_failure());

        assert!(!Error::malformed_page("data", "missing").is_http_failure());
        assert!(!Error::json_path("bad").is_http_failure());
        assert!(!Error::config("test").is_http_failure());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
