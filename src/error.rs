// src/error.rs

//! Unified error handling for the catalog proxy.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A single upstream request failed (transport, timeout, status, or body)
    #[error("Fetch failed for {target}: {message}")]
    Fetch { target: String, message: String },

    /// A pagination crawl was aborted
    #[error("Crawl error for {context}: {message}")]
    Crawl { context: String, message: String },

    /// A referenced record could not be resolved
    #[error("Resolution of {reference} in {record} failed: {message}")]
    Resolution {
        record: String,
        reference: String,
        message: String,
    },

    /// The overall request deadline elapsed
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// Upstream returned an object that cannot be used as a record or page
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The cache worker has shut down
    #[error("Record cache is no longer running")]
    CacheClosed,

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be constructed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    /// Create a fetch error for a target URL.
    pub fn fetch(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a crawl error with context.
    pub fn crawl(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Crawl {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a resolution error for one reference of a record.
    pub fn resolution(
        record: impl Into<String>,
        reference: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Resolution {
            record: record.into(),
            reference: reference.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Response status a request handler should answer with for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Fetch { .. }
            | Self::Crawl { .. }
            | Self::Resolution { .. }
            | Self::InvalidRecord(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::fetch("/api/people/", "boom").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::crawl("/api/people/", "loop").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Timeout {
                operation: "collection people".into(),
                after_ms: 3000
            }
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::CacheClosed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_resolution_message_names_both_urls() {
        let err = AppError::resolution("/people/1/", "/films/2/", "timeout");
        let text = err.to_string();
        assert!(text.contains("/people/1/"));
        assert!(text.contains("/films/2/"));
    }
}
