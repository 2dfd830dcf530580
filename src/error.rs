//! Error types for scrapecheck
//!
//! Parse and assertion failures abort the current test case. Teardown failures
//! are collected by [`crate::trap::TrapAggregator`] and surface once, together.

use crate::exposition::MetricsFormat;
use crate::trap::TeardownFailure;
use std::fmt;
use thiserror::Error;

/// Where inside a response body a format violation was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// 1-based line number (text formats)
    Line(usize),
    /// 0-based byte offset (protobuf, or invalid UTF-8 in text formats)
    ByteOffset(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(line) => write!(f, "line {}", line),
            Location::ByteOffset(offset) => write!(f, "byte offset {}", offset),
        }
    }
}

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed {format} body at {location}: {reason}")]
    FormatViolation {
        format: MetricsFormat,
        location: Location,
        reason: String,
    },

    #[error("Unsupported content type: {}", content_type.as_deref().unwrap_or("<missing>"))]
    UnsupportedContentType { content_type: Option<String> },

    #[error("Assertion '{check}' failed: expected {expected:?}, actual {actual:?}")]
    AssertionFailure {
        check: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    TeardownFailure(#[from] TeardownFailure),

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Exporter at {url} did not become ready within {waited_seconds} seconds")]
    ReadinessTimeout { url: String, waited_seconds: u64 },

    #[error("Provisioning failed for {resource}: {reason}")]
    Provisioning { resource: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build an assertion failure carrying expected and actual values
    pub fn assertion(
        check: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::AssertionFailure {
            check: check.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Build a format violation for the given format and location
    pub fn format_violation(
        format: MetricsFormat,
        location: Location,
        reason: impl Into<String>,
    ) -> Self {
        Self::FormatViolation {
            format,
            location,
            reason: reason.into(),
        }
    }

    /// Returns true for failures reported by the assertion library
    pub fn is_assertion_failure(&self) -> bool {
        matches!(self, Self::AssertionFailure { .. })
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
