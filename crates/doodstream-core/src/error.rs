//! Error types for the DoodStream extractor
//!
//! Provides the extraction error enum with human-readable messages
//! and string serialization for dispatcher-facing responses.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// The network step an upstream failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStep {
    /// Fetching the embed page (`/e/{id}`)
    EmbedPage,
    /// Fetching the pass sub-path that yields the base stream value
    PassMd5,
}

impl fmt::Display for FetchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStep::EmbedPage => f.write_str("embed page"),
            FetchStep::PassMd5 => f.write_str("pass_md5"),
        }
    }
}

/// Failure reported by an [`HttpFetcher`](crate::client::HttpFetcher)
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, body decoding)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// A header name or value could not be sent
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Server answered with an empty body where content was required
    #[error("empty response body")]
    EmptyBody,
}

impl FetchError {
    /// Whether the underlying request timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Http(e) if e.is_timeout())
    }
}

/// Error type for all extraction operations
///
/// Every variant is terminal for the current call. Nothing is retried
/// at the extractor layer.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Source URL could not be parsed or yields no identifier
    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(String),

    /// Embed page does not contain the pass sub-path
    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    /// Embed page does not contain the token
    #[error("Token not found: {0}")]
    TokenNotFound(String),

    /// An upstream request failed
    #[error("Upstream fetch failed ({step}): {source}")]
    UpstreamFetchFailed {
        step: FetchStep,
        #[source]
        source: FetchError,
    },

    /// Extractor configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ExtractorError {
    pub(crate) fn upstream(step: FetchStep, source: FetchError) -> Self {
        ExtractorError::UpstreamFetchFailed { step, source }
    }

    /// Short machine-readable reason tag
    pub fn reason(&self) -> &'static str {
        match self {
            ExtractorError::InvalidSourceUrl(_) => "invalid-url",
            ExtractorError::PatternNotFound(_) => "pattern-not-found",
            ExtractorError::TokenNotFound(_) => "token-not-found",
            ExtractorError::UpstreamFetchFailed { .. } => "upstream-fetch-failed",
            ExtractorError::InvalidConfig(_) => "invalid-config",
        }
    }

    /// Network step that failed, for upstream errors
    pub fn fetch_step(&self) -> Option<FetchStep> {
        match self {
            ExtractorError::UpstreamFetchFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl Serialize for ExtractorError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ExtractorError>;
