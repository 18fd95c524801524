//! Error types for compound document resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a resolution call.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    // Fetch errors under the fail strategy (exit code 1, or 3 for transport)
    #[error("fetching '{resource_type}' failed: {source}")]
    Fetch {
        resource_type: String,
        #[source]
        source: FetchError,
    },
}

/// Failure of a single per-type batch fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no endpoint registered for type '{resource_type}'")]
    NoEndpoint { resource_type: String },

    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot load {path}: {message}")]
    Source { path: PathBuf, message: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => 3,
            ResolveError::Fetch { source, .. } => source.exit_code(),
            _ => 2,
        }
    }

    pub(crate) fn invalid_document(message: impl Into<String>) -> Self {
        ResolveError::InvalidDocument {
            message: message.into(),
        }
    }
}

impl FetchError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            #[cfg(feature = "remote")]
            FetchError::Network { .. } => 3,
            FetchError::Timeout { .. } => 3,
            _ => 1,
        }
    }
}
