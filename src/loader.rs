//! Document loading from various sources.
//!
//! Handles loading documents from files, strings, stdin, and HTTP URLs.

use std::path::Path;

use serde_json::Value;
use tokio::io::AsyncReadExt;

use crate::error::ResolveError;

#[cfg(feature = "remote")]
use crate::endpoint::JSON_API_MEDIA_TYPE;
#[cfg(feature = "remote")]
use crate::error::FetchError;
#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Source name that reads from standard input.
pub const STDIN_SOURCE: &str = "-";

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `ResolveError::FileNotFound` if the file doesn't exist,
/// or `ResolveError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, ResolveError> {
    load_document_str(&read_file(path)?)
}

/// Load a document from a JSON string.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, ResolveError> {
    serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson { source })
}

/// Read all of standard input.
async fn read_stdin() -> Result<String, ResolveError> {
    let mut content = String::new();
    tokio::io::stdin()
        .read_to_string(&mut content)
        .await
        .map_err(|source| ResolveError::ReadError {
            path: STDIN_SOURCE.into(),
            source,
        })?;
    Ok(content)
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `ResolveError::Fetch` if the request fails or returns a non-2xx
/// status, or `ResolveError::InvalidJson` if the response isn't valid JSON.
#[cfg(feature = "remote")]
pub async fn load_document_url(url: &str) -> Result<Value, ResolveError> {
    load_document_str(&read_url(url).await?)
}

#[cfg(feature = "remote")]
async fn read_url(url: &str) -> Result<String, ResolveError> {
    let network = |source: reqwest::Error| ResolveError::Fetch {
        resource_type: url.to_string(),
        source: FetchError::Network {
            url: url.to_string(),
            source,
        },
    };

    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, JSON_API_MEDIA_TYPE)
        .send()
        .await
        .map_err(network)?;

    // Check for HTTP errors before parsing
    let status = response.status();
    if !status.is_success() {
        return Err(ResolveError::Fetch {
            resource_type: url.to_string(),
            source: FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            },
        });
    }

    response.text().await.map_err(network)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path, URL, or `-` for stdin.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub async fn load_document_auto(source: &str) -> Result<Value, ResolveError> {
    load_document_str(&read_source(source).await?)
}

/// Raw text of a file path, URL, or `-` for stdin, without parsing it.
///
/// # Errors
///
/// Same as [`load_document_auto`], minus `ResolveError::InvalidJson`.
pub async fn read_source(source: &str) -> Result<String, ResolveError> {
    if source == STDIN_SOURCE {
        return read_stdin().await;
    }
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            read_url(source).await
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(ResolveError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        read_file(Path::new(source))
    }
}

fn read_file(path: &Path) -> Result<String, ResolveError> {
    if !path.exists() {
        return Err(ResolveError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| ResolveError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}
