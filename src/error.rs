//! Error types for the response cache
//!
//! Fetch failures are cloneable so that one in-flight upstream request can hand the
//! same result to every caller waiting on it.

use thiserror::Error;

/// Errors that can occur when fetching from an upstream API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not complete within its timeout
    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Upstream answered with a non-success status code
    #[error("Upstream {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Connection, DNS or protocol failure
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The response body was not valid JSON
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// Returns the URL of the request that failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Request { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }

    /// Classifies a reqwest error raised while requesting `url`
    pub(crate) fn from_reqwest(url: &str, timeout_ms: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_ms,
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            FetchError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Errors that can occur when reading or writing the snapshot file
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Reading, writing or renaming the file failed
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents were not a valid snapshot
    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the cache handle
#[derive(Debug, Error)]
pub enum CacheError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// A cold fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The cached payload did not have the requested shape
    #[error("Cached payload has unexpected shape: {0}")]
    Deserialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_is_reported_for_every_variant() {
        let errors = [
            FetchError::Timeout {
                url: "http://a".to_string(),
                timeout_ms: 100,
            },
            FetchError::Status {
                url: "http://a".to_string(),
                status: 503,
            },
            FetchError::Request {
                url: "http://a".to_string(),
                message: "refused".to_string(),
            },
            FetchError::Decode {
                url: "http://a".to_string(),
                message: "eof".to_string(),
            },
        ];

        for err in &errors {
            assert_eq!(err.url(), "http://a");
        }
    }

    #[test]
    fn test_display_messages() {
        let timeout = FetchError::Timeout {
            url: "http://upstream/x".to_string(),
            timeout_ms: 3000,
        };
        assert_eq!(
            timeout.to_string(),
            "Request to http://upstream/x timed out after 3000ms"
        );

        let status = FetchError::Status {
            url: "http://upstream/x".to_string(),
            status: 404,
        };
        assert_eq!(status.to_string(), "Upstream http://upstream/x returned HTTP 404");
    }

    #[test]
    fn test_cache_error_is_transparent_for_fetch_errors() {
        let inner = FetchError::Status {
            url: "http://upstream/x".to_string(),
            status: 500,
        };
        let err = CacheError::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
    }
}
