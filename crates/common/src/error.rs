use std::time::Duration;
use thiserror::Error;

/// Outcome of a single failed HTTP attempt, tagged so callers can match on
/// the kind of failure instead of probing a transport error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {status}")]
    HttpStatus {
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::HttpStatus { status: 429, .. })
    }

    /// The server-provided `retry-after` delay, only meaningful on a 429.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::HttpStatus {
                status: 429,
                retry_after,
            } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("decoding failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("payload rejected: {0}")]
    RejectedPayload(String),

    #[error("cache error: {0}")]
    Cache(String),
}

pub type WidgetResult<T> = Result<T, WidgetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_only_on_429() {
        let limited = FetchError::HttpStatus {
            status: 429,
            retry_after: Some(Duration::from_secs(5)),
        };
        assert!(limited.is_rate_limited());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(5)));

        let unavailable = FetchError::HttpStatus {
            status: 503,
            retry_after: Some(Duration::from_secs(5)),
        };
        assert!(!unavailable.is_rate_limited());
        assert_eq!(unavailable.retry_after(), None);
        assert_eq!(FetchError::Timeout.retry_after(), None);
    }

    #[test]
    fn test_fetch_error_converts_into_widget_error() {
        let err: WidgetError = FetchError::Timeout.into();
        assert_eq!(err.to_string(), "fetch failed: request timed out");
    }
}
