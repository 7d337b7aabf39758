//! Error taxonomy for the data access layer.
//!
//! Every failure a query can resolve to is a [`QueryError`]. The type is
//! `Clone` because a single fetch result is broadcast to every caller that
//! coalesced onto the same in-flight request.

/// Failure of a remote query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Transport failure: DNS, connection refused, timeout-triggered abort.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status code.
    #[error("http {status} for {path}")]
    HttpStatus { status: u16, path: String },

    /// The body could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// A query was issued without a key part it needs (e.g. no version selected).
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
}

impl QueryError {
    /// Whether the cache should retry a fetch that failed with this error.
    ///
    /// Transport failures are always retried. Status failures are retried only
    /// for 408, 429 and 5xx; every other 4xx is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            QueryError::Network(_) => true,
            QueryError::HttpStatus { status, .. } => {
                matches!(*status, 408 | 429) || *status >= 500
            }
            QueryError::Decode(_) | QueryError::MissingParameter(_) => false,
        }
    }

    /// HTTP status code, if this is a status failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> QueryError {
        QueryError::HttpStatus {
            status: code,
            path: "/x".into(),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(status(408).is_retryable());
        assert!(status(429).is_retryable());
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
    }

    #[test]
    fn test_client_errors_are_final() {
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(499).is_retryable());
    }

    #[test]
    fn test_other_kinds() {
        assert!(QueryError::Network("reset".into()).is_retryable());
        assert!(!QueryError::Decode("eof".into()).is_retryable());
        assert!(!QueryError::MissingParameter("version").is_retryable());
        assert_eq!(status(404).status(), Some(404));
        assert_eq!(QueryError::Network("x".into()).status(), None);
    }
}
