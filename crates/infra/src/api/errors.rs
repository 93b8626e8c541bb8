//! Control-plane API error types
//!
//! Classifies failures of control-plane calls so callers can decide whether
//! a retry makes sense, then folds them into [`BulkError`] at the port
//! boundary.

use std::time::Duration;

use cdnbulk_domain::BulkError;
use thiserror::Error;

/// Coarse grouping used to decide whether a failed call may be repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// 401/403; worth one more try once the token is refreshed
    Authentication,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// Remaining 4xx and undecodable bodies; repeating will not help
    Client,
    /// Transport failures and timeouts
    Network,
    /// Local misconfiguration
    Config,
}

/// Control-plane API errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) | Self::NotFound(_) | Self::Decode(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Whether repeating the same call could succeed
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::Authentication
                | ApiErrorCategory::RateLimit
                | ApiErrorCategory::Server
                | ApiErrorCategory::Network
        )
    }
}

impl From<BulkError> for ApiError {
    fn from(err: BulkError) -> Self {
        match err {
            BulkError::Network(message) => Self::Network(message),
            BulkError::Auth(message) => Self::Auth(message),
            BulkError::Config(message) => Self::Config(message),
            BulkError::NotFound(message) => Self::NotFound(message),
            BulkError::InvalidInput(message) | BulkError::RemoteRejected(message) => {
                Self::Client(message)
            }
            other => Self::Server(other.to_string()),
        }
    }
}

impl From<ApiError> for BulkError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(message) => Self::Auth(message),
            ApiError::NotFound(message) => Self::NotFound(message),
            ApiError::Config(message) => Self::Config(message),
            ApiError::Client(message) => Self::InvalidInput(message),
            ApiError::Decode(message) | ApiError::Server(message) => Self::Remote(message),
            ApiError::RateLimit(_) | ApiError::Network(_) | ApiError::Timeout(_) => {
                Self::Network(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(ApiError::Auth("t".into()).category(), ApiErrorCategory::Authentication);
        assert_eq!(ApiError::RateLimit("t".into()).category(), ApiErrorCategory::RateLimit);
        assert_eq!(ApiError::Server("t".into()).category(), ApiErrorCategory::Server);
        assert_eq!(ApiError::Decode("t".into()).category(), ApiErrorCategory::Client);
        assert_eq!(
            ApiError::Timeout(Duration::from_secs(1)).category(),
            ApiErrorCategory::Network
        );
    }

    #[test]
    fn test_should_retry() {
        assert!(ApiError::RateLimit("t".into()).should_retry());
        assert!(ApiError::Server("t".into()).should_retry());
        assert!(ApiError::Network("t".into()).should_retry());
        assert!(!ApiError::Client("t".into()).should_retry());
        assert!(!ApiError::NotFound("t".into()).should_retry());
        assert!(!ApiError::Config("t".into()).should_retry());
    }

    #[test]
    fn test_domain_mapping() {
        assert!(matches!(BulkError::from(ApiError::RateLimit("429".into())), BulkError::Network(_)));
        assert!(matches!(BulkError::from(ApiError::NotFound("x".into())), BulkError::NotFound(_)));
        assert!(matches!(BulkError::from(ApiError::Decode("x".into())), BulkError::Remote(_)));
        assert!(matches!(ApiError::from(BulkError::Auth("x".into())), ApiError::Auth(_)));
    }
}
