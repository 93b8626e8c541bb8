//! Error types used throughout the bulk coordinator

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ValidationIssue;

/// Main error type for cdnbulk
///
/// Item-level failures are not errors: they are reported through
/// [`crate::ItemStatus::error_message`] and surface as part of a
/// `PARTIALLY_FAILED` or `FAILED` aggregate.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BulkError {
    /// One or more items (or the batch as a whole) failed local validation.
    /// Nothing reached the network.
    #[error("Validation failed: {}", summarize_issues(.issues))]
    ValidationFailed { issues: Vec<ValidationIssue> },

    /// The control-plane refused the batch, or the submission call itself
    /// failed. No job handle exists.
    #[error("Remote rejected batch: {0}")]
    RemoteRejected(String),

    /// Too many consecutive status polls failed. The remote job may still be
    /// running.
    #[error(
        "Polling unavailable for job {job_id} after {consecutive_failures} consecutive failures: {last_error}"
    )]
    PollingUnavailable { job_id: String, consecutive_failures: u32, last_error: String },

    /// The caller-supplied polling timeout elapsed. The remote job was not
    /// cancelled.
    #[error("Polling timed out for job {job_id} after {elapsed_secs}s")]
    PollingTimedOut { job_id: String, elapsed_secs: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BulkError {
    /// Validation issues carried by a [`BulkError::ValidationFailed`], empty
    /// for every other variant.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::ValidationFailed { issues } => issues,
            _ => &[],
        }
    }

    /// Whether the error describes a local polling condition rather than a
    /// remote outcome.
    pub fn is_polling_condition(&self) -> bool {
        matches!(self, Self::PollingUnavailable { .. } | Self::PollingTimedOut { .. })
    }
}

fn summarize_issues(issues: &[ValidationIssue]) -> String {
    match issues {
        [] => "no issues recorded".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// Result type alias for cdnbulk operations
pub type Result<T> = std::result::Result<T, BulkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failed_message_summarizes_issues() {
        let err = BulkError::ValidationFailed {
            issues: vec![
                ValidationIssue::item(2, "network is required"),
                ValidationIssue::item(4, "version must be a positive integer"),
            ],
        };

        let message = err.to_string();
        assert!(message.contains("item 2: network is required"));
        assert!(message.contains("and 1 more"));
        assert_eq!(err.issues().len(), 2);
    }

    #[test]
    fn polling_conditions_are_flagged() {
        let timed_out = BulkError::PollingTimedOut { job_id: "42".into(), elapsed_secs: 30 };
        let unavailable = BulkError::PollingUnavailable {
            job_id: "42".into(),
            consecutive_failures: 5,
            last_error: "connection refused".into(),
        };

        assert!(timed_out.is_polling_condition());
        assert!(unavailable.is_polling_condition());
        assert!(!BulkError::RemoteRejected("429".into()).is_polling_condition());
        assert!(BulkError::Network("down".into()).issues().is_empty());
    }

    #[test]
    fn serializes_with_type_tag() {
        let err = BulkError::NotFound("job 7".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "NotFound");
        assert_eq!(json["message"], "job 7");
    }
}
