//! Item and job status types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use super::operation::JobId;

/// State of a single item as observed from the control-plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    Submitted,
    InProgress,
    Completed,
    Failed,
}

crate::impl_domain_status_conversions!(ItemState {
    Submitted => "SUBMITTED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Failed => "FAILED",
});

impl ItemState {
    /// `COMPLETED` and `FAILED` are final; an item never leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Last known state of one item in a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ItemStatus {
    pub item_id: String,
    pub state: ItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts-gen", ts(type = "string", optional))]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ItemStatus {
    /// Fresh status for an item that has just been submitted
    pub fn submitted(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            state: ItemState::Submitted,
            completed_at: None,
            error_message: None,
        }
    }
}

/// Overall classification of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallState {
    Pending,
    InProgress,
    Completed,
    PartiallyFailed,
    Failed,
    Cancelled,
}

crate::impl_domain_status_conversions!(OverallState {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    PartiallyFailed => "PARTIALLY_FAILED",
    Failed => "FAILED",
    Cancelled => "CANCELLED",
});

impl OverallState {
    /// `COMPLETED`, `PARTIALLY_FAILED`, `FAILED` or `CANCELLED`
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyFailed | Self::Failed | Self::Cancelled)
    }
}

/// Progress summary derived from a job's item statuses
///
/// Never stored on its own: it is recomputed from the item set every time it
/// is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStatus {
    pub job_id: JobId,
    pub overall_state: OverallState,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Items not yet terminal (`SUBMITTED` or `IN_PROGRESS`)
    pub in_progress: usize,
    /// `completed / total * 100`, rounded down
    pub completion_percentage: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AggregatedStatus {
    /// No further transition will happen
    pub fn is_terminal(&self) -> bool {
        self.overall_state.is_terminal()
    }

    /// One-line human summary, used for notifications and logs
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}: {}/{} completed, {} failed, {} in progress ({}%)",
            self.overall_state,
            self.completed,
            self.total,
            self.failed,
            self.in_progress,
            self.completion_percentage
        );
        if let Some(note) = &self.note {
            summary.push_str("; ");
            summary.push_str(note);
        }
        summary
    }
}

/// Per-item state as reported by one remote status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItemStatus {
    pub item_id: String,
    pub state: ItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemoteItemStatus {
    pub fn new(item_id: impl Into<String>, state: ItemState) -> Self {
        Self { item_id: item_id.into(), state, error: None }
    }

    pub fn failed(item_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self { item_id: item_id.into(), state: ItemState::Failed, error: Some(error.into()) }
    }
}

/// Result of one remote status query
///
/// `overall` is the remote's own label, kept for diagnostics only; the
/// aggregate is always derived from the items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteJobStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall: Option<String>,
    #[serde(default)]
    pub items: Vec<RemoteItemStatus>,
}

/// Answer to a remote cancellation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAck {
    pub accepted: bool,
}
