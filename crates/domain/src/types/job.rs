//! Job registry records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::operation::{JobId, OperationHandle, OperationType};
use super::status::{AggregatedStatus, ItemStatus, OverallState};

/// Why a job is, or is no longer, being polled in the background
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingState {
    /// No background loop has been started for the job
    Idle,
    /// A background loop is polling the job
    Active,
    /// The loop was stopped locally (shutdown, explicit stop or terminal
    /// state reached)
    Stopped,
    /// The caller's polling timeout elapsed; the remote job was left running
    TimedOut,
    /// Too many consecutive polls failed
    Unavailable(String),
}

/// Everything the registry keeps about one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub handle: OperationHandle,
    pub items: Vec<ItemStatus>,
    /// Set once the remote confirmed a cancellation that affected at least
    /// one pending item
    pub cancelled: bool,
    /// Set once the terminal notification has been emitted
    pub notified: bool,
    pub tracking: TrackingState,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// New record with every item in `SUBMITTED`
    pub fn submitted<I, S>(handle: OperationHandle, item_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let updated_at = handle.submitted_at;
        Self {
            handle,
            items: item_ids.into_iter().map(ItemStatus::submitted).collect(),
            cancelled: false,
            notified: false,
            tracking: TrackingState::Idle,
            updated_at,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.handle.job_id
    }

    pub fn operation_type(&self) -> OperationType {
        self.handle.operation_type
    }
}

/// Read model returned to callers: handle, aggregate and per-item detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub handle: OperationHandle,
    pub status: AggregatedStatus,
    pub items: Vec<ItemStatus>,
    pub tracking: TrackingState,
}

/// Terminal-state notification, emitted once per job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: JobId,
    pub operation_type: OperationType,
    pub overall_state: OverallState,
    pub summary: String,
}

impl JobEvent {
    pub fn from_status(operation_type: OperationType, status: &AggregatedStatus) -> Self {
        Self {
            job_id: status.job_id.clone(),
            operation_type,
            overall_state: status.overall_state,
            summary: status.summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemState;

    #[test]
    fn submitted_record_starts_idle_with_submitted_items() {
        let handle = OperationHandle {
            job_id: JobId::from("77"),
            operation_type: OperationType::Activation,
            submitted_at: Utc::now(),
            item_count: 2,
        };

        let record = JobRecord::submitted(handle.clone(), ["a", "b"]);

        assert_eq!(record.job_id(), &handle.job_id);
        assert_eq!(record.items.len(), 2);
        assert!(record.items.iter().all(|item| item.state == ItemState::Submitted));
        assert_eq!(record.tracking, TrackingState::Idle);
        assert!(!record.cancelled);
        assert!(!record.notified);
    }

    #[test]
    fn tracking_state_serializes_reason() {
        let json = serde_json::to_value(TrackingState::Unavailable("503".into())).unwrap();
        assert_eq!(json, serde_json::json!({"state": "UNAVAILABLE", "reason": "503"}));
    }
}
