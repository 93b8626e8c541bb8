//! Port interfaces for bulk job coordination

use async_trait::async_trait;
use cdnbulk_domain::{
    BulkOperationRequest, CancelAck, JobEvent, JobId, JobRecord, OperationType, RemoteItemStatus,
    RemoteJobStatus, Result, TrackingState,
};
use chrono::{DateTime, Utc};

use super::merge::MergeOutcome;

/// The remote control-plane that runs bulk jobs
///
/// Treated as opaque and unreliable: calls may time out and status reports
/// may be stale.
#[async_trait]
pub trait RemoteJobService: Send + Sync {
    /// Submit a validated batch. Called at most once per batch; callers must
    /// not retry ambiguous failures.
    async fn submit_batch(&self, request: &BulkOperationRequest) -> Result<JobId>;

    /// Current per-item states of a job
    async fn get_job_status(
        &self,
        operation_type: OperationType,
        job_id: &JobId,
    ) -> Result<RemoteJobStatus>;

    /// Ask the remote to stop a job. Best effort.
    async fn cancel_job(&self, operation_type: OperationType, job_id: &JobId) -> Result<CancelAck>;
}

/// Store of submitted jobs keyed by job id
///
/// All item mutation goes through this trait. Implementations must apply
/// each mutating call under a per-job lock, so that a manual poll and a
/// background poll of the same job cannot interleave.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Insert or replace a record
    async fn put(&self, record: JobRecord) -> Result<()>;

    async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>>;

    /// Merge remote item states into the record (see
    /// [`crate::bulk::merge::apply_remote_states`]) and return the updated
    /// record. Fails with `NotFound` for unknown jobs.
    async fn update_item_statuses(
        &self,
        job_id: &JobId,
        updates: &[RemoteItemStatus],
    ) -> Result<(JobRecord, MergeOutcome)>;

    /// Apply a confirmed cancellation in one critical section: merge the
    /// final remote states, fail every item still pending and flag the
    /// record as cancelled when at least one item was affected.
    async fn record_cancellation(
        &self,
        job_id: &JobId,
        final_updates: &[RemoteItemStatus],
    ) -> Result<JobRecord>;

    async fn set_tracking(&self, job_id: &JobId, tracking: TrackingState) -> Result<()>;

    /// Flip the `notified` flag. Returns `true` only for the call that
    /// flipped it, so the terminal notification goes out once.
    async fn mark_notified(&self, job_id: &JobId) -> Result<bool>;

    /// Remove a record. Returns whether one was present.
    async fn evict(&self, job_id: &JobId) -> Result<bool>;

    /// Remove every record last updated before `cutoff`
    async fn evict_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<JobId>>;

    async fn job_ids(&self) -> Result<Vec<JobId>>;
}

/// Sink for terminal-state events. Fire and forget: a failing notifier never
/// fails the job.
#[async_trait]
pub trait JobNotifier: Send + Sync {
    async fn notify(&self, event: &JobEvent) -> Result<()>;
}
