//! In-memory fakes for `RemoteJobService`, `JobRegistry` and `JobNotifier`

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cdnbulk_core::bulk::merge::{apply_cancellation, apply_remote_states};
use cdnbulk_core::{JobNotifier, JobRegistry, MergeOutcome, RemoteJobService};
use cdnbulk_domain::{
    BulkError, BulkOperationRequest, CancelAck, ItemState, JobEvent, JobId, JobRecord,
    OperationType, RemoteItemStatus, RemoteJobStatus, Result, TrackingState,
};
use chrono::{DateTime, Utc};

/// Remote job service returning scripted responses and counting calls.
///
/// Status responses are consumed in order; the last one repeats once the
/// script runs out.
pub struct FakeRemote {
    job_id: JobId,
    forbid_submit: bool,
    submit_error: Option<BulkError>,
    cancel_ack: bool,
    statuses: Mutex<VecDeque<Result<RemoteJobStatus>>>,
    last_status: Mutex<Option<Result<RemoteJobStatus>>>,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            forbid_submit: false,
            submit_error: None,
            cancel_ack: true,
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(None),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    /// Fail the test if a submission is ever attempted
    pub fn forbidding_submission() -> Self {
        Self { forbid_submit: true, ..Self::new("never") }
    }

    pub fn rejecting(error: BulkError) -> Self {
        Self { submit_error: Some(error), ..Self::new("never") }
    }

    pub fn declining_cancellation(mut self) -> Self {
        self.cancel_ack = false;
        self
    }

    /// Queue a status where each `(item_id, state)` pair is reported
    pub fn then_report(self, items: &[(&str, ItemState)]) -> Self {
        let status = RemoteJobStatus {
            overall: None,
            items: items.iter().map(|(id, state)| RemoteItemStatus::new(*id, *state)).collect(),
        };
        self.then(Ok(status))
    }

    pub fn then(self, response: Result<RemoteJobStatus>) -> Self {
        self.statuses.lock().unwrap().push_back(response);
        self
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteJobService for FakeRemote {
    async fn submit_batch(&self, _request: &BulkOperationRequest) -> Result<JobId> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!self.forbid_submit, "submission must not be attempted");
        match &self.submit_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.job_id.clone()),
        }
    }

    async fn get_job_status(
        &self,
        _operation_type: OperationType,
        _job_id: &JobId,
    ) -> Result<RemoteJobStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        let mut last = self.last_status.lock().unwrap();
        if let Some(next) = next {
            *last = Some(next);
        }
        last.clone().unwrap_or_else(|| Err(BulkError::Network("no status scripted".into())))
    }

    async fn cancel_job(&self, _operation_type: OperationType, _job_id: &JobId) -> Result<CancelAck> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CancelAck { accepted: self.cancel_ack })
    }
}

/// Mutex-guarded map registry using the core merge functions
#[derive(Default)]
pub struct MemoryRegistry {
    records: Mutex<HashMap<JobId, JobRecord>>,
}

impl MemoryRegistry {
    fn with_record<T>(&self, job_id: &JobId, f: impl FnOnce(&mut JobRecord) -> T) -> Result<T> {
        let mut records = self.records.lock().unwrap();
        let record =
            records.get_mut(job_id).ok_or_else(|| BulkError::NotFound(job_id.to_string()))?;
        let out = f(record);
        record.updated_at = Utc::now();
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl JobRegistry for MemoryRegistry {
    async fn put(&self, record: JobRecord) -> Result<()> {
        self.records.lock().unwrap().insert(record.job_id().clone(), record);
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        Ok(self.records.lock().unwrap().get(job_id).cloned())
    }

    async fn update_item_statuses(
        &self,
        job_id: &JobId,
        updates: &[RemoteItemStatus],
    ) -> Result<(JobRecord, MergeOutcome)> {
        self.with_record(job_id, |record| {
            let outcome = apply_remote_states(&mut record.items, updates, Utc::now());
            (record.clone(), outcome)
        })
    }

    async fn record_cancellation(
        &self,
        job_id: &JobId,
        final_updates: &[RemoteItemStatus],
    ) -> Result<JobRecord> {
        self.with_record(job_id, |record| {
            let now = Utc::now();
            apply_remote_states(&mut record.items, final_updates, now);
            if apply_cancellation(&mut record.items, now) > 0 {
                record.cancelled = true;
            }
            record.clone()
        })
    }

    async fn set_tracking(&self, job_id: &JobId, tracking: TrackingState) -> Result<()> {
        self.with_record(job_id, |record| record.tracking = tracking)
    }

    async fn mark_notified(&self, job_id: &JobId) -> Result<bool> {
        self.with_record(job_id, |record| !std::mem::replace(&mut record.notified, true))
    }

    async fn evict(&self, job_id: &JobId) -> Result<bool> {
        Ok(self.records.lock().unwrap().remove(job_id).is_some())
    }

    async fn evict_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<JobId>> {
        let mut records = self.records.lock().unwrap();
        let expired: Vec<JobId> = records
            .values()
            .filter(|record| record.updated_at < cutoff)
            .map(|record| record.job_id().clone())
            .collect();
        for job_id in &expired {
            records.remove(job_id);
        }
        Ok(expired)
    }

    async fn job_ids(&self) -> Result<Vec<JobId>> {
        Ok(self.records.lock().unwrap().keys().cloned().collect())
    }
}

/// Notifier that records every event it receives
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<JobEvent>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobNotifier for RecordingNotifier {
    async fn notify(&self, event: &JobEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(BulkError::Network("sink offline".into()));
        }
        Ok(())
    }
}
