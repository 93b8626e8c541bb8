//! Process-local job registry
//!
//! Records live in a map of per-job async mutexes. The outer map lock is
//! only held to look up, insert or remove an entry, never across an await,
//! so polls of different jobs do not contend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cdnbulk_core::bulk::{apply_cancellation, apply_remote_states};
use cdnbulk_core::{JobRegistry, MergeOutcome};
use cdnbulk_domain::{BulkError, JobId, JobRecord, RemoteItemStatus, Result, TrackingState};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, warn};

type JobSlot = Arc<Mutex<JobRecord>>;
type JobMap = RwLock<HashMap<JobId, JobSlot>>;

/// [`JobRegistry`] backed by an in-memory map
#[derive(Default)]
pub struct InMemoryJobRegistry {
    jobs: JobMap,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    fn slot(&self, job_id: &JobId) -> Result<JobSlot> {
        self.jobs
            .read()
            .get(job_id)
            .cloned()
            .ok_or_else(|| BulkError::NotFound(format!("job {job_id}")))
    }

    /// Run `f` on the record under its lock and bump `updated_at`
    async fn mutate<T>(&self, job_id: &JobId, f: impl FnOnce(&mut JobRecord) -> T) -> Result<T> {
        let slot = self.slot(job_id)?;
        let mut record = slot.lock().await;
        let out = f(&mut record);
        record.updated_at = Utc::now();
        Ok(out)
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn put(&self, record: JobRecord) -> Result<()> {
        let job_id = record.job_id().clone();
        let previous = self.jobs.write().insert(job_id.clone(), Arc::new(Mutex::new(record)));
        if previous.is_some() {
            warn!(job_id = %job_id, "Replaced existing job record");
        }
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        let slot = self.jobs.read().get(job_id).cloned();
        match slot {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn update_item_statuses(
        &self,
        job_id: &JobId,
        updates: &[RemoteItemStatus],
    ) -> Result<(JobRecord, MergeOutcome)> {
        self.mutate(job_id, |record| {
            let outcome = apply_remote_states(&mut record.items, updates, Utc::now());
            (record.clone(), outcome)
        })
        .await
    }

    async fn record_cancellation(
        &self,
        job_id: &JobId,
        final_updates: &[RemoteItemStatus],
    ) -> Result<JobRecord> {
        self.mutate(job_id, |record| {
            let now = Utc::now();
            apply_remote_states(&mut record.items, final_updates, now);
            let affected = apply_cancellation(&mut record.items, now);
            if affected > 0 {
                record.cancelled = true;
            }
            debug!(job_id = %job_id, affected, "Applied cancellation");
            record.clone()
        })
        .await
    }

    async fn set_tracking(&self, job_id: &JobId, tracking: TrackingState) -> Result<()> {
        self.mutate(job_id, |record| record.tracking = tracking).await
    }

    async fn mark_notified(&self, job_id: &JobId) -> Result<bool> {
        self.mutate(job_id, |record| !std::mem::replace(&mut record.notified, true)).await
    }

    async fn evict(&self, job_id: &JobId) -> Result<bool> {
        Ok(self.jobs.write().remove(job_id).is_some())
    }

    async fn evict_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<JobId>> {
        let slots: Vec<(JobId, JobSlot)> =
            self.jobs.read().iter().map(|(id, slot)| (id.clone(), Arc::clone(slot))).collect();

        let mut expired = Vec::new();
        for (job_id, slot) in slots {
            if slot.lock().await.updated_at < cutoff {
                expired.push(job_id);
            }
        }

        if !expired.is_empty() {
            let mut jobs = self.jobs.write();
            for job_id in &expired {
                jobs.remove(job_id);
            }
        }
        Ok(expired)
    }

    async fn job_ids(&self) -> Result<Vec<JobId>> {
        Ok(self.jobs.read().keys().cloned().collect())
    }
}
