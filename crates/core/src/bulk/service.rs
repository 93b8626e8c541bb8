//! Bulk operation service - submit, poll and cancel use cases

use std::sync::Arc;

use cdnbulk_domain::{
    AggregatedStatus, BulkError, BulkOperationConfig, BulkOperationRequest, JobEvent, JobId,
    JobRecord, JobSnapshot, OperationHandle, OperationType, Result, TrackingState,
};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::aggregator::aggregate_record;
use super::assembler;
use super::merge::apply_remote_states;
use super::ports::{JobNotifier, JobRegistry, RemoteJobService};
use super::rules::RuleSet;

/// Outcome of one status poll
///
/// `status` is always well-formed: when the remote could not be reached it is
/// the last known aggregate and `remote_error` says why nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// Aggregate after folding in this poll
    pub status: AggregatedStatus,
    /// Why the remote answer was not applied, if it was not
    pub remote_error: Option<BulkError>,
}

impl PollReport {
    /// Whether the reported aggregate is terminal
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Coordinates bulk jobs against a remote control-plane
pub struct BulkOperationService {
    rules: Arc<RuleSet>,
    remote: Arc<dyn RemoteJobService>,
    registry: Arc<dyn JobRegistry>,
    notifier: Option<Arc<dyn JobNotifier>>,
}

impl BulkOperationService {
    /// Create a service with the standard rule set and no notifier
    pub fn new(remote: Arc<dyn RemoteJobService>, registry: Arc<dyn JobRegistry>) -> Self {
        Self { rules: Arc::new(RuleSet::standard()), remote, registry, notifier: None }
    }

    /// Replace the rule set
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// Emit an event to `notifier` when a job reaches a terminal state
    pub fn with_notifier(mut self, notifier: Arc<dyn JobNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Registry holding every tracked job
    pub fn registry(&self) -> &Arc<dyn JobRegistry> {
        &self.registry
    }

    /// Validate `payloads` into a request without touching the network
    pub fn assemble(
        &self,
        operation_type: OperationType,
        payloads: Vec<Value>,
        config: BulkOperationConfig,
    ) -> Result<BulkOperationRequest> {
        let rules = self.rules.rules_for(operation_type)?;
        assembler::assemble(rules, payloads, config)
    }

    /// Send an assembled batch and register the new job.
    ///
    /// The request is sent exactly once. Any failure, including a timeout
    /// where the batch may have landed, is reported as
    /// `BulkError::RemoteRejected`; re-submitting is the caller's decision.
    pub async fn submit(&self, request: BulkOperationRequest) -> Result<OperationHandle> {
        let operation_type = request.operation_type();
        let job_id = self.remote.submit_batch(&request).await.map_err(|err| {
            warn!(operation_type = %operation_type, item_count = request.len(), error = %err, "Batch submission failed");
            match err {
                BulkError::RemoteRejected(message) => BulkError::RemoteRejected(message),
                other => BulkError::RemoteRejected(other.to_string()),
            }
        })?;

        let handle = OperationHandle {
            job_id,
            operation_type,
            submitted_at: Utc::now(),
            item_count: request.len(),
        };
        let item_ids = request.items().iter().map(|item| item.item_id().to_string());
        if let Err(err) = self.registry.put(JobRecord::submitted(handle.clone(), item_ids)).await {
            // The remote accepted the batch; the id is the only way back to it
            error!(
                job_id = %handle.job_id,
                operation_type = %operation_type,
                error = %err,
                "Job submitted but not registered; attach by job id to track it"
            );
            return Err(BulkError::Internal(format!(
                "job {} was submitted but could not be registered: {err}",
                handle.job_id
            )));
        }

        info!(
            job_id = %handle.job_id,
            operation_type = %operation_type,
            item_count = handle.item_count,
            "Bulk job submitted"
        );
        Ok(handle)
    }

    /// Assemble and submit in one call
    pub async fn submit_batch(
        &self,
        operation_type: OperationType,
        payloads: Vec<Value>,
        config: BulkOperationConfig,
    ) -> Result<OperationHandle> {
        let request = self.assemble(operation_type, payloads, config)?;
        self.submit(request).await
    }

    /// Query the remote once and fold the result into the registry.
    ///
    /// Terminal jobs are answered from the registry without a remote call.
    /// An unreachable remote is "no change": the last known status is
    /// returned together with the error.
    pub async fn poll(&self, job_id: &JobId) -> Result<PollReport> {
        let record = self.record(job_id).await?;
        let status = aggregate_record(&record);
        if status.is_terminal() {
            self.notify_terminal(&record, &status).await;
            return Ok(PollReport { status, remote_error: None });
        }

        let remote = match self.remote.get_job_status(record.operation_type(), job_id).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "Status poll failed; keeping last known state");
                return Ok(PollReport { status, remote_error: Some(err) });
            }
        };

        let (record, outcome) = self.registry.update_item_statuses(job_id, &remote.items).await?;
        if !outcome.unknown_items.is_empty() {
            warn!(job_id = %job_id, unknown = ?outcome.unknown_items, "Remote reported unknown items");
        }
        if outcome.ignored_regressions > 0 {
            debug!(job_id = %job_id, ignored = outcome.ignored_regressions, "Ignored item state regressions");
        }

        let status = aggregate_record(&record);
        debug!(
            job_id = %job_id,
            remote_overall = remote.overall.as_deref().unwrap_or("-"),
            overall_state = %status.overall_state,
            applied = outcome.applied,
            "Polled job status"
        );
        if status.is_terminal() {
            self.notify_terminal(&record, &status).await;
        }
        Ok(PollReport { status, remote_error: None })
    }

    /// Request early termination of a job, then reconcile with one final
    /// poll.
    ///
    /// Best effort: the remote may already be committing items, and finished
    /// items are never undone. Cancelling a terminal job, or a job whose type
    /// cannot be cancelled, is a no-op returning the current status.
    pub async fn cancel(&self, job_id: &JobId) -> Result<AggregatedStatus> {
        let record = self.record(job_id).await?;
        let status = aggregate_record(&record);
        if status.is_terminal() {
            debug!(job_id = %job_id, overall_state = %status.overall_state, "Cancel on terminal job ignored");
            return Ok(status);
        }

        let operation_type = record.operation_type();
        if !self.rules.rules_for(operation_type)?.supports_cancellation() {
            info!(job_id = %job_id, operation_type = %operation_type, "Cancellation not supported; returning current status");
            return Ok(status);
        }

        let ack = self.remote.cancel_job(operation_type, job_id).await?;
        if !ack.accepted {
            info!(job_id = %job_id, "Remote declined cancellation");
            return Ok(self.poll(job_id).await?.status);
        }

        let final_items = match self.remote.get_job_status(operation_type, job_id).await {
            Ok(remote) => remote.items,
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "Final poll after cancellation failed");
                Vec::new()
            }
        };

        let record = self.registry.record_cancellation(job_id, &final_items).await?;
        let status = aggregate_record(&record);
        info!(job_id = %job_id, overall_state = %status.overall_state, "Bulk job cancelled");
        self.notify_terminal(&record, &status).await;
        Ok(status)
    }

    /// Resume tracking a job known only by id, e.g. after a restart.
    ///
    /// The item set is rebuilt from the remote's current per-item report.
    /// Already registered jobs are returned unchanged.
    pub async fn attach(
        &self,
        job_id: JobId,
        operation_type: OperationType,
    ) -> Result<OperationHandle> {
        if let Some(existing) = self.registry.get(&job_id).await? {
            return Ok(existing.handle);
        }

        let remote = self.remote.get_job_status(operation_type, &job_id).await?;
        if remote.items.is_empty() {
            return Err(BulkError::NotFound(format!("remote job {job_id} reported no items")));
        }

        let now = Utc::now();
        let handle = OperationHandle {
            job_id,
            operation_type,
            submitted_at: now,
            item_count: remote.items.len(),
        };
        let mut record =
            JobRecord::submitted(handle.clone(), remote.items.iter().map(|item| item.item_id.clone()));
        apply_remote_states(&mut record.items, &remote.items, now);
        self.registry.put(record).await?;

        info!(job_id = %handle.job_id, operation_type = %operation_type, item_count = handle.item_count, "Attached to existing job");
        Ok(handle)
    }

    /// Last known aggregate, without contacting the remote
    pub async fn status(&self, job_id: &JobId) -> Result<AggregatedStatus> {
        Ok(aggregate_record(&self.record(job_id).await?))
    }

    /// Handle, aggregate, per-item detail and tracking state
    pub async fn snapshot(&self, job_id: &JobId) -> Result<JobSnapshot> {
        let record = self.record(job_id).await?;
        Ok(JobSnapshot {
            status: aggregate_record(&record),
            handle: record.handle,
            items: record.items,
            tracking: record.tracking,
        })
    }

    /// Record whether and why the job is being polled
    pub async fn set_tracking(&self, job_id: &JobId, tracking: TrackingState) -> Result<()> {
        self.registry.set_tracking(job_id, tracking).await
    }

    /// Forget a job. Does not touch the remote.
    pub async fn evict(&self, job_id: &JobId) -> Result<bool> {
        let evicted = self.registry.evict(job_id).await?;
        if evicted {
            debug!(job_id = %job_id, "Evicted job");
        }
        Ok(evicted)
    }

    async fn record(&self, job_id: &JobId) -> Result<JobRecord> {
        self.registry
            .get(job_id)
            .await?
            .ok_or_else(|| BulkError::NotFound(format!("job {job_id}")))
    }

    async fn notify_terminal(&self, record: &JobRecord, status: &AggregatedStatus) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if record.notified {
            return;
        }

        match self.registry.mark_notified(record.job_id()).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                warn!(job_id = %record.job_id(), error = %err, "Failed to mark job notified");
                return;
            }
        }

        let event = JobEvent::from_status(record.operation_type(), status);
        if let Err(err) = notifier.notify(&event).await {
            warn!(job_id = %record.job_id(), error = %err, "Terminal notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use cdnbulk_domain::{CancelAck, ItemState, RemoteItemStatus, RemoteJobStatus};
    use chrono::{DateTime, Utc};
    use serde_json::json;

    use super::*;
    use crate::bulk::merge::{apply_cancellation, MergeOutcome};

    #[derive(Default)]
    struct ScriptedRemote {
        statuses: Mutex<Vec<RemoteJobStatus>>,
    }

    #[async_trait]
    impl RemoteJobService for ScriptedRemote {
        async fn submit_batch(&self, _request: &BulkOperationRequest) -> Result<JobId> {
            Ok(JobId::from(1_u64))
        }

        async fn get_job_status(
            &self,
            _operation_type: OperationType,
            _job_id: &JobId,
        ) -> Result<RemoteJobStatus> {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.is_empty() {
                return Err(BulkError::Network("no scripted status".into()));
            }
            Ok(statuses.remove(0))
        }

        async fn cancel_job(
            &self,
            _operation_type: OperationType,
            _job_id: &JobId,
        ) -> Result<CancelAck> {
            Ok(CancelAck { accepted: true })
        }
    }

    #[derive(Default)]
    struct MapRegistry {
        records: Mutex<HashMap<JobId, JobRecord>>,
    }

    impl MapRegistry {
        fn with_record<T>(&self, job_id: &JobId, f: impl FnOnce(&mut JobRecord) -> T) -> Result<T> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(job_id)
                .ok_or_else(|| BulkError::NotFound(job_id.to_string()))?;
            Ok(f(record))
        }
    }

    #[async_trait]
    impl JobRegistry for MapRegistry {
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
                apply_remote_states(&mut record.items, final_updates, Utc::now());
                if apply_cancellation(&mut record.items, Utc::now()) > 0 {
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

        async fn evict_expired(&self, _cutoff: DateTime<Utc>) -> Result<Vec<JobId>> {
            Ok(Vec::new())
        }

        async fn job_ids(&self) -> Result<Vec<JobId>> {
            Ok(self.records.lock().unwrap().keys().cloned().collect())
        }
    }

    /// Accepts reads but refuses to store new records
    struct FullRegistry(MapRegistry);

    #[async_trait]
    impl JobRegistry for FullRegistry {
        async fn put(&self, _record: JobRecord) -> Result<()> {
            Err(BulkError::Internal("registry full".into()))
        }

        async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
            self.0.get(job_id).await
        }

        async fn update_item_statuses(
            &self,
            job_id: &JobId,
            updates: &[RemoteItemStatus],
        ) -> Result<(JobRecord, MergeOutcome)> {
            self.0.update_item_statuses(job_id, updates).await
        }

        async fn record_cancellation(
            &self,
            job_id: &JobId,
            final_updates: &[RemoteItemStatus],
        ) -> Result<JobRecord> {
            self.0.record_cancellation(job_id, final_updates).await
        }

        async fn set_tracking(&self, job_id: &JobId, tracking: TrackingState) -> Result<()> {
            self.0.set_tracking(job_id, tracking).await
        }

        async fn mark_notified(&self, job_id: &JobId) -> Result<bool> {
            self.0.mark_notified(job_id).await
        }

        async fn evict(&self, job_id: &JobId) -> Result<bool> {
            self.0.evict(job_id).await
        }

        async fn evict_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<JobId>> {
            self.0.evict_expired(cutoff).await
        }

        async fn job_ids(&self) -> Result<Vec<JobId>> {
            self.0.job_ids().await
        }
    }

    fn service(statuses: Vec<RemoteJobStatus>) -> BulkOperationService {
        let remote = ScriptedRemote { statuses: Mutex::new(statuses) };
        BulkOperationService::new(Arc::new(remote), Arc::new(MapRegistry::default()))
    }

    fn search_items() -> Vec<Value> {
        vec![json!({"propertyId": "prp_1", "propertyVersion": 1, "match": "$..name"})]
    }

    #[tokio::test]
    async fn unreachable_remote_keeps_last_known_status() {
        let service = service(Vec::new());
        let handle = service
            .submit_batch(OperationType::RulesSearch, search_items(), BulkOperationConfig::default())
            .await
            .unwrap();

        let report = service.poll(&handle.job_id).await.unwrap();

        assert!(matches!(report.remote_error, Some(BulkError::Network(_))));
        assert_eq!(report.status.total, 1);
        assert!(!report.is_terminal());
    }

    #[tokio::test]
    async fn cancelling_unsupported_type_is_a_no_op() {
        let service = service(Vec::new());
        let handle = service
            .submit_batch(OperationType::RulesSearch, search_items(), BulkOperationConfig::default())
            .await
            .unwrap();

        let status = service.cancel(&handle.job_id).await.unwrap();

        assert_eq!(status.overall_state, cdnbulk_domain::OverallState::Pending);
        assert!(!service.registry().get(&handle.job_id).await.unwrap().unwrap().cancelled);
    }

    #[tokio::test]
    async fn attach_rebuilds_items_from_remote() {
        let service = service(vec![RemoteJobStatus {
            overall: Some("RUNNING".into()),
            items: vec![
                RemoteItemStatus::new("prp_1:v2:search", ItemState::Completed),
                RemoteItemStatus::new("prp_2:v5:search", ItemState::InProgress),
            ],
        }]);

        let handle = service.attach(JobId::from("ext-9"), OperationType::RulesSearch).await.unwrap();
        let snapshot = service.snapshot(&handle.job_id).await.unwrap();

        assert_eq!(handle.item_count, 2);
        assert_eq!(snapshot.status.completed, 1);
        assert_eq!(snapshot.status.overall_state, cdnbulk_domain::OverallState::InProgress);
        assert_eq!(snapshot.tracking, TrackingState::Idle);
    }

    #[tokio::test]
    async fn registration_failure_reports_the_accepted_job_id() {
        let service = BulkOperationService::new(
            Arc::new(ScriptedRemote::default()),
            Arc::new(FullRegistry(MapRegistry::default())),
        );

        let err = service
            .submit_batch(OperationType::RulesSearch, search_items(), BulkOperationConfig::default())
            .await
            .unwrap_err();

        match err {
            BulkError::Internal(message) => assert!(message.contains("job 1 "), "{message}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let service = service(Vec::new());
        let err = service.poll(&JobId::from("missing")).await.unwrap_err();
        assert!(matches!(err, BulkError::NotFound(_)));
    }
}
