//! Bulk operation manager
//!
//! Owns the coordination service together with its background tasks:
//! per-job status polling and registry retention. This is the entry point
//! applications hold on to.
//!
//! # Example
//!
//! ```no_run
//! use cdnbulk_domain::{BulkOperationConfig, Config, OperationType};
//! use cdnbulk_infra::bulk::BulkOperationManager;
//!
//! # async fn example(config: Config, payloads: Vec<serde_json::Value>) -> cdnbulk_domain::Result<()> {
//! let manager = BulkOperationManager::from_config(&config)?;
//! let (handle, poller) = manager
//!     .submit_and_track(OperationType::Activation, payloads, BulkOperationConfig::default(), None)
//!     .await?;
//! tracing::info!(job_id = %handle.job_id, "submitted");
//! let outcome = poller.wait().await?;
//! # let _ = outcome;
//! manager.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use cdnbulk_core::{BulkOperationService, JobNotifier, PollReport};
use cdnbulk_domain::{
    AggregatedStatus, BulkError, BulkOperationConfig, Config, JobId, JobSnapshot, OperationHandle,
    OperationType, Result,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::api::{AccessTokenProvider, ApiClient, ApiClientConfig, HttpRemoteJobService, StaticTokenProvider};
use crate::http::HttpClient;
use crate::notify::{TracingNotifier, WebhookNotifier};
use crate::observability::metrics::PollMetrics;
use crate::registry::InMemoryJobRegistry;
use crate::scheduling::{
    PollerHandle, RetentionSweeper, RetentionSweeperConfig, SchedulerError, StatusPoller,
    StatusPollerConfig,
};

pub struct BulkOperationManager {
    service: Arc<BulkOperationService>,
    poller: StatusPoller,
    sweeper: Mutex<RetentionSweeper>,
    default_timeout: Option<Duration>,
}

impl BulkOperationManager {
    /// Wire an existing service with the polling and retention settings
    /// from `config`
    pub fn new(service: Arc<BulkOperationService>, config: &Config) -> Self {
        Self::from_parts(
            service,
            StatusPollerConfig::from(&config.polling),
            RetentionSweeperConfig::from(&config.registry),
            config.polling.timeout(),
        )
    }

    pub fn from_parts(
        service: Arc<BulkOperationService>,
        polling: StatusPollerConfig,
        retention: RetentionSweeperConfig,
        default_timeout: Option<Duration>,
    ) -> Self {
        let poller = StatusPoller::new(Arc::clone(&service), polling, Arc::new(PollMetrics::new()));
        let sweeper = RetentionSweeper::new(Arc::clone(service.registry()), retention);
        Self { service, poller, sweeper: Mutex::new(sweeper), default_timeout }
    }

    /// Build the full HTTP-backed stack using the configured API token
    ///
    /// # Errors
    ///
    /// `Config` if no token is configured or a URL is malformed
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config
            .remote
            .api_token
            .clone()
            .ok_or_else(|| BulkError::Config("remote.api_token is not set".into()))?;
        Self::from_config_with_auth(config, Arc::new(StaticTokenProvider::new(token)))
    }

    /// Build the full HTTP-backed stack with an injected token provider
    pub fn from_config_with_auth(
        config: &Config,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self> {
        let api_config = ApiClientConfig {
            base_url: config.remote.base_url.clone(),
            timeout: config.remote.request_timeout(),
            ..ApiClientConfig::default()
        };
        let client = Arc::new(ApiClient::new(api_config, auth)?);
        let remote = Arc::new(HttpRemoteJobService::new(client));
        let registry = Arc::new(InMemoryJobRegistry::new());

        let notifier: Arc<dyn JobNotifier> = match &config.notifications.webhook_url {
            Some(url) => {
                let http_client =
                    HttpClient::builder().timeout(config.remote.request_timeout()).build()?;
                Arc::new(WebhookNotifier::new(http_client, url)?)
            }
            None => Arc::new(TracingNotifier),
        };

        let service = BulkOperationService::new(remote, registry).with_notifier(notifier);
        info!(base_url = %config.remote.base_url, "Bulk operation manager configured");
        Ok(Self::new(Arc::new(service), config))
    }

    pub fn service(&self) -> &Arc<BulkOperationService> {
        &self.service
    }

    pub fn poll_metrics(&self) -> &Arc<PollMetrics> {
        self.poller.metrics()
    }

    /// Start evicting stale registry records in the background
    pub async fn start_retention(&self) -> Result<()> {
        self.sweeper.lock().await.start().await.map_err(BulkError::from)
    }

    /// Validate and submit without background tracking
    pub async fn submit(
        &self,
        operation_type: OperationType,
        payloads: Vec<Value>,
        config: BulkOperationConfig,
    ) -> Result<OperationHandle> {
        self.service.submit_batch(operation_type, payloads, config).await
    }

    /// Validate, submit and start a background poll loop.
    ///
    /// `timeout` falls back to the configured polling timeout. The returned
    /// [`PollerHandle`] yields the loop's outcome; polling errors are
    /// delivered there.
    #[instrument(skip(self, payloads, config), fields(operation_type = %operation_type, item_count = payloads.len()))]
    pub async fn submit_and_track(
        &self,
        operation_type: OperationType,
        payloads: Vec<Value>,
        config: BulkOperationConfig,
        timeout: Option<Duration>,
    ) -> Result<(OperationHandle, PollerHandle)> {
        let handle = self.service.submit_batch(operation_type, payloads, config).await?;
        let poller = self.track(handle.job_id.clone(), timeout).await?;
        Ok((handle, poller))
    }

    /// Start (or restart) background polling of a registered job
    pub async fn track(&self, job_id: JobId, timeout: Option<Duration>) -> Result<PollerHandle> {
        self.poller.spawn(job_id, timeout.or(self.default_timeout)).await
    }

    /// Register a job known only by id and start polling it
    pub async fn attach_and_track(
        &self,
        job_id: JobId,
        operation_type: OperationType,
        timeout: Option<Duration>,
    ) -> Result<(OperationHandle, PollerHandle)> {
        let handle = self.service.attach(job_id, operation_type).await?;
        let poller = self.track(handle.job_id.clone(), timeout).await?;
        Ok((handle, poller))
    }

    /// One-shot poll, independent of any background loop
    pub async fn poll(&self, job_id: &JobId) -> Result<PollReport> {
        self.service.poll(job_id).await
    }

    pub async fn status(&self, job_id: &JobId) -> Result<AggregatedStatus> {
        self.service.status(job_id).await
    }

    pub async fn snapshot(&self, job_id: &JobId) -> Result<JobSnapshot> {
        self.service.snapshot(job_id).await
    }

    /// Best-effort remote cancellation.
    ///
    /// Items the remote already committed stay `COMPLETED`. The local loop is
    /// stopped once the job is terminal.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn cancel(&self, job_id: &JobId) -> Result<AggregatedStatus> {
        let status = self.service.cancel(job_id).await?;
        if status.is_terminal() && self.poller.stop(job_id) {
            debug!("Stopped poll loop after cancellation");
        }
        Ok(status)
    }

    /// Stop local polling without asking the remote to cancel
    pub fn stop_tracking(&self, job_id: &JobId) -> bool {
        self.poller.stop(job_id)
    }

    pub fn is_tracking(&self, job_id: &JobId) -> bool {
        self.poller.is_tracking(job_id)
    }

    /// Stop polling and forget the job locally
    pub async fn evict(&self, job_id: &JobId) -> Result<bool> {
        self.poller.stop(job_id);
        self.service.evict(job_id).await
    }

    /// Stop every background task. Remote jobs keep running.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        self.poller.shutdown().await?;

        let mut sweeper = self.sweeper.lock().await;
        match sweeper.stop().await {
            Ok(()) | Err(SchedulerError::NotRunning) => {}
            Err(err) => {
                warn!(error = %err, "Retention sweeper did not stop cleanly");
                return Err(err.into());
            }
        }

        info!("Bulk operation manager shut down");
        Ok(())
    }
}
