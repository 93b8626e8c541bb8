//! Registry retention sweeper
//!
//! Periodically evicts records whose last update is older than the
//! retention period. Eviction only forgets local state; remote jobs are not
//! touched.

use std::sync::Arc;
use std::time::Duration;

use cdnbulk_core::JobRegistry;
use cdnbulk_domain::constants::{DEFAULT_RETENTION_SECS, DEFAULT_SWEEP_INTERVAL_SECS};
use cdnbulk_domain::{BulkError, JobId, RegistryConfig, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

#[derive(Debug, Clone)]
pub struct RetentionSweeperConfig {
    /// How long a record survives after its last update
    pub retention: Duration,
    /// Time between sweeps
    pub sweep_interval: Duration,
}

impl Default for RetentionSweeperConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl From<&RegistryConfig> for RetentionSweeperConfig {
    fn from(config: &RegistryConfig) -> Self {
        Self { retention: config.retention(), sweep_interval: config.sweep_interval() }
    }
}

pub struct RetentionSweeper {
    registry: Arc<dyn JobRegistry>,
    config: RetentionSweeperConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl RetentionSweeper {
    pub fn new(registry: Arc<dyn JobRegistry>, config: RetentionSweeperConfig) -> Self {
        Self {
            registry,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the sweep loop
    ///
    /// # Errors
    ///
    /// Returns error if the sweeper is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        // Fresh token so the sweeper can be restarted after stop
        self.cancellation_token = CancellationToken::new();

        let registry = Arc::clone(&self.registry);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move {
            Self::sweep_loop(registry, config, cancel).await;
        });
        *self.task_handle.lock().await = Some(handle);

        info!(
            retention_secs = self.config.retention.as_secs(),
            interval_secs = self.config.sweep_interval.as_secs(),
            "Retention sweeper started"
        );
        Ok(())
    }

    /// Cancel the sweep loop and wait for it to exit
    ///
    /// # Errors
    ///
    /// Returns error if the sweeper is not running or does not exit in time
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("Retention sweeper stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Evict expired records once
    pub async fn run_once(&self) -> Result<Vec<JobId>> {
        Self::sweep(self.registry.as_ref(), self.config.retention).await
    }

    async fn sweep(registry: &dyn JobRegistry, retention: Duration) -> Result<Vec<JobId>> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|err| BulkError::Config(format!("retention out of range: {err}")))?;
        let evicted = registry.evict_expired(Utc::now() - retention).await?;
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted expired job records");
        }
        Ok(evicted)
    }

    async fn sweep_loop(
        registry: Arc<dyn JobRegistry>,
        config: RetentionSweeperConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Retention sweep loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.sweep_interval) => {
                    if let Err(err) = Self::sweep(registry.as_ref(), config.retention).await {
                        warn!(error = %err, "Retention sweep failed");
                    }
                }
            }
        }
    }
}

impl Drop for RetentionSweeper {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}
