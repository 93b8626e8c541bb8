//! Background status polling
//!
//! One task per tracked job. Each loop polls on a fixed interval (first poll
//! immediately), publishes every aggregate on a `watch` channel and ends on
//! the first of:
//!
//! - a terminal aggregate: `Ok(PollOutcome::Terminal)`
//! - local stop or shutdown: `Ok(PollOutcome::Stopped)`
//! - the caller's timeout: `Err(BulkError::PollingTimedOut)`
//! - too many consecutive failed polls: `Err(BulkError::PollingUnavailable)`
//!
//! Stop and the caller's deadline are also honoured while a status request
//! is in flight. Ending a loop never cancels the remote job.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cdnbulk_core::BulkOperationService;
use cdnbulk_domain::constants::{DEFAULT_MAX_CONSECUTIVE_POLL_FAILURES, DEFAULT_POLL_INTERVAL_SECS};
use cdnbulk_domain::{AggregatedStatus, BulkError, JobId, PollingConfig, Result, TrackingState};
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::observability::log_metric;
use crate::observability::metrics::PollMetrics;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval and failure ceiling shared by every loop
#[derive(Debug, Clone)]
pub struct StatusPollerConfig {
    /// Time between two polls of the same job
    pub interval: Duration,
    /// Failed polls in a row before the loop gives up
    pub max_consecutive_failures: u32,
}

impl Default for StatusPollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_POLL_FAILURES,
        }
    }
}

impl From<&PollingConfig> for StatusPollerConfig {
    fn from(config: &PollingConfig) -> Self {
        Self { interval: config.interval(), max_consecutive_failures: config.max_consecutive_failures }
    }
}

/// How a loop ended when it ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job reached a terminal state
    Terminal(AggregatedStatus),
    /// Polling was stopped locally; the remote job may still be running
    Stopped,
}

/// Caller's side of one polling loop
pub struct PollerHandle {
    job_id: JobId,
    cancel: CancellationToken,
    status: watch::Receiver<AggregatedStatus>,
    outcome: oneshot::Receiver<Result<PollOutcome>>,
}

impl PollerHandle {
    /// Job this loop polls
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Most recent aggregate published by the loop
    pub fn latest(&self) -> AggregatedStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every published aggregate
    pub fn subscribe(&self) -> watch::Receiver<AggregatedStatus> {
        self.status.clone()
    }

    /// Stop polling. The remote job is left alone.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loop to end
    pub async fn wait(self) -> Result<PollOutcome> {
        self.outcome.await.unwrap_or_else(|_| {
            Err(BulkError::Internal(format!(
                "poll loop for job {} ended without reporting an outcome",
                self.job_id
            )))
        })
    }
}

struct ActiveLoop {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

type ActiveLoops = Arc<Mutex<HashMap<JobId, ActiveLoop>>>;

/// Spawns and owns the per-job polling loops
///
/// At most one loop runs per job: tracking a job again replaces its loop.
pub struct StatusPoller {
    service: Arc<BulkOperationService>,
    config: StatusPollerConfig,
    metrics: Arc<PollMetrics>,
    root: CancellationToken,
    active: ActiveLoops,
    next_generation: AtomicU64,
}

impl StatusPoller {
    /// Poller with no loops running
    pub fn new(
        service: Arc<BulkOperationService>,
        config: StatusPollerConfig,
        metrics: Arc<PollMetrics>,
    ) -> Self {
        Self {
            service,
            config,
            metrics,
            root: CancellationToken::new(),
            active: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Counters shared by every loop
    pub fn metrics(&self) -> &Arc<PollMetrics> {
        &self.metrics
    }

    /// Start polling a registered job
    ///
    /// # Errors
    ///
    /// `NotFound` if the job is not in the registry; `InvalidInput` after
    /// [`StatusPoller::shutdown`].
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn spawn(&self, job_id: JobId, timeout: Option<Duration>) -> Result<PollerHandle> {
        if self.root.is_cancelled() {
            return Err(SchedulerError::ShutDown.into());
        }

        let initial = self.service.status(&job_id).await?;

        // The old loop must record its final state before this one goes Active
        let previous = self.active.lock().remove(&job_id);
        if let Some(previous) = previous {
            warn!("Job was already tracked; replacing its poll loop");
            previous.cancel.cancel();
            let abort = previous.task.abort_handle();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, previous.task).await.is_err() {
                warn!("Previous poll loop did not stop in time; aborting it");
                abort.abort();
            }
        }

        self.service.set_tracking(&job_id, TrackingState::Active).await?;

        let (status_tx, status_rx) = watch::channel(initial);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let cancel = self.root.child_token();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let poll_loop = PollLoop {
            service: Arc::clone(&self.service),
            config: self.config.clone(),
            metrics: Arc::clone(&self.metrics),
            job_id: job_id.clone(),
            timeout,
            cancel: cancel.clone(),
            status_tx,
            active: Arc::clone(&self.active),
            generation,
        };
        let active = Arc::clone(&self.active);
        let loop_job_id = job_id.clone();

        let displaced = {
            // Held across spawn + insert so the task cannot deregister first
            let mut loops = self.active.lock();
            let task = tokio::spawn(async move {
                let outcome = poll_loop.run().await;
                {
                    let mut loops = active.lock();
                    if loops.get(&loop_job_id).is_some_and(|entry| entry.generation == generation) {
                        loops.remove(&loop_job_id);
                    }
                }
                // The caller may have dropped its handle
                let _ = outcome_tx.send(outcome);
            });
            loops.insert(job_id.clone(), ActiveLoop { generation, cancel: cancel.clone(), task })
        };

        // A concurrent spawn for the same job raced us; newest generation wins
        if let Some(displaced) = displaced {
            displaced.cancel.cancel();
        }

        info!(interval_ms = self.config.interval.as_millis() as u64, ?timeout, "Started poll loop");
        Ok(PollerHandle { job_id, cancel, status: status_rx, outcome: outcome_rx })
    }

    /// Stop the loop for `job_id`. Returns whether one was running.
    pub fn stop(&self, job_id: &JobId) -> bool {
        match self.active.lock().get(job_id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a loop for `job_id` is still running
    pub fn is_tracking(&self, job_id: &JobId) -> bool {
        self.active.lock().get(job_id).is_some_and(|entry| !entry.task.is_finished())
    }

    /// Jobs with a registered loop
    pub fn tracked_jobs(&self) -> Vec<JobId> {
        self.active.lock().keys().cloned().collect()
    }

    /// Stop every loop and wait for them to exit
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> SchedulerResult<()> {
        self.root.cancel();
        let tasks: Vec<JoinHandle<()>> = self.active.lock().drain().map(|(_, entry)| entry.task).collect();
        if tasks.is_empty() {
            return Ok(());
        }

        info!(count = tasks.len(), "Stopping poll loops");
        let aborts: Vec<AbortHandle> = tasks.iter().map(JoinHandle::abort_handle).collect();
        let Ok(joined) = tokio::time::timeout(SHUTDOWN_TIMEOUT, join_all(tasks)).await else {
            warn!("Poll loops did not stop in time; aborting them");
            aborts.iter().for_each(AbortHandle::abort);
            return Err(SchedulerError::Timeout { seconds: SHUTDOWN_TIMEOUT.as_secs() });
        };

        for result in joined {
            if let Err(err) = result {
                return Err(SchedulerError::TaskJoinFailed(err.to_string()));
            }
        }
        Ok(())
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        if !self.root.is_cancelled() {
            debug!("StatusPoller dropped; cancelling poll loops");
            self.root.cancel();
        }
    }
}

struct PollLoop {
    service: Arc<BulkOperationService>,
    config: StatusPollerConfig,
    metrics: Arc<PollMetrics>,
    job_id: JobId,
    timeout: Option<Duration>,
    cancel: CancellationToken,
    status_tx: watch::Sender<AggregatedStatus>,
    active: ActiveLoops,
    generation: u64,
}

/// Result of waiting on something while watching for stop and deadline
enum Interrupted<T> {
    Stopped,
    Expired,
    Done(T),
}

impl PollLoop {
    async fn run(self) -> Result<PollOutcome> {
        let started = Instant::now();
        let deadline = self.timeout.map(|timeout| started + timeout);
        let max_failures = self.config.max_consecutive_failures.max(1);
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures = 0u32;

        loop {
            let tick = ticker.tick();
            match self.interruptible(deadline, tick).await {
                Interrupted::Stopped => return Ok(self.stopped().await),
                Interrupted::Expired => return Err(self.timed_out(started).await),
                Interrupted::Done(_) => {}
            }

            let poll_started = Instant::now();
            let result = match self.interruptible(deadline, self.service.poll(&self.job_id)).await {
                Interrupted::Stopped => return Ok(self.stopped().await),
                Interrupted::Expired => return Err(self.timed_out(started).await),
                Interrupted::Done(result) => result,
            };
            log_metric(self.metrics.record_poll(poll_started.elapsed()), "poller.poll.duration");

            let failure = match result {
                Ok(report) => {
                    self.status_tx.send_replace(report.status.clone());
                    match report.remote_error {
                        None if report.status.is_terminal() => {
                            log_metric(self.metrics.record_finished(), "poller.finished");
                            info!(
                                job_id = %self.job_id,
                                overall_state = %report.status.overall_state,
                                "Job reached terminal state"
                            );
                            self.finish(TrackingState::Stopped).await;
                            return Ok(PollOutcome::Terminal(report.status));
                        }
                        None => {
                            consecutive_failures = 0;
                            continue;
                        }
                        Some(err) => err,
                    }
                }
                Err(err @ BulkError::NotFound(_)) => {
                    debug!(job_id = %self.job_id, "Job no longer registered; ending poll loop");
                    return Err(err);
                }
                Err(err) => err,
            };

            consecutive_failures += 1;
            log_metric(self.metrics.record_error(), "poller.poll.error");
            debug!(
                job_id = %self.job_id,
                consecutive_failures,
                error = %failure,
                "Poll failed; treating as no change"
            );

            if consecutive_failures >= max_failures {
                let last_error = failure.to_string();
                log_metric(self.metrics.record_unavailable(), "poller.unavailable");
                error!(
                    job_id = %self.job_id,
                    consecutive_failures,
                    error = %last_error,
                    "Remote unavailable; giving up on polling"
                );
                self.finish(TrackingState::Unavailable(last_error.clone())).await;
                return Err(BulkError::PollingUnavailable {
                    job_id: self.job_id.to_string(),
                    consecutive_failures,
                    last_error,
                });
            }
        }
    }

    /// Drive `work` unless stop or the deadline comes first. `work` is dropped
    /// before this returns.
    async fn interruptible<F: Future>(&self, deadline: Option<Instant>, work: F) -> Interrupted<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Interrupted::Stopped,
            _ = deadline_reached(deadline) => Interrupted::Expired,
            output = work => Interrupted::Done(output),
        }
    }

    async fn stopped(&self) -> PollOutcome {
        debug!(job_id = %self.job_id, "Poll loop cancelled");
        self.finish(TrackingState::Stopped).await;
        PollOutcome::Stopped
    }

    async fn timed_out(&self, started: Instant) -> BulkError {
        let elapsed_secs = started.elapsed().as_secs();
        log_metric(self.metrics.record_timeout(), "poller.timeout");
        warn!(job_id = %self.job_id, elapsed_secs, "Polling timed out; remote job left running");
        self.finish(TrackingState::TimedOut).await;
        BulkError::PollingTimedOut { job_id: self.job_id.to_string(), elapsed_secs }
    }

    /// Record why polling ended, unless a newer loop owns the job by now
    async fn finish(&self, tracking: TrackingState) {
        let replaced = self
            .active
            .lock()
            .get(&self.job_id)
            .is_some_and(|entry| entry.generation != self.generation);
        if replaced {
            debug!(job_id = %self.job_id, "Poll loop replaced; leaving tracking state to its successor");
            return;
        }
        if let Err(err) = self.service.set_tracking(&self.job_id, tracking).await {
            debug!(job_id = %self.job_id, error = %err, "Could not record tracking state");
        }
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
