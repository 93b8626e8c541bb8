//! Status-poll metrics
//!
//! Plain atomic counters shared by every background poll loop. Durations are
//! stored in microseconds; reporting helpers convert to milliseconds.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::observability::{MetricsError, MetricsResult};

#[derive(Debug, Default)]
pub struct PollMetrics {
    /// Total time spent in remote status calls, in microseconds
    total_poll_time_micros: AtomicU64,
    /// Completed remote status calls, successful or not
    polls: AtomicUsize,
    /// Status calls that returned an error
    errors: AtomicUsize,
    /// Loops that gave up because the caller's timeout elapsed
    timeouts: AtomicUsize,
    /// Loops that gave up after too many consecutive failures
    unavailable: AtomicUsize,
    /// Loops that observed a terminal state
    finished: AtomicUsize,
}

/// Point-in-time copy of [`PollMetrics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollMetricsSnapshot {
    pub polls: usize,
    pub errors: usize,
    pub timeouts: usize,
    pub unavailable: usize,
    pub finished: usize,
    pub avg_poll_time_ms: f64,
}

impl PollMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_poll(&self, duration: Duration) -> MetricsResult<()> {
        let micros = u64::try_from(duration.as_micros())
            .map_err(|_| MetricsError::Overflow { metric: "poll time" })?;

        // SeqCst: read together with `polls` for the average
        self.total_poll_time_micros.fetch_add(micros, Ordering::SeqCst);
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn record_error(&self) -> MetricsResult<()> {
        self.errors.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_timeout(&self) -> MetricsResult<()> {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_unavailable(&self) -> MetricsResult<()> {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_finished(&self) -> MetricsResult<()> {
        self.finished.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Average remote status call time in milliseconds
    pub fn avg_poll_time_ms(&self) -> MetricsResult<f64> {
        let total = self.total_poll_time_micros.load(Ordering::SeqCst);
        let count = self.polls.load(Ordering::SeqCst);
        if count == 0 {
            return Err(MetricsError::EmptyData { metric: "average poll time" });
        }
        Ok((total as f64 / count as f64) / 1_000.0)
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn timeout_count(&self) -> usize {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn unavailable_count(&self) -> usize {
        self.unavailable.load(Ordering::Relaxed)
    }

    pub fn finished_count(&self) -> usize {
        self.finished.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PollMetricsSnapshot {
        PollMetricsSnapshot {
            polls: self.poll_count(),
            errors: self.error_count(),
            timeouts: self.timeout_count(),
            unavailable: self.unavailable_count(),
            finished: self.finished_count(),
            avg_poll_time_ms: self.avg_poll_time_ms().unwrap_or(0.0),
        }
    }
}
