//! Observability: tracing setup and in-process metrics
//!
//! Metric recording methods return `MetricsResult<()>`. Callers on hot paths
//! go through [`log_metric`] so that a recording failure is logged and never
//! interrupts the work being measured.

pub mod logging;
pub mod metrics;

use tracing::warn;

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "average poll time")
        metric: &'static str,
    },

    /// Counter would wrap around
    #[error("Counter overflow for metric '{metric}'")]
    Overflow { metric: &'static str },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

pub(crate) fn log_metric(result: MetricsResult<()>, metric: &'static str) {
    if let Err(err) = result {
        warn!(metric = metric, error = ?err, "Failed to record metric");
    }
}
