//! Metrics collection modules

pub mod poll;

pub use poll::{PollMetrics, PollMetricsSnapshot};
