//! Background tasks
//!
//! - [`StatusPoller`]: one polling loop per tracked job
//! - [`RetentionSweeper`]: periodic eviction of stale registry records
//!
//! Every task owns a `CancellationToken` and a join handle; stopping a task
//! never touches the remote job.

pub mod error;
pub mod retention;
pub mod status_poller;

pub use error::{SchedulerError, SchedulerResult};
pub use retention::{RetentionSweeper, RetentionSweeperConfig};
pub use status_poller::{PollOutcome, PollerHandle, StatusPoller, StatusPollerConfig};
