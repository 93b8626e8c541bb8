//! # cdnbulk Core
//!
//! Pure coordination logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Per-operation-type rule sets and the item validator
//! - Batch assembly and result aggregation
//! - Port interfaces (traits) for the remote job service, the job registry
//!   and notification sinks
//! - `BulkOperationService`, the submit / poll / cancel use cases
//!
//! ## Architecture Principles
//! - Only depends on `cdnbulk-domain`
//! - No HTTP, timers or background tasks
//! - All external dependencies via traits

pub mod bulk;

pub use bulk::ports::{JobNotifier, JobRegistry, RemoteJobService};
pub use bulk::rules::{OperationRules, RuleSet};
pub use bulk::{BulkOperationService, MergeOutcome, PollReport};
