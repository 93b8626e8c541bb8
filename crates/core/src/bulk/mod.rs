//! Bulk remote-operation coordination
//!
//! Validation, assembly and aggregation are pure functions. The
//! [`BulkOperationService`] drives submission, one-shot polling and
//! cancellation through the ports in [`ports`].

pub mod aggregator;
pub mod assembler;
pub mod merge;
pub mod ports;
pub mod rules;
pub mod service;
pub mod validator;

pub use aggregator::{aggregate, aggregate_record};
pub use assembler::assemble;
pub use merge::{apply_cancellation, apply_remote_states, MergeOutcome};
pub use ports::{JobNotifier, JobRegistry, RemoteJobService};
pub use rules::{OperationRules, RuleSet};
pub use service::{BulkOperationService, PollReport};
