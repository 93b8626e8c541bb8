//! Domain types and models
//!
//! - [`operation`]: what the caller submits (requests, items, handles)
//! - [`status`]: what the remote reports back and how it is summarised
//! - [`job`]: registry records and terminal notifications

pub mod job;
pub mod operation;
pub mod status;

pub use job::{JobEvent, JobRecord, JobSnapshot, TrackingState};
pub use operation::{
    BulkOperationConfig, BulkOperationItem, BulkOperationRequest, JobId, OperationHandle,
    OperationType, ValidationIssue,
};
pub use status::{
    AggregatedStatus, CancelAck, ItemState, ItemStatus, OverallState, RemoteItemStatus,
    RemoteJobStatus,
};
