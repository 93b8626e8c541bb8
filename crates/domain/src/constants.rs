//! Domain constants
//!
//! Batch ceilings are enforced by the assembler before any network call;
//! callers are expected to split oversized batches themselves.

// Per-type batch ceilings
pub const ACTIVATION_BATCH_CEILING: usize = 500;
pub const VERSION_CREATION_BATCH_CEILING: usize = 100;
pub const RULES_PATCH_BATCH_CEILING: usize = 50;
pub const RULES_SEARCH_BATCH_CEILING: usize = 100;

// Polling defaults
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_CONSECUTIVE_POLL_FAILURES: u32 = 5;

// Registry retention
pub const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;

// Remote requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Error message recorded on items that were still pending when a
/// cancellation was confirmed.
pub const CANCELLED_ITEM_MESSAGE: &str = "cancelled";

/// Note attached to an aggregate when cancellation was confirmed after some
/// items had already completed.
pub const PARTIAL_CANCELLATION_NOTE: &str =
    "cancellation confirmed after some items completed; completed work was not undone";
