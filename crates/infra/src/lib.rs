//! # cdnbulk Infrastructure
//!
//! Adapters behind the `cdnbulk-core` ports and the runtime around them.
//!
//! This crate contains:
//! - The control-plane HTTP client and `RemoteJobService` adapter
//! - The in-memory job registry
//! - Background status polling and registry retention
//! - Terminal-state notifiers (log line, webhook)
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `cdnbulk-core`
//! - Contains all I/O: HTTP, timers, spawned tasks

pub mod api;
pub mod bulk;
pub mod config;
pub mod errors;
pub mod http;
pub mod notify;
pub mod observability;
pub mod registry;
pub mod scheduling;

pub use bulk::BulkOperationManager;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use registry::InMemoryJobRegistry;
