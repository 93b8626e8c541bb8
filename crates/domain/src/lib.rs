//! # cdnbulk Domain
//!
//! Business domain types for coordinating bulk control-plane jobs.
//!
//! This crate contains:
//! - Batch request, handle and status types
//! - The error taxonomy and `Result` alias
//! - Configuration structures
//! - Domain constants (batch ceilings, defaults)
//!
//! ## Architecture
//! - No dependencies on other cdnbulk crates
//! - No async, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
