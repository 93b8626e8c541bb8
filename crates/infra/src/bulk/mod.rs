//! Runtime wiring for bulk job coordination

mod manager;

pub use manager::BulkOperationManager;
