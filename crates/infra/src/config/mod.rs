//! Configuration loading
//!
//! Environment variables first, then the first config file found on disk.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
