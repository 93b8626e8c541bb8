//! Shared test helpers for `cdnbulk-core` integration tests.
//!
//! Lightweight in-memory fakes for the core ports so scenario tests can focus
//! on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod fakes;

use serde_json::{json, Value};

/// Staging activation payload for `prp_{property}` at `version`
pub fn activation(property: u32, version: u32) -> Value {
    json!({"propertyId": format!("prp_{property}"), "version": version, "network": "STAGING"})
}

/// Item id the activation rule set derives for [`activation`]
pub fn activation_id(property: u32, version: u32) -> String {
    format!("prp_{property}:v{version}:STAGING")
}
