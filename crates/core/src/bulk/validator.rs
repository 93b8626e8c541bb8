//! Item Validator

use cdnbulk_domain::{BulkOperationConfig, ValidationIssue};
use serde_json::Value;

use super::rules::OperationRules;

/// Validate one item against its operation's rule set.
///
/// Pure and deterministic. Every message from the rule set is tagged with
/// `index`, the item's position in the caller's batch.
pub fn validate(
    rules: &dyn OperationRules,
    index: usize,
    payload: &Value,
    config: &BulkOperationConfig,
) -> Vec<ValidationIssue> {
    rules
        .validate(payload, config)
        .into_iter()
        .map(|message| ValidationIssue::item(index, message))
        .collect()
}
