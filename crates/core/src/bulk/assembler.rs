//! Batch Assembler
//!
//! Turns caller payloads into an immutable [`BulkOperationRequest`]. A batch
//! is all-or-nothing: any issue on any item rejects the whole batch, and the
//! error carries every issue found.

use std::collections::HashMap;

use cdnbulk_domain::{
    BulkError, BulkOperationConfig, BulkOperationItem, BulkOperationRequest, Result,
    ValidationIssue,
};
use serde_json::Value;
use tracing::debug;

use super::rules::OperationRules;
use super::validator;

/// Validate `payloads` and build the request.
///
/// # Errors
///
/// Returns `BulkError::ValidationFailed` when the batch is empty, exceeds the
/// operation's ceiling, has invalid batch settings, or contains any invalid
/// or duplicate item. Oversized batches are rejected without inspecting the
/// items; the caller has to split them.
pub fn assemble(
    rules: &dyn OperationRules,
    payloads: Vec<Value>,
    config: BulkOperationConfig,
) -> Result<BulkOperationRequest> {
    let operation_type = rules.operation_type();
    let ceiling = rules.batch_ceiling();

    if payloads.is_empty() {
        return Err(rejected(vec![ValidationIssue::batch("batch contains no items")]));
    }
    if payloads.len() > ceiling {
        return Err(rejected(vec![ValidationIssue::batch(format!(
            "{} items exceeds the {operation_type} batch ceiling of {ceiling}; split the batch",
            payloads.len()
        ))]));
    }

    let mut issues: Vec<ValidationIssue> =
        rules.validate_config(&config).into_iter().map(ValidationIssue::batch).collect();

    let mut seen: HashMap<String, usize> = HashMap::with_capacity(payloads.len());
    let mut item_ids = Vec::with_capacity(payloads.len());

    for (index, payload) in payloads.iter().enumerate() {
        let item_issues = validator::validate(rules, index, payload, &config);
        if !item_issues.is_empty() {
            issues.extend(item_issues);
            continue;
        }

        match rules.item_id(payload) {
            Some(id) => {
                if let Some(first) = seen.get(&id) {
                    issues.push(ValidationIssue::item(
                        index,
                        format!("duplicate item {id} (same as item {first})"),
                    ));
                } else {
                    seen.insert(id.clone(), index);
                }
                item_ids.push(id);
            }
            None => issues.push(ValidationIssue::item(index, "could not derive an item id")),
        }
    }

    if !issues.is_empty() {
        debug!(
            operation_type = %operation_type,
            item_count = payloads.len(),
            issue_count = issues.len(),
            "Batch rejected by validation"
        );
        return Err(rejected(issues));
    }

    let items = item_ids
        .into_iter()
        .zip(payloads)
        .map(|(id, payload)| BulkOperationItem::new(id, payload))
        .collect();

    Ok(BulkOperationRequest::new(operation_type, items, config))
}

fn rejected(issues: Vec<ValidationIssue>) -> BulkError {
    BulkError::ValidationFailed { issues }
}
