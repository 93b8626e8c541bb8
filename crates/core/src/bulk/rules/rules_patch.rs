//! JSON-Patch rule tree updates

use cdnbulk_domain::{BulkOperationConfig, OperationType};
use serde_json::Value;

use super::fields::{as_object, positive_int, property_id};
use super::OperationRules;

const PATCH_OPS: [&str; 6] = ["add", "remove", "replace", "move", "copy", "test"];

/// Rules for `{propertyId, propertyVersion, patches[]}` items
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesPatchRules;

impl OperationRules for RulesPatchRules {
    fn operation_type(&self) -> OperationType {
        OperationType::RulesPatch
    }

    fn validate(&self, payload: &Value, _config: &BulkOperationConfig) -> Vec<String> {
        let mut issues = Vec::new();
        let Some(object) = as_object(payload, &mut issues) else {
            return issues;
        };

        property_id(object, &mut issues);
        positive_int(object, "propertyVersion", &mut issues);

        match object.get("patches") {
            None | Some(Value::Null) => issues.push("patches is required".to_string()),
            Some(Value::Array(patches)) if patches.is_empty() => {
                issues.push("patches must contain at least one operation".to_string());
            }
            Some(Value::Array(patches)) => {
                for (position, patch) in patches.iter().enumerate() {
                    check_patch(position, patch, &mut issues);
                }
            }
            Some(_) => issues.push("patches must be an array".to_string()),
        }

        issues
    }

    fn item_id(&self, payload: &Value) -> Option<String> {
        let object = payload.as_object()?;
        let mut scratch = Vec::new();
        let property = property_id(object, &mut scratch)?;
        let version = positive_int(object, "propertyVersion", &mut scratch)?;
        Some(format!("{property}:v{version}"))
    }
}

fn check_patch(position: usize, patch: &Value, issues: &mut Vec<String>) {
    let Some(patch) = patch.as_object() else {
        issues.push(format!("patches[{position}] must be an object"));
        return;
    };

    let pointer_ok = |field: &str| {
        patch.get(field).and_then(Value::as_str).is_some_and(|pointer| pointer.starts_with('/'))
    };

    if !pointer_ok("path") {
        issues.push(format!("patches[{position}].path must be a JSON pointer starting with '/'"));
    }

    let op = patch.get("op").and_then(Value::as_str).unwrap_or_default();
    match op {
        "add" | "replace" | "test" if !patch.contains_key("value") => {
            issues.push(format!("patches[{position}] ({op}) requires a value"));
        }
        "move" | "copy" if !pointer_ok("from") => {
            issues.push(format!("patches[{position}] ({op}) requires a 'from' pointer"));
        }
        _ if PATCH_OPS.contains(&op) => {}
        _ => issues.push(format!("patches[{position}].op must be one of {}", PATCH_OPS.join(", "))),
    }
}
