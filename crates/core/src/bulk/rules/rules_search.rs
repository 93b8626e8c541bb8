//! Rule tree searches

use cdnbulk_domain::{BulkOperationConfig, OperationType};
use serde_json::Value;

use super::fields::{as_object, positive_int, property_id, required_str};
use super::OperationRules;

/// Rules for `{propertyId, propertyVersion, match}` items
///
/// Searches are read-only on the remote side and cannot be cancelled once
/// submitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesSearchRules;

impl OperationRules for RulesSearchRules {
    fn operation_type(&self) -> OperationType {
        OperationType::RulesSearch
    }

    fn validate(&self, payload: &Value, _config: &BulkOperationConfig) -> Vec<String> {
        let mut issues = Vec::new();
        let Some(object) = as_object(payload, &mut issues) else {
            return issues;
        };

        property_id(object, &mut issues);
        positive_int(object, "propertyVersion", &mut issues);
        if let Some(expression) = required_str(object, "match", &mut issues) {
            if !expression.trim_start().starts_with('$') {
                issues.push(format!(
                    "match must be a JSONPath expression starting with '$', got {expression:?}"
                ));
            }
        }
        issues
    }

    fn item_id(&self, payload: &Value) -> Option<String> {
        let object = payload.as_object()?;
        let mut scratch = Vec::new();
        let property = property_id(object, &mut scratch)?;
        let version = positive_int(object, "propertyVersion", &mut scratch)?;
        Some(format!("{property}:v{version}:search"))
    }

    fn supports_cancellation(&self) -> bool {
        false
    }
}
