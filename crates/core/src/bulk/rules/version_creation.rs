//! Property version creation rules

use cdnbulk_domain::{BulkOperationConfig, OperationType};
use serde_json::Value;

use super::fields::{as_object, optional_str, positive_int, property_id};
use super::OperationRules;

/// Rules for `{propertyId, createFromVersion, createFromVersionEtag?}` items
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionCreationRules;

impl OperationRules for VersionCreationRules {
    fn operation_type(&self) -> OperationType {
        OperationType::VersionCreation
    }

    fn validate(&self, payload: &Value, _config: &BulkOperationConfig) -> Vec<String> {
        let mut issues = Vec::new();
        let Some(object) = as_object(payload, &mut issues) else {
            return issues;
        };

        property_id(object, &mut issues);
        positive_int(object, "createFromVersion", &mut issues);
        optional_str(object, "createFromVersionEtag", &mut issues);
        issues
    }

    fn item_id(&self, payload: &Value) -> Option<String> {
        let object = payload.as_object()?;
        let mut scratch = Vec::new();
        let property = property_id(object, &mut scratch)?;
        let base = positive_int(object, "createFromVersion", &mut scratch)?;
        Some(format!("{property}:from-v{base}"))
    }
}
