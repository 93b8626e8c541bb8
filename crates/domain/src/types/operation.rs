//! Batch request types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use crate::constants::{
    ACTIVATION_BATCH_CEILING, RULES_PATCH_BATCH_CEILING, RULES_SEARCH_BATCH_CEILING,
    VERSION_CREATION_BATCH_CEILING,
};

/// Kind of bulk operation. Each kind has its own payload shape, rule set and
/// batch ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Activation,
    VersionCreation,
    RulesPatch,
    RulesSearch,
}

crate::impl_domain_status_conversions!(OperationType {
    Activation => "ACTIVATION",
    VersionCreation => "VERSION_CREATION",
    RulesPatch => "RULES_PATCH",
    RulesSearch => "RULES_SEARCH",
});

impl OperationType {
    /// Every supported operation type
    pub const ALL: [Self; 4] =
        [Self::Activation, Self::VersionCreation, Self::RulesPatch, Self::RulesSearch];

    /// Maximum number of items accepted in a single batch
    pub fn batch_ceiling(self) -> usize {
        match self {
            Self::Activation => ACTIVATION_BATCH_CEILING,
            Self::VersionCreation => VERSION_CREATION_BATCH_CEILING,
            Self::RulesPatch => RULES_PATCH_BATCH_CEILING,
            Self::RulesSearch => RULES_SEARCH_BATCH_CEILING,
        }
    }
}

/// Opaque job identifier issued by the control-plane
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Batch-level settings shared by every item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationConfig {
    /// Notification targets applied to items that carry none of their own
    #[serde(default)]
    pub notify_emails: Vec<String>,
    /// Batch-wide warning acknowledgement; an item-level flag overrides it
    #[serde(default)]
    pub acknowledge_all_warnings: bool,
}

/// One unit of work in a batch
///
/// The payload is the caller's operation-specific JSON object, passed through
/// to the control-plane untouched. The item id is derived from the payload
/// by the operation's rule set and correlates the submitted item with the
/// per-item states reported later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationItem {
    item_id: String,
    payload: Value,
}

impl BulkOperationItem {
    pub fn new(item_id: impl Into<String>, payload: Value) -> Self {
        Self { item_id: item_id.into(), payload }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// A validated, immutable batch ready for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationRequest {
    operation_type: OperationType,
    items: Vec<BulkOperationItem>,
    config: BulkOperationConfig,
}

impl BulkOperationRequest {
    pub fn new(
        operation_type: OperationType,
        items: Vec<BulkOperationItem>,
        config: BulkOperationConfig,
    ) -> Self {
        Self { operation_type, items, config }
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn items(&self) -> &[BulkOperationItem] {
        &self.items
    }

    pub fn config(&self) -> &BulkOperationConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A single validation finding
///
/// `item_index` is the item's position in the submitted batch, or `None` for
/// findings about the batch as a whole (empty batch, ceiling exceeded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub item_index: Option<usize>,
    pub message: String,
}

impl ValidationIssue {
    pub fn item(index: usize, message: impl Into<String>) -> Self {
        Self { item_index: Some(index), message: message.into() }
    }

    pub fn batch(message: impl Into<String>) -> Self {
        Self { item_index: None, message: message.into() }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item_index {
            Some(index) => write!(f, "item {index}: {}", self.message),
            None => write!(f, "batch: {}", self.message),
        }
    }
}

/// Handle for a submitted job. Created once, at successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct OperationHandle {
    pub job_id: JobId,
    pub operation_type: OperationType,
    #[cfg_attr(feature = "ts-gen", ts(type = "string"))]
    pub submitted_at: DateTime<Utc>,
    pub item_count: usize,
}
