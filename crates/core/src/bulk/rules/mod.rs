//! Per-operation-type rule sets
//!
//! Each operation type (activation, version creation, rules patch, rules
//! search) implements [`OperationRules`] once. The coordinator only talks to
//! the trait, so adding a new operation type means adding a rule set rather
//! than touching shared logic.

mod activation;
mod fields;
mod rules_patch;
mod rules_search;
mod version_creation;

use std::collections::HashMap;
use std::sync::Arc;

use cdnbulk_domain::{BulkError, BulkOperationConfig, OperationType, Result};
use serde_json::Value;

pub use activation::ActivationRules;
pub use rules_patch::RulesPatchRules;
pub use rules_search::RulesSearchRules;
pub use version_creation::VersionCreationRules;

/// Validation and identity rules for one operation type
pub trait OperationRules: Send + Sync {
    /// Operation type these rules apply to
    fn operation_type(&self) -> OperationType;

    /// Maximum batch size accepted for this operation type
    fn batch_ceiling(&self) -> usize {
        self.operation_type().batch_ceiling()
    }

    /// Check batch-level settings. Returns one message per problem.
    fn validate_config(&self, _config: &BulkOperationConfig) -> Vec<String> {
        Vec::new()
    }

    /// Check a single item payload. Pure and deterministic; returns one
    /// message per problem and an empty list when the item is valid.
    fn validate(&self, payload: &Value, config: &BulkOperationConfig) -> Vec<String>;

    /// Identifier used to correlate the item with remote per-item states.
    /// Only called for payloads that passed [`OperationRules::validate`].
    fn item_id(&self, payload: &Value) -> Option<String>;

    /// Whether the control-plane can cancel an in-flight job of this type
    fn supports_cancellation(&self) -> bool {
        true
    }
}

/// Lookup table from operation type to its rule set
#[derive(Clone, Default)]
pub struct RuleSet {
    rules: HashMap<OperationType, Arc<dyn OperationRules>>,
}

impl RuleSet {
    /// Empty rule set; every lookup fails until rules are registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule set covering all four built-in operation types
    pub fn standard() -> Self {
        Self::new()
            .with(Arc::new(ActivationRules))
            .with(Arc::new(VersionCreationRules))
            .with(Arc::new(RulesPatchRules))
            .with(Arc::new(RulesSearchRules))
    }

    /// Register (or replace) the rules for an operation type
    pub fn with(mut self, rules: Arc<dyn OperationRules>) -> Self {
        self.rules.insert(rules.operation_type(), rules);
        self
    }

    /// Rules for `operation_type`
    ///
    /// # Errors
    ///
    /// Returns `BulkError::Config` when no rules are registered for the type.
    pub fn rules_for(&self, operation_type: OperationType) -> Result<&dyn OperationRules> {
        self.rules
            .get(&operation_type)
            .map(|rules| rules.as_ref())
            .ok_or_else(|| BulkError::Config(format!("no rules registered for {operation_type}")))
    }

    pub fn supports(&self, operation_type: OperationType) -> bool {
        self.rules.contains_key(&operation_type)
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<String> = self.rules.keys().map(ToString::to_string).collect();
        types.sort();
        f.debug_struct("RuleSet").field("operation_types", &types).finish()
    }
}
