//! Property activation rules

use cdnbulk_domain::{BulkOperationConfig, OperationType};
use serde_json::Value;

use super::fields::{
    as_object, check_emails, optional_bool, optional_str, optional_str_list, positive_int,
    property_id, required_str,
};
use super::OperationRules;

/// Target network of an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Network {
    Staging,
    Production,
}

impl Network {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "STAGING" => Some(Self::Staging),
            "PRODUCTION" => Some(Self::Production),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Staging => "STAGING",
            Self::Production => "PRODUCTION",
        }
    }
}

/// Rules for `{propertyId, version, network, acknowledgeAllWarnings?,
/// notifyEmails?, note?}` items
///
/// Production activations need an explicit warning acknowledgement. The item
/// flag wins when present (an explicit `false` is not overridden by the
/// batch); otherwise the batch flag applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivationRules;

impl OperationRules for ActivationRules {
    fn operation_type(&self) -> OperationType {
        OperationType::Activation
    }

    fn validate_config(&self, config: &BulkOperationConfig) -> Vec<String> {
        let mut issues = Vec::new();
        check_emails(&config.notify_emails, "batch notifyEmails", &mut issues);
        issues
    }

    fn validate(&self, payload: &Value, config: &BulkOperationConfig) -> Vec<String> {
        let mut issues = Vec::new();
        let Some(object) = as_object(payload, &mut issues) else {
            return issues;
        };

        property_id(object, &mut issues);
        positive_int(object, "version", &mut issues);
        optional_str(object, "note", &mut issues);

        let network = required_str(object, "network", &mut issues).and_then(|raw| {
            let parsed = Network::parse(raw);
            if parsed.is_none() {
                issues.push(format!("network must be STAGING or PRODUCTION, got {raw:?}"));
            }
            parsed
        });

        let acknowledged = optional_bool(object, "acknowledgeAllWarnings", &mut issues)
            .unwrap_or(config.acknowledge_all_warnings);
        if network == Some(Network::Production) && !acknowledged {
            issues.push(
                "PRODUCTION activation requires acknowledgeAllWarnings on the item or the batch"
                    .to_string(),
            );
        }

        let item_emails = optional_str_list(object, "notifyEmails", &mut issues);
        check_emails(&item_emails, "notifyEmails", &mut issues);
        if item_emails.is_empty() && config.notify_emails.is_empty() {
            issues.push("at least one notification e-mail is required on the item or the batch".to_string());
        }

        issues
    }

    fn item_id(&self, payload: &Value) -> Option<String> {
        let object = payload.as_object()?;
        let mut scratch = Vec::new();
        let property = property_id(object, &mut scratch)?;
        let version = positive_int(object, "version", &mut scratch)?;
        let network = object.get("network")?.as_str().and_then(Network::parse)?;
        Some(format!("{property}:v{version}:{}", network.as_str()))
    }
}
