//! Field extraction helpers shared by the rule sets
//!
//! Each helper records a message on failure and returns `None`, so a rule set
//! can report every problem with an item in one pass.

use serde_json::{Map, Value};

pub(crate) type Object = Map<String, Value>;

/// Borrow the payload as a JSON object or record why it is not one.
pub(crate) fn as_object<'a>(payload: &'a Value, issues: &mut Vec<String>) -> Option<&'a Object> {
    match payload.as_object() {
        Some(object) => Some(object),
        None => {
            issues.push(format!("item payload must be a JSON object, got {}", kind(payload)));
            None
        }
    }
}

/// Property identifiers are accepted as non-empty strings (`prp_123`) or as
/// positive integers.
pub(crate) fn property_id(object: &Object, issues: &mut Vec<String>) -> Option<String> {
    match object.get("propertyId") {
        None | Some(Value::Null) => {
            issues.push("propertyId is required".to_string());
            None
        }
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Some(Value::Number(n)) if n.as_u64().is_some_and(|id| id > 0) => Some(n.to_string()),
        Some(_) => {
            issues.push("propertyId must be a non-empty string or positive integer".to_string());
            None
        }
    }
}

pub(crate) fn positive_int(object: &Object, field: &str, issues: &mut Vec<String>) -> Option<u64> {
    match object.get(field) {
        None | Some(Value::Null) => {
            issues.push(format!("{field} is required"));
            None
        }
        Some(value) => match value.as_u64() {
            Some(n) if n > 0 => Some(n),
            _ => {
                issues.push(format!("{field} must be a positive integer"));
                None
            }
        },
    }
}

pub(crate) fn required_str<'a>(
    object: &'a Object,
    field: &str,
    issues: &mut Vec<String>,
) -> Option<&'a str> {
    match object.get(field) {
        None | Some(Value::Null) => {
            issues.push(format!("{field} is required"));
            None
        }
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        Some(_) => {
            issues.push(format!("{field} must be a non-empty string"));
            None
        }
    }
}

/// Optional string: absent is fine, present must be a non-empty string.
pub(crate) fn optional_str<'a>(
    object: &'a Object,
    field: &str,
    issues: &mut Vec<String>,
) -> Option<&'a str> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        Some(_) => {
            issues.push(format!("{field} must be a non-empty string when present"));
            None
        }
    }
}

pub(crate) fn optional_bool(object: &Object, field: &str, issues: &mut Vec<String>) -> Option<bool> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(flag)) => Some(*flag),
        Some(_) => {
            issues.push(format!("{field} must be a boolean"));
            None
        }
    }
}

/// Optional list of strings. Returns an empty list when the field is absent.
pub(crate) fn optional_str_list(
    object: &Object,
    field: &str,
    issues: &mut Vec<String>,
) -> Vec<String> {
    match object.get(field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => {
            let mut out = Vec::with_capacity(values.len());
            for (position, value) in values.iter().enumerate() {
                match value.as_str() {
                    Some(s) => out.push(s.to_string()),
                    None => issues.push(format!("{field}[{position}] must be a string")),
                }
            }
            out
        }
        Some(_) => {
            issues.push(format!("{field} must be an array of strings"));
            Vec::new()
        }
    }
}

/// Minimal shape check; the control-plane does real address validation.
pub(crate) fn check_emails(emails: &[String], origin: &str, issues: &mut Vec<String>) {
    for email in emails {
        let trimmed = email.trim();
        let valid = trimmed
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            issues.push(format!("{origin} contains an invalid e-mail address: {email:?}"));
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
