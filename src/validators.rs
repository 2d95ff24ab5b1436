//! # Attribute Validators
//!
//! Kubernetes name, label and annotation rules, plus the generic string-enum and
//! union checks attached by the schema converter.

use crate::diag::{AttributePath, Diagnostics};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

const DNS1123_SUBDOMAIN: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";
const QUALIFIED_NAME: &str = r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$";
const MAX_SUBDOMAIN_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;
const MAX_ANNOTATIONS_SIZE: usize = 256 * 1024;

const INVALID_VALUE: &str = "Invalid Attribute Value";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "validator", content = "values", rename_all = "snake_case")]
pub enum Validator {
    /// Kubernetes object name (DNS-1123 subdomain).
    Name,
    /// Label map: qualified-name keys, short label values.
    Labels,
    /// Annotation map: qualified-name keys, bounded total size.
    Annotations,
    /// String must be one of the listed values.
    OneOf(Vec<String>),
    /// Exactly one of the listed nested attributes must be set.
    ExactlyOneOf(Vec<String>),
    /// Integer within the given inclusive bounds.
    IntRange { min: Option<i64>, max: Option<i64> },
}

impl Validator {
    /// Checks a non-null value and records findings against `path`.
    pub fn validate(&self, path: &AttributePath, value: &Value, diags: &mut Diagnostics) {
        match self {
            Validator::Name => {
                if let Some(name) = value.as_str() {
                    if let Err(msg) = validate_name(name) {
                        diags.add_attribute_error(path, INVALID_VALUE, msg);
                    }
                }
            }
            Validator::Labels => {
                if let Some(map) = value.as_object() {
                    for (key, v) in map {
                        if let Err(msg) = validate_qualified_name(key) {
                            diags.add_attribute_error(&path.key(key), INVALID_VALUE, msg);
                        }
                        if let Some(label) = v.as_str() {
                            if let Err(msg) = validate_label_value(label) {
                                diags.add_attribute_error(&path.key(key), INVALID_VALUE, msg);
                            }
                        }
                    }
                }
            }
            Validator::Annotations => {
                if let Some(map) = value.as_object() {
                    for key in map.keys() {
                        if let Err(msg) = validate_qualified_name(key) {
                            diags.add_attribute_error(&path.key(key), INVALID_VALUE, msg);
                        }
                    }
                    let entries = map.iter().map(|(k, v)| (k.as_str(), v.as_str().unwrap_or_default()));
                    if let Err(msg) = validate_annotations_size(entries) {
                        diags.add_attribute_error(path, INVALID_VALUE, msg);
                    }
                }
            }
            Validator::OneOf(allowed) => {
                if let Some(s) = value.as_str() {
                    if !allowed.iter().any(|a| a == s) {
                        diags.add_attribute_error(
                            path,
                            INVALID_VALUE,
                            format!("value must be one of: {}, got: {:?}", allowed.join(", "), s),
                        );
                    }
                }
            }
            Validator::IntRange { min, max } => {
                if let Some(n) = value.as_i64() {
                    let below = min.is_some_and(|m| n < m);
                    let above = max.is_some_and(|m| n > m);
                    if below || above {
                        let lower = min.map_or("-inf".to_string(), |m| m.to_string());
                        let upper = max.map_or("+inf".to_string(), |m| m.to_string());
                        diags.add_attribute_error(
                            path,
                            INVALID_VALUE,
                            format!("value must be between {} and {}, got: {}", lower, upper, n),
                        );
                    }
                }
            }
            Validator::ExactlyOneOf(names) => {
                if let Some(obj) = value.as_object() {
                    let set: Vec<&String> = names
                        .iter()
                        .filter(|n| obj.get(n.as_str()).is_some_and(|v| !v.is_null()))
                        .collect();
                    if set.len() != 1 {
                        diags.add_attribute_error(
                            path,
                            "Invalid Attribute Combination",
                            format!(
                                "exactly one of these attributes must be configured: [{}], got {}",
                                names.join(", "),
                                set.len()
                            ),
                        );
                    }
                }
            }
        }
    }
}

/// Validate Kubernetes object name (RFC 1123 subdomain)
/// Length: 1-253 characters
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.len() > MAX_SUBDOMAIN_LENGTH {
        return Err(format!(
            "name '{}' exceeds maximum length of {} characters (got {})",
            name,
            MAX_SUBDOMAIN_LENGTH,
            name.len()
        ));
    }
    let re = Regex::new(DNS1123_SUBDOMAIN).map_err(|e| format!("Failed to compile regex: {e}"))?;
    if !re.is_match(name) {
        return Err(format!(
            "name '{name}' must be a valid Kubernetes name (lowercase alphanumeric, hyphens, dots; cannot start/end with hyphen or dot)"
        ));
    }
    Ok(())
}

/// Validate a label or annotation key: optional DNS subdomain prefix, `/`, name part.
pub fn validate_qualified_name(key: &str) -> Result<(), String> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    if let Some(prefix) = prefix {
        validate_name(prefix).map_err(|e| format!("key '{key}' has an invalid prefix: {e}"))?;
    }
    if name.is_empty() || name.len() > MAX_LABEL_LENGTH {
        return Err(format!(
            "key '{key}' name part must be 1-{MAX_LABEL_LENGTH} characters"
        ));
    }
    let re = Regex::new(QUALIFIED_NAME).map_err(|e| format!("Failed to compile regex: {e}"))?;
    if !re.is_match(name) {
        return Err(format!(
            "key '{key}' must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
        ));
    }
    Ok(())
}

/// Validate the total size of an annotation map: keys plus values, at most 256 KiB.
pub fn validate_annotations_size<'a, I>(entries: I) -> Result<(), String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let total: usize = entries.into_iter().map(|(k, v)| k.len() + v.len()).sum();
    if total > MAX_ANNOTATIONS_SIZE {
        return Err(format!(
            "annotations total size must be at most {MAX_ANNOTATIONS_SIZE} bytes, got {total}"
        ));
    }
    Ok(())
}

/// Validate Kubernetes label value: empty, or at most 63 qualified-name characters.
pub fn validate_label_value(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > MAX_LABEL_LENGTH {
        return Err(format!(
            "label value '{value}' exceeds maximum length of {MAX_LABEL_LENGTH} characters"
        ));
    }
    let re = Regex::new(QUALIFIED_NAME).map_err(|e| format!("Failed to compile regex: {e}"))?;
    if !re.is_match(value) {
        return Err(format!(
            "label value '{value}' must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
        ));
    }
    Ok(())
}
