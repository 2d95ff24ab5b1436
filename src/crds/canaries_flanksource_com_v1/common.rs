//! # Shared Types
//!
//! Building blocks reused across the `canaries.flanksource.com/v1` kinds: value-or-reference
//! variables, connection credentials, check descriptions and result templates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value supplied literally or looked up from another object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Name of the variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Literal value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Source to read the value from when it is not given literally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

/// Where a variable's value is read from. Exactly one source applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum EnvVarSource {
    /// Selects a key of a ConfigMap in the object's namespace.
    ConfigMapKeyRef(KeySelector),
    /// Selects a value from the merged values of a Helm release.
    HelmRef(HelmRefKeySelector),
    /// Selects a key of a Secret in the object's namespace.
    SecretKeyRef(KeySelector),
    /// Name of the service account whose token is used as the value.
    ServiceAccount(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeySelector {
    /// Name of the referent.
    pub name: String,
    /// The key to select.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HelmRefKeySelector {
    /// Name of the Helm release.
    pub name: String,
    /// JSONPath expression used to fetch the key from the merged values.
    pub key: String,
}

/// Credentials for a remote endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Name of a stored connection, e.g. `connection://postgres/payments`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// Connection URL; overrides the URL of a stored connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<EnvVar>,
}

/// Fields common to every check.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckMeta {
    /// Name of the check, unique within the canary.
    pub name: String,
    /// Description for the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Icon for overwriting the default icon on the dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Labels for the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Namespace to insert the check into, if different to the namespace of the canary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Metrics to export from the check result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<CheckMetric>>,
    /// What to do with transformed checks that stop being returned: Ignore, Mark healthy or Mark unhealthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_delete_strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckMetric {
    pub name: String,
    /// Expression producing the metric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// One of gauge, counter, histogram.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<MetricLabel>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricLabel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_expr: Option<String>,
}

/// Expressions applied to a check result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Templatable {
    /// Evaluated against the result; the check fails when it returns false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<Template>,
    /// Formats the result for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Template>,
    /// Turns the result into new checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Template>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,
    /// CEL expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub javascript: Option<String>,
}

/// Label and field selectors for Kubernetes objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_selector: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_var_source_serializes_as_single_key() {
        let var = EnvVar {
            name: Some("password".to_string()),
            value: None,
            value_from: Some(EnvVarSource::SecretKeyRef(KeySelector {
                name: "db".to_string(),
                key: "password".to_string(),
            })),
        };
        assert_eq!(
            serde_json::to_value(&var).unwrap(),
            json!({"name": "password", "valueFrom": {"secretKeyRef": {"name": "db", "key": "password"}}})
        );
    }

    #[test]
    fn test_env_var_literal_omits_value_from() {
        let var = EnvVar {
            value: Some("admin".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&var).unwrap(), json!({"value": "admin"}));
    }

    #[test]
    fn test_env_var_source_service_account() {
        let source: EnvVarSource = serde_json::from_value(json!({"serviceAccount": "checker"})).unwrap();
        assert_eq!(source, EnvVarSource::ServiceAccount("checker".to_string()));
    }

    #[test]
    fn test_metric_type_field_name() {
        let metric = CheckMetric {
            name: "latency".to_string(),
            type_: Some("gauge".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&metric).unwrap(),
            json!({"name": "latency", "type": "gauge"})
        );
    }
}
