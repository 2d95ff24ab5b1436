// Render and validate manifests through the provider's data sources.

use crate::diag::Severity;
use crate::provider::Provider;
use serde_json::Value;

/// Reads a manifest data source and returns the rendered YAML.
/// config is the data source configuration as a JSON object string, keyed by attribute name.
pub fn read_manifest(provider: &Provider, type_name: &str, config: &str) -> Result<String, String> {
    let config: Value = serde_json::from_str(config).map_err(|e| format!("config must be a JSON object: {}", e))?;
    if !config.is_object() {
        return Err("config must be a JSON object".to_string());
    }

    let response = provider
        .read_data_source(type_name, config)
        .map_err(|e| format!("{}. Known data sources: {}", e, provider.data_source_names().join(", ")))?;

    if response.diagnostics.has_error() {
        return Err(response.diagnostics.lines().join("\n"));
    }
    response
        .state
        .as_ref()
        .and_then(|state| state.get("yaml"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "data source returned no state".to_string())
}

/// Validates a YAML manifest of a registered kind. Returns the warnings when it is valid.
pub fn validate_manifest(provider: &Provider, manifest_yaml: &str) -> Result<Vec<String>, Vec<String>> {
    let diags = provider
        .validate_manifest(manifest_yaml)
        .map_err(|e| vec![e.to_string()])?;
    if diags.has_error() {
        return Err(diags.lines());
    }
    Ok(diags
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .map(ToString::to_string)
        .collect())
}
