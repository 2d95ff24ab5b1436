//! # Provider
//!
//! Registry of manifest data sources keyed by type name. Reads go through schema
//! validation first; a configuration with errors never reaches the data source.

use crate::config::ProviderConfig;
use crate::crds;
use crate::datasource::{ManifestSource, ReadRequest, ReadResponse};
use crate::diag::Diagnostics;
use crate::error::Error;
use crate::schema::validate::validate_config;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub struct Provider {
    type_name: String,
    data_sources: BTreeMap<String, Box<dyn ManifestSource>>,
}

impl Provider {
    pub fn new(config: &ProviderConfig) -> Result<Self, Error> {
        let mut data_sources = BTreeMap::new();
        for source in crds::manifest_data_sources()? {
            data_sources.insert(source.metadata(&config.type_name), source);
        }
        info!(
            provider = %config.type_name,
            data_sources = data_sources.len(),
            "registered manifest data sources"
        );
        Ok(Self {
            type_name: config.type_name.clone(),
            data_sources,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Registered type names, sorted.
    pub fn data_source_names(&self) -> Vec<&str> {
        self.data_sources.keys().map(String::as_str).collect()
    }

    pub fn data_source(&self, type_name: &str) -> Option<&dyn ManifestSource> {
        self.data_sources.get(type_name).map(|s| s.as_ref())
    }

    pub fn find_by_kind(&self, api_version: &str, kind: &str) -> Option<&dyn ManifestSource> {
        self.data_sources
            .values()
            .find(|s| s.api_version() == api_version && s.kind() == kind)
            .map(|s| s.as_ref())
    }

    pub fn read_data_source(&self, type_name: &str, config: Value) -> Result<ReadResponse, Error> {
        let source = self.data_source(type_name).ok_or_else(|| Error::UnknownDataSource {
            type_name: type_name.to_string(),
        })?;

        let mut response = ReadResponse::default();
        let diagnostics = validate_config(source.schema(), &config);
        if diagnostics.has_error() {
            warn!(data_source = type_name, errors = diagnostics.len(), "configuration rejected");
            response.diagnostics = diagnostics;
            return Ok(response);
        }
        response.diagnostics = diagnostics;

        debug!(data_source = type_name, "reading");
        source.read(&ReadRequest { config }, &mut response);
        Ok(response)
    }

    /// Checks a YAML manifest against the data source registered for its apiVersion and kind.
    pub fn validate_manifest(&self, yaml: &str) -> Result<Diagnostics, Error> {
        let manifest: Value = serde_yaml::from_str(yaml)?;
        let mut diags = Diagnostics::new();

        let api_version = manifest.get("apiVersion").and_then(Value::as_str);
        let kind = manifest.get("kind").and_then(Value::as_str);
        let (Some(api_version), Some(kind)) = (api_version, kind) else {
            if api_version.is_none() {
                diags.add_error("Invalid manifest", "apiVersion is required");
            }
            if kind.is_none() {
                diags.add_error("Invalid manifest", "kind is required");
            }
            return Ok(diags);
        };

        match self.find_by_kind(api_version, kind) {
            Some(source) => diags.extend(source.check_manifest(&manifest)),
            None => diags.add_error(
                "Unsupported manifest",
                format!("no data source is registered for {} {}", api_version, kind),
            ),
        }
        if diags.has_error() {
            warn!(kind, errors = diags.len(), "manifest failed validation");
        }
        Ok(diags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> Provider {
        Provider::new(&ProviderConfig::default()).unwrap()
    }

    #[test]
    fn test_data_source_names() {
        assert_eq!(
            provider().data_source_names(),
            vec![
                "k8s_canaries_flanksource_com_canary_v1_manifest",
                "k8s_canaries_flanksource_com_topology_v1_manifest",
            ]
        );
    }

    #[test]
    fn test_custom_provider_name() {
        let provider = Provider::new(&ProviderConfig {
            type_name: "kubernetes".to_string(),
        })
        .unwrap();
        assert_eq!(provider.type_name(), "kubernetes");
        assert!(provider
            .data_source("kubernetes_canaries_flanksource_com_canary_v1_manifest")
            .is_some());
    }

    #[test]
    fn test_find_by_kind() {
        let provider = provider();
        let source = provider.find_by_kind("canaries.flanksource.com/v1", "Topology").unwrap();
        assert_eq!(source.kind(), "Topology");
        assert!(provider.find_by_kind("canaries.flanksource.com/v2", "Canary").is_none());
    }

    #[test]
    fn test_read_unknown_data_source() {
        let err = provider().read_data_source("k8s_unknown_manifest", json!({})).unwrap_err();
        assert!(matches!(err, Error::UnknownDataSource { .. }));
    }

    #[test]
    fn test_read_canary() {
        let response = provider()
            .read_data_source(
                "k8s_canaries_flanksource_com_canary_v1_manifest",
                json!({"metadata": {"name": "example", "namespace": "default"}, "spec": {"interval": 30}}),
            )
            .unwrap();
        assert!(response.diagnostics.is_empty());
        let state = response.state.unwrap();
        assert!(state["yaml"].as_str().unwrap().starts_with("apiVersion: canaries.flanksource.com/v1\n"));
        assert_eq!(state["metadata"]["name"], "example");
    }

    #[test]
    fn test_invalid_config_skips_read() {
        let response = provider()
            .read_data_source(
                "k8s_canaries_flanksource_com_canary_v1_manifest",
                json!({"kind": "Pod", "metadata": {"name": "UPPER", "namespace": "default"}}),
            )
            .unwrap();
        assert!(response.state.is_none());
        assert_eq!(response.diagnostics.len(), 2);
    }

    #[test]
    fn test_out_of_range_integer_never_reaches_read() {
        let response = provider()
            .read_data_source(
                "k8s_canaries_flanksource_com_canary_v1_manifest",
                json!({"metadata": {"name": "example", "namespace": "default"}, "spec": {"interval": -5}}),
            )
            .unwrap();
        assert!(response.state.is_none());
        assert_eq!(response.diagnostics.len(), 1);
        let line = &response.diagnostics.lines()[0];
        assert!(line.contains("Invalid Attribute Value (spec.interval)"), "{}", line);
        assert!(!line.contains("Unable to decode configuration"));
    }

    #[test]
    fn test_validate_rendered_manifest() {
        let provider = provider();
        let response = provider
            .read_data_source(
                "k8s_canaries_flanksource_com_canary_v1_manifest",
                json!({"metadata": {"name": "example", "namespace": "default"}}),
            )
            .unwrap();
        let yaml = response.state.unwrap()["yaml"].as_str().unwrap().to_string();
        let diags = provider.validate_manifest(&yaml).unwrap();
        assert!(!diags.has_error(), "{:?}", diags.lines());
    }

    #[test]
    fn test_validate_manifest_problems() {
        let provider = provider();
        let diags = provider.validate_manifest("metadata:\n  name: x\n").unwrap();
        assert_eq!(diags.len(), 2);

        let diags = provider
            .validate_manifest("apiVersion: canaries.flanksource.com/v1\nkind: Canary\nmetadata:\n  name: Bad_Name\n  namespace: default\nspec:\n  interval: 30\n")
            .unwrap();
        assert_eq!(diags.len(), 1);
        assert!(diags.lines()[0].contains("metadata.name"));

        let diags = provider
            .validate_manifest("apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: x\n")
            .unwrap();
        assert!(diags.lines()[0].contains("no data source is registered"));

        assert!(provider.validate_manifest("apiVersion: [").is_err());
    }
}
