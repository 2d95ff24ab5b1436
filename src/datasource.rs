//! # Manifest Data Sources
//!
//! The data source contract (`metadata`, `schema`, `read`) and its one implementation,
//! [`ManifestDataSource`], generic over the CRD spec type.
//!
//! A read takes configuration shaped like the CRD, pins `apiVersion` and `kind` to the
//! CRD's literals and stores the rendered YAML in the computed `yaml` attribute:
//!
//! ```yaml
//! apiVersion: canaries.flanksource.com/v1
//! kind: Canary
//! metadata:
//!   name: example
//!   namespace: default
//! spec:
//!   interval: 30
//! ```

use crate::diag::{Diagnostic, Diagnostics};
use crate::error::Error;
use crate::schema::{convert, Attribute, AttributeKind, ElementType, NestedAttributes, Schema};
use crate::utilities::{decode_config_error, marshal_yaml, marshal_yaml_error};
use crate::validators::{self, Validator};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    /// Configuration object, keyed by attribute name.
    pub config: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ReadResponse {
    /// New state; stays `None` when the read fails.
    pub state: Option<Value>,
    pub diagnostics: Diagnostics,
}

pub trait DataSource: Send + Sync {
    /// Type name of the data source under the given provider type name.
    fn metadata(&self, provider_type_name: &str) -> String;

    fn schema(&self) -> &Schema;

    fn read(&self, request: &ReadRequest, response: &mut ReadResponse);
}

/// Data sources that render a Kubernetes manifest and can check one.
pub trait ManifestSource: DataSource {
    fn api_version(&self) -> String;

    fn kind(&self) -> &'static str;

    /// Checks a parsed manifest of this kind: shape, apiVersion/kind and metadata.
    fn check_manifest(&self, manifest: &Value) -> Diagnostics;
}

/// Spec type of a CRD.
pub trait ManifestSpec: Serialize + DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// API group, e.g. `canaries.flanksource.com`.
    const GROUP: &'static str;
    const VERSION: &'static str;
    const KIND: &'static str;
    /// Top-level schema description.
    const DESCRIPTION: &'static str;

    fn api_version() -> String {
        format!("{}/{}", Self::GROUP, Self::VERSION)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// The rendered Kubernetes object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest<S> {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<S>,
}

pub struct ManifestDataSource<S> {
    schema: Schema,
    _spec: PhantomData<fn() -> S>,
}

impl<S: ManifestSpec> ManifestDataSource<S> {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            schema: manifest_schema::<S>()?,
            _spec: PhantomData,
        })
    }
}

impl<S: ManifestSpec> DataSource for ManifestDataSource<S> {
    fn metadata(&self, provider_type_name: &str) -> String {
        let group = S::GROUP.replace(['.', '-'], "_");
        format!(
            "{}_{}_{}_{}_manifest",
            provider_type_name,
            group,
            S::KIND.to_lowercase(),
            S::VERSION
        )
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn read(&self, request: &ReadRequest, response: &mut ReadResponse) {
        debug!(kind = S::KIND, "reading manifest data source");

        let decoded = self
            .schema
            .manifest_value(&request.config)
            .and_then(|value| serde_json::from_value::<Manifest<S>>(value).map_err(Error::from));
        let mut manifest = match decoded {
            Ok(manifest) => manifest,
            Err(e) => {
                response.diagnostics.push(decode_config_error(&e));
                return;
            }
        };

        manifest.api_version = S::api_version();
        manifest.kind = S::KIND.to_string();

        let yaml = match marshal_yaml(&manifest) {
            Ok(yaml) => yaml,
            Err(e) => {
                response.diagnostics.push(marshal_yaml_error(&e));
                return;
            }
        };

        let mut state = match &request.config {
            Value::Object(obj) => obj.clone(),
            _ => serde_json::Map::new(),
        };
        state.insert("yaml".to_string(), Value::String(yaml));
        response.state = Some(Value::Object(state));
    }
}

impl<S: ManifestSpec> ManifestSource for ManifestDataSource<S> {
    fn api_version(&self) -> String {
        S::api_version()
    }

    fn kind(&self) -> &'static str {
        S::KIND
    }

    fn check_manifest(&self, manifest: &Value) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let parsed: Manifest<S> = match serde_json::from_value(manifest.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                diags.add_error("Invalid manifest", format!("manifest does not match {}: {}", S::KIND, e));
                return diags;
            }
        };

        if parsed.api_version != S::api_version() {
            diags.add_error("Invalid manifest", format!("apiVersion must be '{}'", S::api_version()));
        }
        if parsed.kind != S::KIND {
            diags.add_error("Invalid manifest", format!("kind must be '{}'", S::KIND));
        }
        for (field, value) in [("metadata.name", &parsed.metadata.name), ("metadata.namespace", &parsed.metadata.namespace)] {
            if let Err(e) = validators::validate_name(value) {
                diags.add_error("Invalid manifest", format!("{}: {}", field, e));
            }
        }
        for (field, entries) in [("metadata.labels", &parsed.metadata.labels), ("metadata.annotations", &parsed.metadata.annotations)] {
            for key in entries.iter().flat_map(|m| m.keys()) {
                if let Err(e) = validators::validate_qualified_name(key) {
                    diags.add_error("Invalid manifest", format!("{}: {}", field, e));
                }
            }
        }
        for value in parsed.metadata.labels.iter().flat_map(|m| m.values()) {
            if let Err(e) = validators::validate_label_value(value) {
                diags.add_error("Invalid manifest", format!("metadata.labels: {}", e));
            }
        }
        if let Some(annotations) = &parsed.metadata.annotations {
            let entries = annotations.iter().map(|(k, v)| (k.as_str(), v.as_str()));
            if let Err(e) = validators::validate_annotations_size(entries) {
                diags.add_error("Invalid manifest", format!("metadata.annotations: {}", e));
            }
        }
        if parsed.spec.is_none() {
            diags.push(Diagnostic::warning(
                "Empty manifest",
                format!("{} has no spec; the controller will apply its defaults", S::KIND),
            ));
        }
        diags
    }
}

/// Schema shared by every manifest data source: `yaml`, `metadata` and the CRD `spec`.
fn manifest_schema<S: ManifestSpec>() -> Result<Schema, Error> {
    let metadata = NestedAttributes::new()
        .with(
            "name",
            Attribute::required(AttributeKind::String)
                .json("name")
                .describe("Unique identifier for this object. For more information see https://kubernetes.io/docs/concepts/overview/working-with-objects/names#names")
                .validate_with(Validator::Name),
        )
        .with(
            "namespace",
            Attribute::required(AttributeKind::String)
                .json("namespace")
                .describe("Namespaces provides a mechanism for isolating groups of resources within a single cluster. For more information see https://kubernetes.io/docs/concepts/overview/working-with-objects/namespaces/")
                .validate_with(Validator::Name),
        )
        .with(
            "labels",
            Attribute::optional(AttributeKind::Map(ElementType::String))
                .json("labels")
                .describe("Map of string keys and values that can be used to organize and categorize (scope and select) objects. For more information see https://kubernetes.io/docs/concepts/overview/working-with-objects/labels")
                .validate_with(Validator::Labels),
        )
        .with(
            "annotations",
            Attribute::optional(AttributeKind::Map(ElementType::String))
                .json("annotations")
                .describe("Annotations is an unstructured key value map stored with a resource that may be set by external tools to store and retrieve arbitrary metadata. For more information see https://kubernetes.io/docs/concepts/overview/working-with-objects/annotations")
                .validate_with(Validator::Annotations),
        );

    let spec = convert::attributes_for::<S>()?;

    Ok(Schema::new(
        S::DESCRIPTION,
        NestedAttributes::new()
            .with(
                "yaml",
                Attribute::computed(AttributeKind::String).describe("The generated manifest in YAML format."),
            )
            .with(
                "metadata",
                Attribute::required(AttributeKind::Object(metadata))
                    .json("metadata")
                    .describe("Data that helps uniquely identify the object."),
            )
            .with(
                "spec",
                Attribute::optional(AttributeKind::Object(spec))
                    .json("spec")
                    .describe(&format!("{} spec.", S::KIND)),
            ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate::validate_config;
    use serde_json::json;

    /// Widget spec.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    struct WidgetSpec {
        /// Size in units.
        size: Option<i64>,
        display_name: Option<String>,
    }

    impl ManifestSpec for WidgetSpec {
        const GROUP: &'static str = "widgets.example-corp.io";
        const VERSION: &'static str = "v1alpha1";
        const KIND: &'static str = "Widget";
        const DESCRIPTION: &'static str = "Widget is the Schema for the widgets API";
    }

    #[allow(dead_code)]
    #[derive(Debug, Deserialize, JsonSchema)]
    struct BrokenSpec {
        value: Option<String>,
    }

    impl Serialize for BrokenSpec {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("BrokenSpec cannot be represented"))
        }
    }

    impl ManifestSpec for BrokenSpec {
        const GROUP: &'static str = "broken.example.io";
        const VERSION: &'static str = "v1";
        const KIND: &'static str = "Broken";
        const DESCRIPTION: &'static str = "Broken";
    }

    fn read<S: ManifestSpec>(config: Value) -> ReadResponse {
        let ds = ManifestDataSource::<S>::new().unwrap();
        let mut response = ReadResponse::default();
        ds.read(&ReadRequest { config }, &mut response);
        response
    }

    #[test]
    fn test_metadata_type_name() {
        let ds = ManifestDataSource::<WidgetSpec>::new().unwrap();
        assert_eq!(ds.metadata("k8s"), "k8s_widgets_example_corp_io_widget_v1alpha1_manifest");
    }

    #[test]
    fn test_schema_layout() {
        let ds = ManifestDataSource::<WidgetSpec>::new().unwrap();
        let schema = ds.schema();
        assert_eq!(schema.description, "Widget is the Schema for the widgets API");
        assert_eq!(schema.attributes.get("yaml").unwrap().mode, crate::schema::Mode::Computed);
        let spec = schema.attributes.get("spec").unwrap().nested().unwrap();
        assert_eq!(spec.get("display_name").unwrap().json_name.as_deref(), Some("displayName"));
        assert_eq!(spec.get("size").unwrap().description, "Size in units.");
        assert!(schema.attributes.get("api_version").is_none());
        assert!(schema.attributes.get("kind").is_none());
    }

    #[test]
    fn test_read_renders_manifest() {
        let config = json!({
            "metadata": {"name": "example", "namespace": "default", "labels": null},
            "spec": {"size": 3, "display_name": "Big one"}
        });
        let response = read::<WidgetSpec>(config.clone());
        assert!(response.diagnostics.is_empty());
        let state = response.state.unwrap();
        assert_eq!(state["metadata"], config["metadata"]);
        assert_eq!(
            state["yaml"].as_str().unwrap(),
            "apiVersion: widgets.example-corp.io/v1alpha1\n\
             kind: Widget\n\
             metadata:\n  name: example\n  namespace: default\n\
             spec:\n  displayName: Big one\n  size: 3\n"
        );
    }

    #[test]
    fn test_read_omits_absent_spec() {
        let response = read::<WidgetSpec>(json!({"metadata": {"name": "a", "namespace": "b"}}));
        let yaml = response.state.unwrap()["yaml"].as_str().unwrap().to_string();
        assert!(!yaml.contains("spec"));
    }

    #[test]
    fn test_read_output_round_trips() {
        let response = read::<WidgetSpec>(json!({
            "metadata": {"name": "a", "namespace": "b", "annotations": {"note": "x"}},
            "spec": {"size": 1}
        }));
        let yaml = response.state.unwrap()["yaml"].as_str().unwrap().to_string();
        let parsed: Manifest<WidgetSpec> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(marshal_yaml(&parsed).unwrap(), yaml);
    }

    #[test]
    fn test_read_marshal_failure_leaves_state_unset() {
        let response = read::<BrokenSpec>(json!({
            "metadata": {"name": "a", "namespace": "b"},
            "spec": {"value": "x"}
        }));
        assert!(response.state.is_none());
        assert!(response.diagnostics.has_error());
        let diag = response.diagnostics.iter().next().unwrap();
        assert_eq!(diag.summary, "Unable to marshal YAML");
        assert!(diag.detail.contains("BrokenSpec cannot be represented"));
    }

    #[test]
    fn test_read_decode_failure() {
        let response = read::<WidgetSpec>(json!({"metadata": {"name": "a"}, "spec": {"size": "big"}}));
        assert!(response.state.is_none());
        assert_eq!(response.diagnostics.iter().next().unwrap().summary, "Unable to decode configuration");
    }

    #[test]
    fn test_schema_rejects_missing_namespace_before_read() {
        let ds = ManifestDataSource::<WidgetSpec>::new().unwrap();
        let diags = validate_config(ds.schema(), &json!({"metadata": {"name": "a"}}));
        assert!(diags.has_error());
        assert!(diags.lines()[0].contains("metadata.namespace"));
    }

    #[test]
    fn test_check_manifest() {
        let ds = ManifestDataSource::<WidgetSpec>::new().unwrap();
        let good = json!({
            "apiVersion": "widgets.example-corp.io/v1alpha1",
            "kind": "Widget",
            "metadata": {"name": "a", "namespace": "b"},
            "spec": {"size": 2}
        });
        assert!(ds.check_manifest(&good).is_empty());

        let bad = json!({
            "apiVersion": "widgets.example-corp.io/v1",
            "kind": "Widget",
            "metadata": {"name": "A_B", "namespace": "b", "labels": {"tier": "not valid!"}},
            "spec": {}
        });
        let lines = ds.check_manifest(&bad).lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("apiVersion"));
        assert!(lines[1].contains("metadata.name"));
        assert!(lines[2].contains("metadata.labels"));
    }

    #[test]
    fn test_check_manifest_without_spec_warns() {
        let ds = ManifestDataSource::<WidgetSpec>::new().unwrap();
        let diags = ds.check_manifest(&json!({
            "apiVersion": "widgets.example-corp.io/v1alpha1",
            "kind": "Widget",
            "metadata": {"name": "a", "namespace": "b"}
        }));
        assert_eq!(diags.len(), 1);
        assert!(!diags.has_error());
        assert!(diags.lines()[0].starts_with("Warning: Empty manifest"));
    }

    #[test]
    fn test_check_manifest_annotation_size_matches_schema() {
        let ds = ManifestDataSource::<WidgetSpec>::new().unwrap();
        let big = "x".repeat(300 * 1024);
        let config = json!({"metadata": {"name": "a", "namespace": "b", "annotations": {"note": big}}});
        assert!(validate_config(ds.schema(), &config).has_error());

        let manifest = json!({
            "apiVersion": "widgets.example-corp.io/v1alpha1",
            "kind": "Widget",
            "metadata": {"name": "a", "namespace": "b", "annotations": {"note": big}},
            "spec": {}
        });
        let lines = ds.check_manifest(&manifest).lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("metadata.annotations"));
        assert!(lines[0].contains("at most 262144 bytes"));
    }
}
