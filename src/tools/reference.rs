// Reference data for the registered data sources (list_manifest_data_sources, get_manifest_data_source_schema).

use crate::provider::Provider;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct DataSourceSummary<'a> {
    type_name: &'a str,
    api_version: String,
    kind: &'a str,
    description: &'a str,
}

pub fn list_data_sources_json(provider: &Provider) -> String {
    let summaries: Vec<DataSourceSummary> = provider
        .data_source_names()
        .into_iter()
        .filter_map(|name| {
            provider.data_source(name).map(|source| DataSourceSummary {
                type_name: name,
                api_version: source.api_version(),
                kind: source.kind(),
                description: &source.schema().description,
            })
        })
        .collect();
    serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".to_string())
}

/// Attribute tree of a data source: kinds, modes, manifest keys, descriptions and validators.
pub fn data_source_schema_json(provider: &Provider, type_name: &str) -> Result<String, String> {
    let source = provider.data_source(type_name).ok_or_else(|| {
        format!(
            "unknown data source '{}'. Known data sources: {}",
            type_name,
            provider.data_source_names().join(", ")
        )
    })?;
    serde_json::to_string_pretty(source.schema()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use serde_json::Value;

    fn provider() -> Provider {
        Provider::new(&ProviderConfig::default()).unwrap()
    }

    #[test]
    fn test_list_data_sources_json() {
        let out: Value = serde_json::from_str(&list_data_sources_json(&provider())).unwrap();
        let list = out.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["type_name"], "k8s_canaries_flanksource_com_canary_v1_manifest");
        assert_eq!(list[0]["api_version"], "canaries.flanksource.com/v1");
        assert_eq!(list[0]["kind"], "Canary");
        assert_eq!(list[0]["description"], "Canary is the Schema for the canaries API");
    }

    #[test]
    fn test_data_source_schema_json() {
        let out = data_source_schema_json(&provider(), "k8s_canaries_flanksource_com_canary_v1_manifest").unwrap();
        let schema: Value = serde_json::from_str(&out).unwrap();
        let attributes = &schema["attributes"];
        assert_eq!(attributes["yaml"]["mode"], "computed");
        assert_eq!(attributes["metadata"]["mode"], "required");
        assert_eq!(attributes["metadata"]["type"], "object");
        assert_eq!(attributes["metadata"]["element"]["name"]["validators"][0]["validator"], "name");
        assert_eq!(attributes["spec"]["element"]["interval"]["type"], "int64");
    }

    #[test]
    fn test_data_source_schema_json_unknown() {
        let err = data_source_schema_json(&provider(), "k8s_nope_manifest").unwrap_err();
        assert!(err.contains("unknown data source"));
    }
}
