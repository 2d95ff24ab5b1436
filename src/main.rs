//! Kubernetes manifest provider MCP server: render CRD manifests from configuration and validate them.

mod config;
mod crds;
mod datasource;
mod diag;
mod error;
mod provider;
mod schema;
mod tools;
mod utilities;
mod validators;

use crate::config::{Args, ProviderConfig};
use crate::provider::Provider;
use clap::Parser;
use rmcp::{
    handler::server::ServerHandler,
    model::{CallToolResult, Content},
    tool, tool_handler, tool_router,
    transport::stdio,
    ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct ReadParams {
    /// Data source type name, e.g. k8s_canaries_flanksource_com_canary_v1_manifest
    type_name: String,
    /// Configuration as JSON object string with snake_case attribute names: metadata (name, namespace, labels, annotations) and spec
    config: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct SchemaParams {
    /// Data source type name
    type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct ValidateParams {
    /// YAML manifest to validate
    manifest: String,
}

#[derive(Clone)]
struct ManifestProviderService {
    provider: Arc<Provider>,
    tool_router: rmcp::handler::server::tool::ToolRouter<Self>,
}

#[tool_router]
impl ManifestProviderService {
    fn new(provider: Arc<Provider>) -> Self {
        Self {
            provider,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Read a manifest data source: render the CRD manifest for the given configuration as YAML")]
    async fn read_manifest_data_source(
        &self,
        params: rmcp::handler::server::wrapper::Parameters<ReadParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let p = params.0;
        match tools::manifest::read_manifest(&self.provider, &p.type_name, &p.config) {
            Ok(out) => Ok(CallToolResult::success(vec![Content::text(out)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e)])),
        }
    }

    #[tool(description = "List manifest data sources with their apiVersion and kind")]
    async fn list_manifest_data_sources(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        let out = tools::reference::list_data_sources_json(&self.provider);
        Ok(CallToolResult::success(vec![Content::text(out)]))
    }

    #[tool(description = "Get the attribute schema of a manifest data source")]
    async fn get_manifest_data_source_schema(
        &self,
        params: rmcp::handler::server::wrapper::Parameters<SchemaParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        match tools::reference::data_source_schema_json(&self.provider, &params.0.type_name) {
            Ok(out) => Ok(CallToolResult::success(vec![Content::text(out)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e)])),
        }
    }

    #[tool(description = "Validate a YAML manifest of a supported kind (apiVersion, kind, metadata, spec shape)")]
    async fn validate_manifest(
        &self,
        params: rmcp::handler::server::wrapper::Parameters<ValidateParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        match tools::manifest::validate_manifest(&self.provider, &params.0.manifest) {
            Ok(warnings) if warnings.is_empty() => Ok(CallToolResult::success(vec![Content::text("Manifest is valid.")])),
            Ok(warnings) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Manifest is valid.\n{}",
                warnings.join("\n")
            ))])),
            Err(errors) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Validation errors:\n{}",
                errors.join("\n")
            ))])),
        }
    }
}

#[tool_handler]
impl ServerHandler for ManifestProviderService {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo::new(
            rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
        )
        .with_instructions(format!(
            "Manifest data sources for Kubernetes CRDs ({} provider): render manifests from configuration and validate them.",
            self.provider.type_name()
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_filter)))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let provider = Arc::new(Provider::new(&ProviderConfig::from(&args))?);
    let service = ManifestProviderService::new(provider);
    info!("serving on stdio");
    let transport = stdio();
    let server = service.serve(transport).await?;
    server.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::handler::server::wrapper::Parameters;

    fn service() -> ManifestProviderService {
        let provider = Provider::new(&ProviderConfig::default()).unwrap();
        ManifestProviderService::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn test_read_tool_success() {
        let result = service()
            .read_manifest_data_source(Parameters(ReadParams {
                type_name: "k8s_canaries_flanksource_com_canary_v1_manifest".to_string(),
                config: r#"{"metadata":{"name":"example","namespace":"default"}}"#.to_string(),
            }))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_read_tool_error() {
        let result = service()
            .read_manifest_data_source(Parameters(ReadParams {
                type_name: "k8s_canaries_flanksource_com_canary_v1_manifest".to_string(),
                config: r#"{"metadata":{"name":"example"}}"#.to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_schema_tool_unknown_type() {
        let result = service()
            .get_manifest_data_source_schema(Parameters(SchemaParams {
                type_name: "k8s_missing_manifest".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_validate_tool() {
        let result = service()
            .validate_manifest(Parameters(ValidateParams {
                manifest: "apiVersion: canaries.flanksource.com/v1\nkind: Topology\nmetadata:\n  name: t\n  namespace: default\n"
                    .to_string(),
            }))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
    }
}
