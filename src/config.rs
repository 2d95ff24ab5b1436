// Command line and environment configuration.

use clap::Parser;

pub const DEFAULT_PROVIDER_NAME: &str = "k8s";
pub const DEFAULT_LOG_FILTER: &str = "k8s_manifest_provider=info";

#[derive(Debug, Clone, Parser)]
#[command(name = "k8s-manifest-provider", version, about = "Manifest data sources for Kubernetes CRDs over MCP stdio")]
pub struct Args {
    /// Provider type name used as the prefix of every data source type name
    #[arg(long, env = "K8S_MANIFEST_PROVIDER_NAME", default_value = DEFAULT_PROVIDER_NAME)]
    pub provider_name: String,

    /// Log filter directive; RUST_LOG takes precedence when set
    #[arg(long, env = "K8S_MANIFEST_PROVIDER_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
}

/// Settings the provider is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub type_name: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            type_name: DEFAULT_PROVIDER_NAME.to_string(),
        }
    }
}

impl From<&Args> for ProviderConfig {
    fn from(args: &Args) -> Self {
        Self {
            type_name: args.provider_name.clone(),
        }
    }
}
