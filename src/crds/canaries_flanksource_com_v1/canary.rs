//! # Canary
//!
//! `canaries.flanksource.com/v1` `Canary`: a set of health checks run on a schedule.

use super::common::{CheckMeta, Connection, EnvVar, ResourceSelector, Templatable};
use crate::datasource::ManifestSpec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CanarySpec defines the desired state of Canary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanarySpec {
    /// Interval in seconds between check runs. Ignored when a schedule is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Schedule to run checks on. Supports all cron expressions, e.g. `@every 30s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// Owner of the canary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Severity of failures: critical, high, medium, low or info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Icon used on the dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// How results are reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_mode: Option<ResultMode>,
    /// Number of canary replicas; 0 pauses the canary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
    /// Variables available to every check's templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, EnvVar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<Vec<HttpCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<Vec<DnsCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<Vec<TcpCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp: Option<Vec<IcmpCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres: Option<Vec<SqlCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql: Option<Vec<SqlCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mssql: Option<Vec<SqlCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<Vec<RedisCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mongodb: Option<Vec<MongoDbCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldap: Option<Vec<LdapCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<Vec<S3Check>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<Vec<PrometheusCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alertmanager: Option<Vec<AlertManagerCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<Vec<DockerPullCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<Vec<KubernetesCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<Vec<ExecCheck>>,
}

impl ManifestSpec for CanarySpec {
    const GROUP: &'static str = "canaries.flanksource.com";
    const VERSION: &'static str = "v1";
    const KIND: &'static str = "Canary";
    const DESCRIPTION: &'static str = "Canary is the Schema for the canaries API";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    Junit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    #[serde(flatten)]
    pub templatable: Templatable,
    #[serde(flatten)]
    pub connection: Connection,
    /// Deprecated: use url instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Number of milliseconds after which the check is marked unhealthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_millis: Option<i64>,
    /// Expected response codes; any 2xx passes when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_codes: Option<Vec<i64>>,
    /// Exact response content expected to be found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_content: Option<String>,
    /// Maximum number of days until the SSL certificate expires.
    #[serde(default, rename = "maxSSLExpiry", skip_serializing_if = "Option::is_none")]
    pub max_ssl_expiry: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// Authenticate with NTLM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntlm: Option<bool>,
    /// Authenticate with NTLM v2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntlmv2: Option<bool>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Request headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<EnvVar>>,
    /// Render the body as a template before sending it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_body: Option<bool>,
    /// Variables available when templating the body and URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2: Option<OAuth2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<String>>,
    #[serde(default, rename = "tokenURL", skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    /// Extra parameters sent with the token request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// Skip verification of the server certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_skip_verify: Option<bool>,
    /// Handshake timeout, e.g. `10s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handshake_timeout: Option<String>,
    /// PEM encoded certificate of the CA that signed the server certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<EnvVar>,
    /// PEM encoded client certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<EnvVar>,
    /// PEM encoded client private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    /// DNS server to query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Name to resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Record type, e.g. A, AAAA, CNAME, MX, TXT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub querytype: Option<String>,
    /// Minimum number of records expected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minrecords: Option<i64>,
    /// Records the answer must match exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exactreply: Option<Vec<String>>,
    /// Query timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_millis: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TcpCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    /// host:port to connect to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_millis: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IcmpCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    /// Host to ping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_millis: Option<i64>,
    /// Percentage of lost packets above which the check fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_loss_threshold: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_count: Option<i64>,
}

/// Runs a query against Postgres, MySQL or SQL Server.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SqlCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    #[serde(flatten)]
    pub templatable: Templatable,
    #[serde(flatten)]
    pub connection: Connection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Number of rows expected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedisCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    #[serde(flatten)]
    pub connection: Connection,
    /// Deprecated: use url instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MongoDbCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    #[serde(flatten)]
    pub connection: Connection,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LdapCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    #[serde(flatten)]
    pub connection: Connection,
    #[serde(default, rename = "bindDN", skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,
    /// Search filter used to find users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_search: Option<String>,
    #[serde(default, rename = "skipTLSVerify", skip_serializing_if = "Option::is_none")]
    pub skip_tls_verify: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct S3Check {
    #[serde(flatten)]
    pub meta: CheckMeta,
    pub bucket_name: String,
    /// Object to read from the bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, rename = "skipTLSVerify", skip_serializing_if = "Option::is_none")]
    pub skip_tls_verify: Option<bool>,
    /// Use path style bucket addressing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_path_style: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    #[serde(flatten)]
    pub templatable: Templatable,
    #[serde(flatten)]
    pub connection: Connection,
    /// PromQL query.
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertManagerCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    #[serde(flatten)]
    pub templatable: Templatable,
    #[serde(flatten)]
    pub connection: Connection,
    /// Alert names to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<String>>,
    /// Label filters applied to alerts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<BTreeMap<String, String>>,
    /// Alert names to ignore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DockerPullCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    /// Image to pull.
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Authentication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_digest: Option<String>,
    /// Expected image size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    #[serde(flatten)]
    pub templatable: Templatable,
    /// Kind of the objects to check, e.g. Pod.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<ResourceSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceSelector>,
    /// Fail the check if any matching object is not ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
    /// Fail the check if any matching object is not healthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy: Option<bool>,
    /// Object names to ignore; supports wildcards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecCheck {
    #[serde(flatten)]
    pub meta: CheckMeta,
    #[serde(flatten)]
    pub templatable: Templatable,
    /// Script to run: bash, powershell or any shebang-started script.
    pub script: String,
    /// Variables exported into the script's environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout: Option<GitCheckout>,
}

/// Git repository cloned before the script runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitCheckout {
    #[serde(flatten)]
    pub connection: Connection,
    /// SSH private key used to clone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<EnvVar>,
    /// Directory to clone into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}
