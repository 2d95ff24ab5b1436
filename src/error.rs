// Error types shared by the provider, data sources and tools.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The manifest could not be serialized.
    #[error("unable to marshal YAML: {message}")]
    Marshal { message: String },

    /// Configuration did not fit the data source model.
    #[error("unable to decode configuration: {message}")]
    Decode { message: String },

    /// A spec type produced a JSON Schema the attribute converter cannot express.
    #[error("unsupported schema at {path}: {message}")]
    Schema {
        /// Dotted path of the offending property
        path: String,
        message: String,
    },

    #[error("data source {type_name} is not registered")]
    UnknownDataSource { type_name: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn schema(path: &str, message: impl Into<String>) -> Self {
        Error::Schema {
            path: if path.is_empty() { "<root>".to_string() } else { path.to_string() },
            message: message.into(),
        }
    }
}
