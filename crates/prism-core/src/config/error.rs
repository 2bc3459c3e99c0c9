use std::path::PathBuf;
use thiserror::Error;

/// Artifact configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MCP server name cannot be empty")]
    EmptyServerName,

    #[error("MCP server name '{name}' is used more than once")]
    DuplicateServerName { name: String },

    #[error("MCP server '{server}': stdio transport command cannot be empty")]
    EmptyStdioCommand { server: String },

    #[error("MCP server '{server}': TCP transport host cannot be empty")]
    EmptyTcpHost { server: String },

    #[error("MCP server '{server}': TCP transport port cannot be 0")]
    InvalidTcpPort { server: String },

    #[error("MCP server '{server}': Unix transport path cannot be empty")]
    EmptyUnixPath { server: String },

    #[error("MCP server '{server}': transport url cannot be empty")]
    EmptyUrl { server: String },

    #[error("MCP server '{server}': invalid url '{url}': {message}")]
    InvalidUrl {
        server: String,
        url: String,
        message: String,
    },

    #[error("live_uri cannot be empty")]
    EmptyLiveUri,

    #[error("live_uri '{uri}' must use the ui:// scheme")]
    InvalidLiveUri { uri: String },

    #[error("{field} must be greater than 0")]
    InvalidTimeout { field: &'static str },

    #[error("max_concurrent_resolutions must be greater than 0")]
    InvalidConcurrency,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
