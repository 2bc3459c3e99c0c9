use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use super::error::ConfigError;
use crate::artifacts::{
    ArtifactSettings, DEFAULT_DELIMITER, DEFAULT_LIVE_URI, DEFAULT_MAX_CONCURRENT_RESOLUTIONS,
    ResolverSettings, is_ui_uri,
};
use crate::mcp::{McpServerDescriptor, McpTransport};
use crate::utils::paths::AppPaths;

/// Contents of an `artifacts.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactConfig {
    #[serde(default)]
    pub artifacts: ArtifactOptions,
    /// Candidate resource servers, in lookup order
    #[serde(default)]
    pub servers: Vec<McpServerDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactOptions {
    pub live_uri: String,
    pub delimiter: String,
    pub persist_live: bool,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_concurrent_resolutions: usize,
}

impl Default for ArtifactOptions {
    fn default() -> Self {
        Self {
            live_uri: DEFAULT_LIVE_URI.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            persist_live: true,
            connect_timeout_secs: 10,
            request_timeout_secs: 10,
            max_concurrent_resolutions: DEFAULT_MAX_CONCURRENT_RESOLUTIONS,
        }
    }
}

impl ArtifactConfig {
    /// Parses and validates TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let options = &self.artifacts;
        if options.live_uri.trim().is_empty() {
            return Err(ConfigError::EmptyLiveUri);
        }
        if !is_ui_uri(&options.live_uri) {
            return Err(ConfigError::InvalidLiveUri {
                uri: options.live_uri.clone(),
            });
        }
        if options.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "connect_timeout_secs",
            });
        }
        if options.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "request_timeout_secs",
            });
        }
        if options.max_concurrent_resolutions == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }

        let mut names = HashSet::new();
        for server in &self.servers {
            validate_server(server)?;
            if !names.insert(server.name.as_str()) {
                return Err(ConfigError::DuplicateServerName {
                    name: server.name.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            connect_timeout: Duration::from_secs(self.artifacts.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.artifacts.request_timeout_secs),
        }
    }

    pub fn artifact_settings(&self) -> ArtifactSettings {
        ArtifactSettings {
            live_uri: self.artifacts.live_uri.clone(),
            delimiter: self.artifacts.delimiter.clone(),
            persist_live: self.artifacts.persist_live,
            max_concurrent_resolutions: self.artifacts.max_concurrent_resolutions,
        }
    }
}

fn validate_server(server: &McpServerDescriptor) -> Result<(), ConfigError> {
    if server.name.trim().is_empty() {
        return Err(ConfigError::EmptyServerName);
    }

    let name = || server.name.clone();
    match &server.transport {
        McpTransport::Stdio { command, .. } => {
            if command.trim().is_empty() {
                return Err(ConfigError::EmptyStdioCommand { server: name() });
            }
        }
        McpTransport::Tcp { host, port } => {
            if host.trim().is_empty() {
                return Err(ConfigError::EmptyTcpHost { server: name() });
            }
            if *port == 0 {
                return Err(ConfigError::InvalidTcpPort { server: name() });
            }
        }
        McpTransport::Unix { path } => {
            if path.trim().is_empty() {
                return Err(ConfigError::EmptyUnixPath { server: name() });
            }
        }
        McpTransport::Sse { url, .. } | McpTransport::Http { url, .. } => {
            if url.trim().is_empty() {
                return Err(ConfigError::EmptyUrl { server: name() });
            }
            url::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
                server: name(),
                url: url.clone(),
                message: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Finds and loads the artifact configuration.
///
/// An explicit path must exist. Otherwise the first existing file from
/// [`AppPaths::discover_artifact_configs`] is used, and defaults apply when
/// there is none.
pub struct ArtifactConfigLoader {
    config_path: Option<PathBuf>,
}

impl ArtifactConfigLoader {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        debug!("Loading artifact config from: {:?}", config_path);
        Self { config_path }
    }

    pub async fn load(&self) -> Result<ArtifactConfig, ConfigError> {
        let path = match &self.config_path {
            Some(path) => Some(path.clone()),
            None => AppPaths::discover_artifact_configs().into_iter().next(),
        };

        let Some(path) = path else {
            debug!("No artifact config found, using defaults");
            return Ok(ArtifactConfig::default());
        };

        let content = fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
        let config = ArtifactConfig::from_toml_str(&content)?;
        debug!(
            path = %path.display(),
            servers = config.servers.len(),
            "Loaded artifact config"
        );
        Ok(config)
    }
}
