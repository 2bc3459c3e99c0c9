pub mod artifact_config;
pub mod error;

pub use artifact_config::{ArtifactConfig, ArtifactConfigLoader, ArtifactOptions};
pub use error::ConfigError;
