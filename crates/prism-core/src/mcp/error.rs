use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum McpError {
    #[error("Cannot connect to {server_name}: {message}")]
    ConnectionFailed {
        server_name: String,
        message: String,
    },

    #[error("Transport '{transport}' of {server_name} cannot be queried for resources")]
    UnsupportedTransport {
        server_name: String,
        transport: String,
    },

    #[error("Failed to list resources from {server_name}: {message}")]
    ListResourcesFailed {
        server_name: String,
        message: String,
    },

    #[error("Failed to read {uri} from {server_name}: {message}")]
    ReadResourceFailed {
        server_name: String,
        uri: String,
        message: String,
    },

    #[error("Invalid content for {uri}: {message}")]
    InvalidContent { uri: String, message: String },

    #[error("Timeout talking to {server_name}")]
    Timeout { server_name: String },
}

impl McpError {
    pub fn connection_failed(server_name: &str, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            server_name: server_name.to_string(),
            message: message.into(),
        }
    }

    pub fn list_failed(server_name: &str, message: impl Into<String>) -> Self {
        Self::ListResourcesFailed {
            server_name: server_name.to_string(),
            message: message.into(),
        }
    }

    pub fn read_failed(server_name: &str, uri: &str, message: impl Into<String>) -> Self {
        Self::ReadResourceFailed {
            server_name: server_name.to_string(),
            uri: uri.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_content(uri: &str, message: impl Into<String>) -> Self {
        Self::InvalidContent {
            uri: uri.to_string(),
            message: message.into(),
        }
    }

    pub fn timeout(server_name: &str) -> Self {
        Self::Timeout {
            server_name: server_name.to_string(),
        }
    }
}
