//! Resource client for MCP servers using the official rmcp crate
//!
//! The resolver talks to servers through [`ResourceConnector`] so the
//! connect/list/read/close exchange can be driven without a live server.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::{
    model::{ReadResourceRequestParam, ResourceContents},
    service::{RoleClient, RunningService, ServiceExt},
    transport::{
        SseClientTransport, StreamableHttpClientTransport, sse_client::SseClientConfig,
        streamable_http_client::StreamableHttpClientTransportConfig,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use super::error::McpError;
use super::transport::{McpServerDescriptor, McpTransport};

/// An entry returned by `resources/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ResourceBody {
    /// Used verbatim
    Text(String),
    /// Base64 encoded bytes
    Blob(String),
}

/// One item of a `resources/read` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub body: ResourceBody,
}

impl ResourceContent {
    pub fn text(uri: impl Into<String>, mime_type: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.map(String::from),
            body: ResourceBody::Text(text.into()),
        }
    }

    pub fn blob(uri: impl Into<String>, mime_type: Option<&str>, blob: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.map(String::from),
            body: ResourceBody::Blob(blob.into()),
        }
    }
}

impl From<ResourceContents> for ResourceContent {
    fn from(contents: ResourceContents) -> Self {
        match contents {
            ResourceContents::TextResourceContents {
                uri,
                mime_type,
                text,
                ..
            } => Self {
                uri,
                mime_type,
                body: ResourceBody::Text(text),
            },
            ResourceContents::BlobResourceContents {
                uri,
                mime_type,
                blob,
                ..
            } => Self {
                uri,
                mime_type,
                body: ResourceBody::Blob(blob),
            },
        }
    }
}

/// An open connection to a single resource server.
#[async_trait]
pub trait ResourceSession: Send + Sync {
    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError>;

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContent>, McpError>;

    /// Tear the connection down. Called exactly once per session.
    async fn close(self: Box<Self>);
}

/// Opens [`ResourceSession`]s to configured servers.
#[async_trait]
pub trait ResourceConnector: Send + Sync {
    async fn connect(
        &self,
        server: &McpServerDescriptor,
    ) -> Result<Box<dyn ResourceSession>, McpError>;
}

/// Connector backed by rmcp client transports.
#[derive(Debug, Clone, Default)]
pub struct RmcpConnector;

impl RmcpConnector {
    pub fn new() -> Self {
        Self
    }

    fn http_client(
        server_name: &str,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<reqwest::Client, McpError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers.into_iter().flatten() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                McpError::connection_failed(server_name, format!("Invalid header name: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                McpError::connection_failed(server_name, format!("Invalid header value: {e}"))
            })?;
            header_map.insert(name, value);
        }

        reqwest::Client::builder()
            .default_headers(header_map)
            .build()
            .map_err(|e| {
                McpError::connection_failed(server_name, format!("Failed to build client: {e}"))
            })
    }
}

#[async_trait]
impl ResourceConnector for RmcpConnector {
    async fn connect(
        &self,
        server: &McpServerDescriptor,
    ) -> Result<Box<dyn ResourceSession>, McpError> {
        let server_name = server.name.as_str();
        debug!(
            target: "prism::mcp",
            server = server_name,
            transport = %server.transport.kind(),
            location = %server.transport.location(),
            "Connecting to resource server"
        );

        let client: RunningService<RoleClient, ()> = match &server.transport {
            McpTransport::Stdio { .. } => {
                return Err(McpError::UnsupportedTransport {
                    server_name: server_name.to_string(),
                    transport: server.transport.kind().to_string(),
                });
            }
            McpTransport::Tcp { host, port } => {
                let stream = tokio::net::TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|e| McpError::connection_failed(server_name, e.to_string()))?;
                ().serve(stream)
                    .await
                    .map_err(|e| serve_failed(server_name, e))?
            }
            #[cfg(unix)]
            McpTransport::Unix { path } => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|e| McpError::connection_failed(server_name, e.to_string()))?;
                ().serve(stream)
                    .await
                    .map_err(|e| serve_failed(server_name, e))?
            }
            #[cfg(not(unix))]
            McpTransport::Unix { .. } => {
                return Err(McpError::UnsupportedTransport {
                    server_name: server_name.to_string(),
                    transport: server.transport.kind().to_string(),
                });
            }
            McpTransport::Sse { url, headers } => {
                let http = Self::http_client(server_name, headers.as_ref())?;
                let transport = SseClientTransport::start_with_client(
                    http,
                    SseClientConfig {
                        sse_endpoint: url.clone().into(),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| McpError::connection_failed(server_name, e.to_string()))?;
                ().serve(transport)
                    .await
                    .map_err(|e| serve_failed(server_name, e))?
            }
            McpTransport::Http { url, headers } => {
                let http = Self::http_client(server_name, headers.as_ref())?;
                let transport = StreamableHttpClientTransport::with_client(
                    http,
                    StreamableHttpClientTransportConfig::with_uri(url.clone()),
                );
                ().serve(transport)
                    .await
                    .map_err(|e| serve_failed(server_name, e))?
            }
        };

        info!(target: "prism::mcp", server = server_name, "Connected to resource server");

        Ok(Box::new(RmcpSession {
            server_name: server.name.clone(),
            client,
        }))
    }
}

fn serve_failed(server_name: &str, error: impl std::fmt::Display) -> McpError {
    McpError::connection_failed(server_name, format!("Failed to serve MCP: {error}"))
}

struct RmcpSession {
    server_name: String,
    client: RunningService<RoleClient, ()>,
}

#[async_trait]
impl ResourceSession for RmcpSession {
    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError> {
        let resources = self
            .client
            .list_all_resources()
            .await
            .map_err(|e| McpError::list_failed(&self.server_name, e.to_string()))?;

        Ok(resources
            .into_iter()
            .map(|resource| ResourceDescriptor {
                uri: resource.raw.uri,
                name: resource.raw.name,
                mime_type: resource.raw.mime_type,
            })
            .collect())
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContent>, McpError> {
        let result = self
            .client
            .read_resource(ReadResourceRequestParam {
                uri: uri.to_string(),
            })
            .await
            .map_err(|e| McpError::read_failed(&self.server_name, uri, e.to_string()))?;

        Ok(result
            .contents
            .into_iter()
            .map(ResourceContent::from)
            .collect())
    }

    async fn close(self: Box<Self>) {
        let server_name = self.server_name;
        if let Err(e) = self.client.cancel().await {
            debug!(target: "prism::mcp", server = %server_name, error = %e, "Error while closing connection");
        }
    }
}
