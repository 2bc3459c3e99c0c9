mod client;
mod error;
mod transport;

pub use client::{
    ResourceBody, ResourceConnector, ResourceContent, ResourceDescriptor, ResourceSession,
    RmcpConnector,
};
pub use error::McpError;
pub use transport::{McpServerDescriptor, McpTransport, TransportKind};
