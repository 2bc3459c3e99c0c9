use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How to reach an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpTransport {
    /// Spawn a child process and speak MCP over its stdio
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    Tcp {
        host: String,
        port: u16,
    },
    Unix {
        path: String,
    },
    Sse {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<HashMap<String, String>>,
    },
    /// Streamable HTTP
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<HashMap<String, String>>,
    },
}

impl McpTransport {
    pub fn kind(&self) -> TransportKind {
        match self {
            McpTransport::Stdio { .. } => TransportKind::Stdio,
            McpTransport::Tcp { .. } => TransportKind::Tcp,
            McpTransport::Unix { .. } => TransportKind::Unix,
            McpTransport::Sse { .. } => TransportKind::Sse,
            McpTransport::Http { .. } => TransportKind::Http,
        }
    }

    /// Returns a short location string for logs.
    pub fn location(&self) -> String {
        match self {
            McpTransport::Stdio { command, args } => {
                if args.is_empty() {
                    command.clone()
                } else {
                    format!("{} {}", command, args.join(" "))
                }
            }
            McpTransport::Tcp { host, port } => format!("{host}:{port}"),
            McpTransport::Unix { path } => path.clone(),
            McpTransport::Sse { url, .. } | McpTransport::Http { url, .. } => url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Stdio,
    Tcp,
    Unix,
    Sse,
    Http,
}

impl TransportKind {
    /// Whether servers on this transport take part in artifact resolution.
    ///
    /// Stdio servers are owned by whoever spawned them; resolving a resource must
    /// never start a process of its own.
    pub fn is_queryable(self) -> bool {
        !matches!(self, TransportKind::Stdio)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Tcp => "tcp",
            TransportKind::Unix => "unix",
            TransportKind::Sse => "sse",
            TransportKind::Http => "http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate resource server supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerDescriptor {
    pub name: String,
    pub transport: McpTransport,
}

impl McpServerDescriptor {
    pub fn new(name: impl Into<String>, transport: McpTransport) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }

    pub fn is_queryable(&self) -> bool {
        self.transport.kind().is_queryable()
    }
}
