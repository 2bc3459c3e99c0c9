//! Test utilities for prism-core
//!
//! This module provides helpers for testing that need to be accessible
//! across crate boundaries: a scripted connector that records every
//! connect/read/close, and a real rmcp resource server.

use async_trait::async_trait;
use rmcp::{
    ErrorData, RoleServer, ServerHandler, ServiceExt,
    model::{
        ListResourcesResult, PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult,
        ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::mcp::{
    McpError, McpServerDescriptor, McpTransport, ResourceConnector, ResourceContent,
    ResourceDescriptor, ResourceSession,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Behavior {
    #[default]
    Serve,
    Refuse,
    FailList,
    Hang,
}

/// Canned behaviour of one fake resource server.
#[derive(Debug, Clone, Default)]
pub struct ScriptedServer {
    resources: Vec<(String, Vec<ResourceContent>)>,
    behavior: Behavior,
    delay: Option<Duration>,
    read_delays: HashMap<String, Duration>,
}

impl ScriptedServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection attempts fail.
    pub fn refusing() -> Self {
        Self {
            behavior: Behavior::Refuse,
            ..Self::default()
        }
    }

    /// Connects, but listing resources returns a protocol error.
    pub fn failing_list() -> Self {
        Self {
            behavior: Behavior::FailList,
            ..Self::default()
        }
    }

    /// Connects, but listing resources never answers.
    pub fn hanging() -> Self {
        Self {
            behavior: Behavior::Hang,
            ..Self::default()
        }
    }

    pub fn with_text(self, uri: &str, mime_type: &str, text: &str) -> Self {
        self.with_contents(uri, vec![ResourceContent::text(uri, Some(mime_type), text)])
    }

    pub fn with_blob(self, uri: &str, mime_type: Option<&str>, blob: &str) -> Self {
        self.with_contents(uri, vec![ResourceContent::blob(uri, mime_type, blob)])
    }

    pub fn with_contents(mut self, uri: &str, contents: Vec<ResourceContent>) -> Self {
        self.resources.push((uri.to_string(), contents));
        self
    }

    /// Delay applied before every list and read answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Extra delay before answering reads of `uri` only.
    pub fn with_read_delay(mut self, uri: &str, delay: Duration) -> Self {
        self.read_delays.insert(uri.to_string(), delay);
        self
    }
}

#[derive(Debug, Default)]
struct ConnectorLog {
    connects: Vec<String>,
    reads: Vec<(String, String)>,
    answered: Vec<String>,
    opened: usize,
    closed: usize,
}

/// In-process [`ResourceConnector`] that records everything it is asked to do.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    servers: HashMap<String, ScriptedServer>,
    log: Arc<Mutex<ConnectorLog>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, name: &str, server: ScriptedServer) -> Self {
        self.servers.insert(name.to_string(), server);
        self
    }

    /// Descriptors for the named servers, in the given order.
    pub fn descriptors(&self, names: &[&str]) -> Vec<McpServerDescriptor> {
        names
            .iter()
            .map(|name| {
                McpServerDescriptor::new(
                    *name,
                    McpTransport::Http {
                        url: format!("http://scripted.invalid/{name}"),
                        headers: None,
                    },
                )
            })
            .collect()
    }

    /// Server names in the order they were contacted.
    pub fn connects(&self) -> Vec<String> {
        self.with_log(|log| log.connects.clone())
    }

    /// How many read requests were issued for `uri`, across all servers.
    pub fn reads_of(&self, uri: &str) -> usize {
        self.with_log(|log| log.reads.iter().filter(|(_, read)| read == uri).count())
    }

    /// URIs in the order their reads were answered.
    pub fn answered_reads(&self) -> Vec<String> {
        self.with_log(|log| log.answered.clone())
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.with_log(|log| log.opened.saturating_sub(log.closed))
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut ConnectorLog) -> T) -> T {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut log)
    }
}

#[async_trait]
impl ResourceConnector for ScriptedConnector {
    async fn connect(
        &self,
        server: &McpServerDescriptor,
    ) -> Result<Box<dyn ResourceSession>, McpError> {
        self.with_log(|log| log.connects.push(server.name.clone()));

        let scripted = self
            .servers
            .get(&server.name)
            .ok_or_else(|| McpError::connection_failed(&server.name, "unknown server"))?;
        if scripted.behavior == Behavior::Refuse {
            return Err(McpError::connection_failed(&server.name, "connection refused"));
        }

        self.with_log(|log| log.opened += 1);
        Ok(Box::new(ScriptedSession {
            name: server.name.clone(),
            server: scripted.clone(),
            log: self.log.clone(),
        }))
    }
}

struct ScriptedSession {
    name: String,
    server: ScriptedServer,
    log: Arc<Mutex<ConnectorLog>>,
}

impl ScriptedSession {
    async fn pause(&self) {
        if let Some(delay) = self.server.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ResourceSession for ScriptedSession {
    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError> {
        self.pause().await;
        match self.server.behavior {
            Behavior::FailList => Err(McpError::list_failed(&self.name, "internal error")),
            Behavior::Hang => std::future::pending().await,
            Behavior::Serve | Behavior::Refuse => Ok(self
                .server
                .resources
                .iter()
                .map(|(uri, _)| ResourceDescriptor {
                    uri: uri.clone(),
                    name: uri.clone(),
                    mime_type: None,
                })
                .collect()),
        }
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContent>, McpError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reads
            .push((self.name.clone(), uri.to_string()));
        self.pause().await;
        if let Some(delay) = self.server.read_delays.get(uri) {
            tokio::time::sleep(*delay).await;
        }

        let contents = self
            .server
            .resources
            .iter()
            .find(|(listed, _)| listed == uri)
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| McpError::read_failed(&self.name, uri, "resource not found"))?;
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .answered
            .push(uri.to_string());
        Ok(contents)
    }

    async fn close(self: Box<Self>) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed += 1;
    }
}

#[derive(Debug, Clone)]
struct TestResource {
    uri: String,
    mime_type: String,
    text: String,
}

/// A real MCP server exposing fixed text resources.
#[derive(Debug, Clone, Default)]
pub struct TestResourceServer {
    resources: Arc<Vec<TestResource>>,
    reads: Arc<AtomicUsize>,
}

impl TestResourceServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, uri: &str, mime_type: &str, text: &str) -> Self {
        let mut resources = self.resources.as_ref().clone();
        resources.push(TestResource {
            uri: uri.to_string(),
            mime_type: mime_type.to_string(),
            text: text.to_string(),
        });
        self.resources = Arc::new(resources);
        self
    }

    /// Number of `resources/read` requests served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ErrorData> {
    serde_json::from_value(value).map_err(|e| ErrorData::internal_error(e.to_string(), None))
}

impl ServerHandler for TestResourceServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_resources().build(),
            instructions: None,
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let resources: Vec<_> = self
            .resources
            .iter()
            .map(|r| json!({"uri": r.uri, "name": r.uri, "mimeType": r.mime_type}))
            .collect();
        from_json(json!({ "resources": resources }))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let resource = self
            .resources
            .iter()
            .find(|r| r.uri == request.uri)
            .ok_or_else(|| {
                ErrorData::resource_not_found("resource_not_found", Some(json!({"uri": request.uri})))
            })?;

        from_json(json!({
            "contents": [{
                "uri": resource.uri,
                "mimeType": resource.mime_type,
                "text": resource.text,
            }]
        }))
    }
}

/// Serves `server` on an ephemeral TCP port. Returns the port and the accept loop.
pub async fn serve_tcp(server: TestResourceServer) -> std::io::Result<(u16, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    let task = tokio::spawn(async move {
        while let Ok((stream, addr)) = listener.accept().await {
            debug!("Accepted connection from {}", addr);
            let service = server.clone();
            tokio::spawn(async move {
                if let Ok(running) = service.serve(stream).await {
                    let _ = running.waiting().await;
                }
            });
        }
    });

    Ok((port, task))
}
