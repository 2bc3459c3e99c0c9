//! End-to-end resolution against real MCP resource servers.

use prism_core::artifacts::{
    ArtifactPipeline, DEFAULT_DELIMITER, MessageIdentity, ResourceResolver, ToolInvocation,
};
use prism_core::mcp::{McpServerDescriptor, McpTransport, RmcpConnector};
use prism_core::store::{ArtifactStore, SqliteArtifactStore};
use prism_core::test_utils::{TestResourceServer, serve_tcp};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn tcp_server(name: &str, port: u16) -> McpServerDescriptor {
    McpServerDescriptor::new(
        name,
        McpTransport::Tcp {
            host: "127.0.0.1".to_string(),
            port,
        },
    )
}

async fn serve_http(server: TestResourceServer) -> String {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}/mcp")
}

#[tokio::test]
async fn test_tcp_resolution_skips_servers_without_the_resource() {
    let empty = TestResourceServer::new().with_resource("ui://other", "text/html", "<other/>");
    let holder = TestResourceServer::new().with_resource("ui://chart", "image/svg+xml", "<svg/>");
    let (empty_port, _empty_task) = serve_tcp(empty.clone()).await.unwrap();
    let (holder_port, _holder_task) = serve_tcp(holder.clone()).await.unwrap();

    let resolver = ResourceResolver::new(Arc::new(RmcpConnector::new()));
    let servers = vec![
        tcp_server("empty", empty_port),
        tcp_server("holder", holder_port),
    ];

    let artifact = resolver
        .resolve("ui://chart", &servers, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(artifact.content, "<svg/>");
    assert_eq!(artifact.mime_type, "image/svg+xml");
    assert_eq!(empty.read_count(), 0);
    assert_eq!(holder.read_count(), 1);
}

#[tokio::test]
async fn test_unreachable_server_does_not_stop_resolution() {
    let holder = TestResourceServer::new().with_resource("ui://chart", "text/html", "<div/>");
    let (port, _task) = serve_tcp(holder).await.unwrap();

    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_port = unused.local_addr().unwrap().port();
    drop(unused);

    let resolver = ResourceResolver::new(Arc::new(RmcpConnector::new()));
    let servers = vec![tcp_server("dead", dead_port), tcp_server("alive", port)];

    let artifact = resolver
        .resolve("ui://chart", &servers, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(artifact.map(|a| a.content), Some("<div/>".to_string()));
}

#[tokio::test]
async fn test_pipeline_over_streamable_http_resolves_once_and_persists() {
    let server = TestResourceServer::new()
        .with_resource("ui://graph-visualization", "text/html", "<div>graph</div>")
        .with_resource("ui://chart-1", "image/svg+xml", "<svg/>");
    let url = serve_http(server.clone()).await;

    let store = Arc::new(SqliteArtifactStore::new_in_memory().await.unwrap());
    let pipeline = ArtifactPipeline::new(
        Arc::new(ResourceResolver::new(Arc::new(RmcpConnector::new()))),
        vec![McpServerDescriptor::new(
            "viz",
            McpTransport::Http { url, headers: None },
        )],
        store.clone(),
    );
    let mut coordinator =
        pipeline.begin(MessageIdentity::new("m1", "c1"), &CancellationToken::new());

    let streaming = [ToolInvocation::new(
        "t1",
        "graph",
        json!({"content": [{"type": "resource", "resource": {"uri": "ui://graph-visualization"}}]}),
    )];
    let update = coordinator.on_fragment(&streaming).await.unwrap().unwrap();
    assert_eq!(update.live.unwrap().content, "<div>graph</div>");
    assert!(update.inline_artifacts.is_empty());

    let complete = [
        streaming[0].clone(),
        ToolInvocation::new(
            "t2",
            "chart",
            json!({"content": [{
                "type": "text",
                "text": "{\"type\":\"resource\",\"uri\":\"ui://chart-1\"}"
            }]}),
        ),
    ];
    let record = coordinator.finalize(&complete).await.unwrap();

    assert_eq!(
        record.segments(DEFAULT_DELIMITER),
        vec!["<div>graph</div>", "<svg/>"]
    );
    assert_eq!(server.read_count(), 2);
    assert_eq!(store.load("m1").await.unwrap(), Some(record));
}

#[tokio::test]
async fn test_nothing_resolved_leaves_content_absent() {
    let server = TestResourceServer::new();
    let (port, _task) = serve_tcp(server).await.unwrap();

    let store = Arc::new(SqliteArtifactStore::new_in_memory().await.unwrap());
    let pipeline = ArtifactPipeline::new(
        Arc::new(ResourceResolver::new(Arc::new(RmcpConnector::new()))),
        vec![tcp_server("viz", port)],
        store.clone(),
    );
    let mut coordinator =
        pipeline.begin(MessageIdentity::new("m1", "c1"), &CancellationToken::new());

    let record = coordinator
        .finalize(&[ToolInvocation::new(
            "t1",
            "chart",
            json!({"type": "resource", "uri": "ui://missing"}),
        )])
        .await
        .unwrap();

    assert_eq!(record.html_content, None);
    let stored = store.load("m1").await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(stored).unwrap(),
        json!({"messageId": "m1", "chatId": "c1"})
    );
}
