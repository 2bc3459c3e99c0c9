use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::ArtifactError;
use super::types::ResolvedArtifact;
use crate::mcp::{McpError, McpServerDescriptor, ResourceConnector, ResourceSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Budget for opening a connection to one server
    pub connect_timeout: Duration,
    /// Budget for the list + read exchange on one server
    pub request_timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
        }
    }
}

enum ServerAttempt {
    Found(ResolvedArtifact),
    Missing,
    Failed(McpError),
    Cancelled,
}

/// Looks up `ui://` resources on an ordered list of candidate servers.
pub struct ResourceResolver {
    connector: Arc<dyn ResourceConnector>,
    settings: ResolverSettings,
}

impl ResourceResolver {
    pub fn new(connector: Arc<dyn ResourceConnector>) -> Self {
        Self {
            connector,
            settings: ResolverSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> ResolverSettings {
        self.settings
    }

    /// Resolves `uri` against `servers` in order; the first server that has it wins.
    ///
    /// Server failures are logged and skipped. `Ok(None)` means no server had the
    /// resource. The only error is [`ArtifactError::Cancelled`].
    #[instrument(skip_all, name = "ResourceResolver::resolve", fields(uri = %uri))]
    pub async fn resolve(
        &self,
        uri: &str,
        servers: &[McpServerDescriptor],
        cancel: &CancellationToken,
    ) -> Result<Option<ResolvedArtifact>, ArtifactError> {
        for server in servers {
            if cancel.is_cancelled() {
                return Err(ArtifactError::Cancelled);
            }

            if !server.is_queryable() {
                debug!(
                    target: "prism::resolver",
                    server = %server.name,
                    transport = %server.transport.kind(),
                    "Skipping server that cannot be queried for resources"
                );
                continue;
            }

            match self.try_server(uri, server, cancel).await {
                ServerAttempt::Found(artifact) => {
                    info!(target: "prism::resolver", server = %server.name, "Resolved artifact");
                    return Ok(Some(artifact));
                }
                ServerAttempt::Missing => {
                    debug!(target: "prism::resolver", server = %server.name, "Resource not listed");
                }
                ServerAttempt::Failed(error) => {
                    warn!(
                        target: "prism::resolver",
                        server = %server.name,
                        error = %error,
                        "Resource server failed, trying next"
                    );
                }
                ServerAttempt::Cancelled => {
                    debug!(target: "prism::resolver", server = %server.name, "Resolution cancelled");
                    return Err(ArtifactError::Cancelled);
                }
            }
        }

        debug!(target: "prism::resolver", "No server provided the resource");
        Ok(None)
    }

    async fn try_server(
        &self,
        uri: &str,
        server: &McpServerDescriptor,
        cancel: &CancellationToken,
    ) -> ServerAttempt {
        let connect = tokio::time::timeout(
            self.settings.connect_timeout,
            self.connector.connect(server),
        );
        let session = tokio::select! {
            biased;
            () = cancel.cancelled() => return ServerAttempt::Cancelled,
            result = connect => match result {
                Ok(Ok(session)) => session,
                Ok(Err(error)) => return ServerAttempt::Failed(error),
                Err(_) => return ServerAttempt::Failed(McpError::timeout(&server.name)),
            },
        };

        let exchange = tokio::time::timeout(
            self.settings.request_timeout,
            Self::fetch(session.as_ref(), uri),
        );
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => ServerAttempt::Cancelled,
            result = exchange => match result {
                Ok(Ok(Some(artifact))) => ServerAttempt::Found(artifact),
                Ok(Ok(None)) => ServerAttempt::Missing,
                Ok(Err(error)) => ServerAttempt::Failed(error),
                Err(_) => ServerAttempt::Failed(McpError::timeout(&server.name)),
            },
        };

        if tokio::time::timeout(self.settings.connect_timeout, session.close())
            .await
            .is_err()
        {
            warn!(target: "prism::resolver", server = %server.name, "Timed out closing connection");
        }

        outcome
    }

    async fn fetch(
        session: &dyn ResourceSession,
        uri: &str,
    ) -> Result<Option<ResolvedArtifact>, McpError> {
        let listed = session.list_resources().await?;
        if !listed.iter().any(|resource| resource.uri == uri) {
            return Ok(None);
        }

        let contents = session.read_resource(uri).await?;
        ResolvedArtifact::from_contents(uri, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{McpTransport, ResourceContent};
    use crate::test_utils::{ScriptedConnector, ScriptedServer};

    fn fast_settings() -> ResolverSettings {
        ResolverSettings {
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(200),
        }
    }

    fn resolver(connector: &Arc<ScriptedConnector>) -> ResourceResolver {
        ResourceResolver::new(connector.clone()).with_settings(fast_settings())
    }

    #[tokio::test]
    async fn test_first_server_with_resource_wins() {
        let connector = Arc::new(
            ScriptedConnector::new()
                .with_server("a", ScriptedServer::new())
                .with_server(
                    "b",
                    ScriptedServer::new().with_text("ui://chart", "text/html", "<b/>"),
                )
                .with_server(
                    "c",
                    ScriptedServer::new().with_text("ui://chart", "text/html", "<c/>"),
                ),
        );
        let servers = connector.descriptors(&["a", "b", "c"]);

        let artifact = resolver(&connector)
            .resolve("ui://chart", &servers, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(artifact.content, "<b/>");
        assert_eq!(connector.connects(), vec!["a", "b"]);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_not_found_when_no_server_has_it() {
        let connector = Arc::new(
            ScriptedConnector::new()
                .with_server("a", ScriptedServer::new().with_text("ui://other", "text/html", "x")),
        );
        let servers = connector.descriptors(&["a"]);

        let result = resolver(&connector)
            .resolve("ui://chart", &servers, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(connector.reads_of("ui://chart"), 0);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_failing_servers_are_skipped() {
        let connector = Arc::new(
            ScriptedConnector::new()
                .with_server("refuses", ScriptedServer::refusing())
                .with_server("broken", ScriptedServer::failing_list())
                .with_server(
                    "bad-blob",
                    ScriptedServer::new().with_blob("ui://chart", None, "%%%"),
                )
                .with_server(
                    "good",
                    ScriptedServer::new().with_blob("ui://chart", Some("image/svg+xml"), "PHN2Zy8+"),
                ),
        );
        let servers = connector.descriptors(&["refuses", "broken", "bad-blob", "good"]);

        let artifact = resolver(&connector)
            .resolve("ui://chart", &servers, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(artifact.content, "<svg/>");
        assert_eq!(artifact.mime_type, "image/svg+xml");
        assert_eq!(
            connector.connects(),
            vec!["refuses", "broken", "bad-blob", "good"]
        );
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_treated_as_not_found() {
        let connector = Arc::new(
            ScriptedConnector::new().with_server(
                "slow",
                ScriptedServer::hanging().with_text("ui://chart", "text/html", "<svg/>"),
            ),
        );
        let servers = connector.descriptors(&["slow"]);

        let result = resolver(&connector)
            .resolve("ui://chart", &servers, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_non_queryable_servers_are_skipped() {
        let connector = Arc::new(
            ScriptedConnector::new()
                .with_server("b", ScriptedServer::new().with_text("ui://chart", "text/html", "<b/>")),
        );
        let mut servers = vec![McpServerDescriptor::new(
            "local",
            McpTransport::Stdio {
                command: "viz-server".to_string(),
                args: vec![],
            },
        )];
        servers.extend(connector.descriptors(&["b"]));

        let artifact = resolver(&connector)
            .resolve("ui://chart", &servers, &CancellationToken::new())
            .await
            .unwrap();

        assert!(artifact.is_some());
        assert_eq!(connector.connects(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_cancellation_stops_resolution_and_closes_connection() {
        let connector = Arc::new(
            ScriptedConnector::new()
                .with_server(
                    "slow",
                    ScriptedServer::new()
                        .with_text("ui://chart", "text/html", "<svg/>")
                        .with_delay(Duration::from_secs(5)),
                )
                .with_server("next", ScriptedServer::new().with_text("ui://chart", "text/html", "x")),
        );
        let servers = connector.descriptors(&["slow", "next"]);
        let resolver = ResourceResolver::new(connector.clone());
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = resolver.resolve("ui://chart", &servers, &cancel).await;

        assert!(matches!(result, Err(ArtifactError::Cancelled)));
        assert_eq!(connector.connects(), vec!["slow"]);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_contacts_nobody() {
        let connector = Arc::new(
            ScriptedConnector::new()
                .with_server("a", ScriptedServer::new().with_text("ui://chart", "text/html", "x")),
        );
        let servers = connector.descriptors(&["a"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = resolver(&connector).resolve("ui://chart", &servers, &cancel).await;

        assert!(matches!(result, Err(ArtifactError::Cancelled)));
        assert!(connector.connects().is_empty());
    }

    #[tokio::test]
    async fn test_read_picks_content_for_requested_uri() {
        let connector = Arc::new(ScriptedConnector::new().with_server(
            "a",
            ScriptedServer::new().with_contents(
                "ui://chart",
                vec![
                    ResourceContent::text("ui://chart#thumb", Some("text/plain"), "thumb"),
                    ResourceContent::text("ui://chart", Some("text/html"), "<full/>"),
                ],
            ),
        ));
        let servers = connector.descriptors(&["a"]);

        let artifact = resolver(&connector)
            .resolve("ui://chart", &servers, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(artifact.content, "<full/>");
    }
}
