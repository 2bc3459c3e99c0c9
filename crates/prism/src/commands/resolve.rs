use async_trait::async_trait;
use eyre::Result;
use prism_core::artifacts::{
    ArtifactPipeline, DisplayUpdate, MessageIdentity, PersistedArtifact, ResourceResolver,
    ToolInvocation,
};
use prism_core::config::ArtifactConfigLoader;
use prism_core::mcp::RmcpConnector;
use prism_core::store::{ArtifactStore, InMemoryArtifactStore};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Command, load_invocations, open_store, write_json};

pub struct ResolveCommand {
    pub payload: PathBuf,
    pub message_id: String,
    pub chat_id: String,
    pub persist: bool,
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
}

#[async_trait]
impl Command for ResolveCommand {
    async fn execute(&self) -> Result<()> {
        let invocations = load_invocations(&self.payload)?;
        let config = ArtifactConfigLoader::new(self.config.clone()).load().await?;

        let store: Arc<dyn ArtifactStore> = if self.persist {
            Arc::new(open_store(self.db.as_ref()).await?)
        } else {
            Arc::new(InMemoryArtifactStore::new())
        };

        let resolver = ResourceResolver::new(Arc::new(RmcpConnector::new()))
            .with_settings(config.resolver_settings());
        let pipeline = ArtifactPipeline::new(Arc::new(resolver), config.servers.clone(), store)
            .with_settings(config.artifact_settings());

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received, abandoning resolution");
                interrupt.cancel();
            }
        });

        let identity = MessageIdentity::new(self.message_id.clone(), self.chat_id.clone());
        let (display, record) = resolve_message(&pipeline, identity, &invocations, &cancel).await?;

        info!(
            message_id = %self.message_id,
            persisted = self.persist,
            "Resolved message artifacts"
        );

        write_json(&json!({
            "display": display,
            "persisted": record,
        }))
    }
}

/// Runs one message through display routing and persistence.
async fn resolve_message(
    pipeline: &ArtifactPipeline,
    identity: MessageIdentity,
    invocations: &[ToolInvocation],
    cancel: &CancellationToken,
) -> prism_core::error::Result<(DisplayUpdate, PersistedArtifact)> {
    let mut coordinator = pipeline.begin(identity, cancel);
    let display = coordinator.on_fragment(invocations).await?.unwrap_or_default();
    let record = coordinator.finalize(invocations).await?;
    Ok((display, record))
}
