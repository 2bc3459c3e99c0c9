use futures::{StreamExt, stream};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::cache::ArtifactCache;
use super::error::ArtifactError;
use super::reference::ResourceReference;
use super::resolver::ResourceResolver;
use super::scanner::scan_all;
use super::types::{
    DisplayUpdate, MessageArtifactSet, MessageIdentity, PersistedArtifact, ResolvedArtifact,
    ToolInvocation,
};
use crate::mcp::McpServerDescriptor;
use crate::store::ArtifactStore;

pub const DEFAULT_LIVE_URI: &str = "ui://graph-visualization";
pub const DEFAULT_DELIMITER: &str = "\n<!-- prism:artifact -->\n";
pub const DEFAULT_MAX_CONCURRENT_RESOLUTIONS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSettings {
    /// URI routed to the live slot instead of inline
    pub live_uri: String,
    /// Separator between artifacts in a persisted blob
    pub delimiter: String,
    /// Whether the live artifact is written to the blob too
    pub persist_live: bool,
    pub max_concurrent_resolutions: usize,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            live_uri: DEFAULT_LIVE_URI.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            persist_live: true,
            max_concurrent_resolutions: DEFAULT_MAX_CONCURRENT_RESOLUTIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Scanning,
    Resolving,
    Routed,
    Persisting,
    Done,
    Cancelled,
}

/// Long-lived wiring shared by every message: resolver, candidate servers and
/// the persistence gateway. Hands out one [`ArtifactCoordinator`] per message.
#[derive(Clone)]
pub struct ArtifactPipeline {
    resolver: Arc<ResourceResolver>,
    servers: Arc<[McpServerDescriptor]>,
    store: Arc<dyn ArtifactStore>,
    settings: ArtifactSettings,
}

impl ArtifactPipeline {
    pub fn new(
        resolver: Arc<ResourceResolver>,
        servers: Vec<McpServerDescriptor>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            resolver,
            servers: servers.into(),
            store,
            settings: ArtifactSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ArtifactSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ArtifactSettings {
        &self.settings
    }

    pub fn servers(&self) -> &[McpServerDescriptor] {
        &self.servers
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Starts processing a message. `cancel` is the chat request's token;
    /// cancelling it abandons the message.
    pub fn begin(&self, identity: MessageIdentity, cancel: &CancellationToken) -> ArtifactCoordinator {
        debug!(
            target: "prism::coordinator",
            message_id = %identity.message_id,
            chat_id = %identity.chat_id,
            "Starting artifact processing"
        );
        ArtifactCoordinator {
            identity,
            resolver: self.resolver.clone(),
            servers: self.servers.clone(),
            store: self.store.clone(),
            settings: self.settings.clone(),
            cache: ArtifactCache::new(),
            cancel: cancel.child_token(),
            state: CoordinatorState::Scanning,
            last_scan: None,
        }
    }
}

/// Drives scanning, resolution, routing and persistence for one message.
///
/// Owns the message's [`ArtifactCache`], so a URI is resolved at most once no
/// matter how many fragments mention it.
pub struct ArtifactCoordinator {
    identity: MessageIdentity,
    resolver: Arc<ResourceResolver>,
    servers: Arc<[McpServerDescriptor]>,
    store: Arc<dyn ArtifactStore>,
    settings: ArtifactSettings,
    cache: ArtifactCache,
    cancel: CancellationToken,
    state: CoordinatorState,
    last_scan: Option<Vec<String>>,
}

impl ArtifactCoordinator {
    pub fn identity(&self) -> &MessageIdentity {
        &self.identity
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Abandons the message. Nothing further is routed or persisted.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.state = CoordinatorState::Cancelled;
    }

    /// Processes the tool invocations seen so far while the response streams.
    ///
    /// Returns `None` when the set of referenced URIs did not change since the
    /// previous call.
    #[instrument(
        skip_all,
        name = "ArtifactCoordinator::on_fragment",
        fields(message_id = %self.identity.message_id)
    )]
    pub async fn on_fragment(
        &mut self,
        invocations: &[ToolInvocation],
    ) -> Result<Option<DisplayUpdate>, ArtifactError> {
        self.ensure_open()?;

        let previous = self.state;
        self.state = CoordinatorState::Scanning;
        let references = scan_invocations(invocations);

        let mut uris: Vec<String> = references.iter().map(|r| r.uri.clone()).collect();
        uris.sort();
        if self.last_scan.as_ref() == Some(&uris) {
            debug!(target: "prism::coordinator", "Reference set unchanged");
            self.state = previous;
            return Ok(None);
        }
        self.last_scan = Some(uris);

        self.state = CoordinatorState::Resolving;
        let artifacts = self.resolve_all(&references).await?;
        let set = MessageArtifactSet::new(&self.identity, &self.settings.live_uri, artifacts);

        self.state = CoordinatorState::Routed;
        let update = set.into_display();
        info!(
            target: "prism::coordinator",
            references = references.len(),
            live = update.live.is_some(),
            inline = update.inline_artifacts.len(),
            "Routed artifacts"
        );
        Ok(Some(update))
    }

    /// End-of-turn pass: re-scans the complete message, resolves anything new
    /// and hands one record to the store. Allowed once per message.
    #[instrument(
        skip_all,
        name = "ArtifactCoordinator::finalize",
        fields(message_id = %self.identity.message_id)
    )]
    pub async fn finalize(
        &mut self,
        invocations: &[ToolInvocation],
    ) -> Result<PersistedArtifact, ArtifactError> {
        self.ensure_open()?;

        self.state = CoordinatorState::Persisting;
        let references = scan_invocations(invocations);
        let artifacts = self.resolve_all(&references).await?;
        let set = MessageArtifactSet::new(&self.identity, &self.settings.live_uri, artifacts);
        let record = self.persistence_record(&set)?;

        self.state = CoordinatorState::Done;
        self.store.save(&record).await?;

        info!(
            target: "prism::coordinator",
            artifacts = set.artifacts.len(),
            stored = record.html_content.is_some(),
            "Persisted message artifacts"
        );
        Ok(record)
    }

    fn ensure_open(&mut self) -> Result<(), ArtifactError> {
        let state = self.state;
        match state {
            CoordinatorState::Cancelled => Err(ArtifactError::Cancelled),
            CoordinatorState::Persisting | CoordinatorState::Done => Err(
                ArtifactError::invalid_operation("message artifacts were already persisted"),
            ),
            _ if self.cancel.is_cancelled() => {
                self.state = CoordinatorState::Cancelled;
                Err(ArtifactError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    /// Resolves `references` concurrently; the result keeps discovery order and
    /// drops references that produced nothing.
    async fn resolve_all(
        &mut self,
        references: &[ResourceReference],
    ) -> Result<Vec<ResolvedArtifact>, ArtifactError> {
        match self.resolve_in_order(references).await {
            Err(ArtifactError::Cancelled) => {
                debug!(target: "prism::coordinator", "Discarding partial artifacts");
                self.state = CoordinatorState::Cancelled;
                Err(ArtifactError::Cancelled)
            }
            other => other,
        }
    }

    async fn resolve_in_order(
        &self,
        references: &[ResourceReference],
    ) -> Result<Vec<ResolvedArtifact>, ArtifactError> {
        let mut slots: Vec<Option<ResolvedArtifact>> = vec![None; references.len()];

        let pending: Vec<_> = references
            .iter()
            .enumerate()
            .map(|(index, reference)| async move { (index, self.resolve_one(reference).await) })
            .collect();
        let mut lookups = stream::iter(pending)
            .buffer_unordered(self.settings.max_concurrent_resolutions.max(1));

        while let Some((index, result)) = lookups.next().await {
            match result {
                Ok(artifact) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = artifact;
                    }
                }
                Err(ArtifactError::Cancelled) => return Err(ArtifactError::Cancelled),
                Err(error) => {
                    warn!(
                        target: "prism::coordinator",
                        uri = %references.get(index).map_or("", |r| r.uri.as_str()),
                        error = %error,
                        "Artifact lookup failed"
                    );
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Err(ArtifactError::Cancelled);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    async fn resolve_one(
        &self,
        reference: &ResourceReference,
    ) -> Result<Option<ResolvedArtifact>, ArtifactError> {
        self.cache
            .get_or_resolve(&reference.uri, move || async move {
                if let Some(embedded) = reference.embedded.clone() {
                    match ResolvedArtifact::decode(&reference.uri, embedded) {
                        Ok(artifact) => {
                            debug!(
                                target: "prism::coordinator",
                                uri = %reference.uri,
                                "Using content carried in the tool result"
                            );
                            return Ok(Some(artifact));
                        }
                        Err(error) => {
                            warn!(
                                target: "prism::coordinator",
                                uri = %reference.uri,
                                error = %error,
                                "Embedded content unusable, asking resource servers"
                            );
                        }
                    }
                }
                self.resolver
                    .resolve(&reference.uri, &self.servers, &self.cancel)
                    .await
            })
            .await
    }

    fn persistence_record(
        &self,
        set: &MessageArtifactSet,
    ) -> Result<PersistedArtifact, ArtifactError> {
        let mut parts = Vec::with_capacity(set.artifacts.len());
        for artifact in &set.artifacts {
            let is_live = set.live_uri.as_deref() == Some(artifact.uri.as_str());
            if is_live && !self.settings.persist_live {
                continue;
            }
            if !self.cache.mark_persisted(&artifact.content)? {
                debug!(
                    target: "prism::coordinator",
                    uri = %artifact.uri,
                    "Identical content already in blob"
                );
                continue;
            }
            parts.push(artifact.content.as_str());
        }

        Ok(PersistedArtifact {
            message_id: self.identity.message_id.clone(),
            chat_id: self.identity.chat_id.clone(),
            html_content: (!parts.is_empty()).then(|| parts.join(&self.settings.delimiter)),
        })
    }
}

fn scan_invocations(invocations: &[ToolInvocation]) -> Vec<ResourceReference> {
    scan_all(invocations.iter().map(|invocation| &invocation.result))
}
