use async_trait::async_trait;
use eyre::Result;
use prism_core::artifacts::PersistedArtifact;
use prism_core::config::ArtifactConfigLoader;
use prism_core::error::Error;
use prism_core::store::ArtifactStore;
use serde_json::{Value, json};
use std::path::PathBuf;

use super::{Command, open_store, write_json};

pub struct ReplayCommand {
    pub message_id: String,
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
}

#[async_trait]
impl Command for ReplayCommand {
    async fn execute(&self) -> Result<()> {
        let config = ArtifactConfigLoader::new(self.config.clone()).load().await?;
        let store = open_store(self.db.as_ref()).await?;

        let record = load_record(&store, &self.message_id).await?;

        write_json(&replay_json(&record, &config.artifacts.delimiter))
    }
}

async fn load_record(
    store: &dyn ArtifactStore,
    message_id: &str,
) -> prism_core::error::Result<PersistedArtifact> {
    store
        .load(message_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no artifacts stored for message {message_id}")))
}

fn replay_json(record: &PersistedArtifact, delimiter: &str) -> Value {
    json!({
        "record": record,
        "segments": record.segments(delimiter),
    })
}
