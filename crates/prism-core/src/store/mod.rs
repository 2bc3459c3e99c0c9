pub mod artifact_store;
pub mod sqlite;

pub use artifact_store::{ArtifactStore, ArtifactStoreError, InMemoryArtifactStore};
pub use sqlite::SqliteArtifactStore;
