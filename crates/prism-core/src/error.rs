use thiserror::Error;

use crate::{artifacts::ArtifactError, store::ArtifactStoreError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Store(#[from] ArtifactStoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
}
