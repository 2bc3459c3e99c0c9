use thiserror::Error;

use crate::store::ArtifactStoreError;

#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The surrounding chat request went away. Not a failure.
    #[error("Artifact processing cancelled")]
    Cancelled,

    #[error("Artifact cache lock poisoned: {message}")]
    LockPoisoned { message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error(transparent)]
    Store(#[from] ArtifactStoreError),
}

impl ArtifactError {
    pub fn lock_poisoned(message: impl Into<String>) -> Self {
        Self::LockPoisoned {
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
