pub mod cache;
pub mod coordinator;
pub mod error;
pub mod reference;
pub mod resolver;
pub mod scanner;
pub mod types;

pub use cache::ArtifactCache;
pub use coordinator::{
    ArtifactCoordinator, ArtifactPipeline, ArtifactSettings, CoordinatorState, DEFAULT_DELIMITER,
    DEFAULT_LIVE_URI, DEFAULT_MAX_CONCURRENT_RESOLUTIONS,
};
pub use error::ArtifactError;
pub use reference::{Encoding, ResourceReference, UI_SCHEME, is_ui_uri, same_ui_uri};
pub use resolver::{ResolverSettings, ResourceResolver};
pub use scanner::{scan, scan_all};
pub use types::{
    DEFAULT_MIME_TYPE, DisplayUpdate, LiveArtifact, MessageArtifactSet, MessageIdentity,
    PersistedArtifact, ResolvedArtifact, ToolInvocation,
};
