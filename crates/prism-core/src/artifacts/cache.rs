use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::debug;

use super::error::ArtifactError;
use super::types::ResolvedArtifact;

type Slot = Arc<OnceCell<Option<ResolvedArtifact>>>;

/// Per-message memo of resolutions, keyed by literal URI.
///
/// Each URI is resolved at most once: concurrent callers share the in-flight
/// attempt and later callers get the settled outcome, including "not found".
/// Errors (cancellation) are not memoized. A cache must never outlive the
/// message it was created for.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    slots: Mutex<HashMap<String, Slot>>,
    persisted: Mutex<HashSet<String>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_resolve<F, Fut>(
        &self,
        uri: &str,
        resolve: F,
    ) -> Result<Option<ResolvedArtifact>, ArtifactError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<ResolvedArtifact>, ArtifactError>>,
    {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| ArtifactError::lock_poisoned("slots"))?;
            slots.entry(uri.to_string()).or_default().clone()
        };

        if slot.initialized() {
            debug!(target: "prism::cache", uri, "Cache hit");
        }

        slot.get_or_try_init(resolve).await.cloned()
    }

    /// Settled outcome for `uri`, if resolution already finished.
    pub fn get(&self, uri: &str) -> Option<Option<ResolvedArtifact>> {
        let slots = self.slots.lock().ok()?;
        slots.get(uri).and_then(|slot| slot.get().cloned())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.get(uri).is_some()
    }

    /// Number of URIs with a settled outcome.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .map(|slots| slots.values().filter(|slot| slot.initialized()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records `content` as persisted. Returns false if identical content was
    /// already recorded for this message.
    pub fn mark_persisted(&self, content: &str) -> Result<bool, ArtifactError> {
        let digest = hex::encode(Sha256::digest(content.as_bytes()));
        let mut persisted = self
            .persisted
            .lock()
            .map_err(|_| ArtifactError::lock_poisoned("persisted"))?;
        Ok(persisted.insert(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn artifact(uri: &str) -> ResolvedArtifact {
        ResolvedArtifact {
            uri: uri.to_string(),
            mime_type: "text/html".to_string(),
            content: format!("<p>{uri}</p>"),
        }
    }

    #[tokio::test]
    async fn test_repeated_lookups_resolve_once() {
        let cache = ArtifactCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .get_or_resolve("ui://a", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(artifact("ui://a")))
                })
                .await
                .unwrap();
            assert_eq!(result, Some(artifact("ui://a")));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains("ui://a"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_memoized() {
        let cache = ArtifactCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_resolve("ui://missing", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert_eq!(result, None);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("ui://missing"), Some(None));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_resolution() {
        let cache = ArtifactCache::new();
        let calls = AtomicUsize::new(0);

        let lookup = || {
            cache.get_or_resolve("ui://a", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(Some(artifact("ui://a")))
            })
        };

        let (first, second, third) = tokio::join!(lookup(), lookup(), lookup());
        assert_eq!(first.unwrap(), second.unwrap());
        assert!(third.unwrap().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_is_not_memoized() {
        let cache = ArtifactCache::new();

        let result = cache
            .get_or_resolve("ui://a", || async { Err(ArtifactError::Cancelled) })
            .await;
        assert!(matches!(result, Err(ArtifactError::Cancelled)));
        assert!(!cache.contains("ui://a"));

        let result = cache
            .get_or_resolve("ui://a", || async { Ok(Some(artifact("ui://a"))) })
            .await
            .unwrap();
        assert!(result.is_some());
    }

    #[test]
    fn test_identical_content_is_persisted_once() {
        let cache = ArtifactCache::new();
        assert!(cache.mark_persisted("<div/>").unwrap());
        assert!(!cache.mark_persisted("<div/>").unwrap());
        assert!(cache.mark_persisted("<span/>").unwrap());
    }
}
