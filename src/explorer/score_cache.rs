
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use super::scoring::clamp_score;
use crate::core::error::Result;
use crate::core::models::RelationshipType;
use crate::store::RelationStore;

type PairKey = (String, String);

/// Outcome of a relevance lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPair {
    pub score: f64,
    /// `true` when the score came from the relation store.
    pub cached: bool,
}


#[derive(Debug, Default, Clone)]
pub struct ScoreCacheStats {
    pub hits: u64,
    pub computed: u64,
}

/// Read/write-through view of the relation store that makes scoring
/// idempotent: a pair is computed at most once, even across sessions racing
/// on the same pair.
pub struct ScoreCache {
    relations: Arc<dyn RelationStore>,
    pair_locks: Mutex<HashMap<PairKey, Arc<tokio::sync::Mutex<()>>>>,
    hits: AtomicU64,
    computed: AtomicU64,
}

impl ScoreCache {
    pub fn new(relations: Arc<dyn RelationStore>) -> Self {
        Self {
            relations,
            pair_locks: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            computed: AtomicU64::new(0),
        }
    }

    /// Cached score for `(source, target)`, if one has been set.
    pub async fn lookup(&self, source_id: &str, target_id: &str) -> Result<Option<f64>> {
        let relation = self.relations.get(source_id, target_id).await?;
        Ok(relation.and_then(|r| r.relevance_score))
    }

    /// Returns the cached score or runs `compute`, clamps and persists it.
    ///
    /// Concurrent callers on the same pair serialize on a per-pair lock and
    /// re-check the store after acquiring it, so only the first computes.
    /// Nothing is written if `compute` fails.
    pub async fn get_or_compute<F, Fut>(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: RelationshipType,
        compute: F,
    ) -> Result<ScoredPair>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<f64>> + Send,
    {
        if let Some(score) = self.lookup(source_id, target_id).await? {
            return Ok(self.hit(source_id, target_id, score));
        }

        let registration = self.pair_lock((source_id.to_string(), target_id.to_string()));
        let _held = registration.lock.lock().await;
        match self.lookup(source_id, target_id).await? {
            Some(score) => Ok(self.hit(source_id, target_id, score)),
            None => self.compute_and_store(source_id, target_id, relationship_type, compute).await,
        }
    }

    async fn compute_and_store<F, Fut>(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: RelationshipType,
        compute: F,
    ) -> Result<ScoredPair>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<f64>> + Send,
    {
        let score = clamp_score(compute().await?);
        self.relations
            .upsert(source_id, target_id, score, relationship_type, None)
            .await?;
        self.computed.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Scored {} -> {}: {:.4}",
            crate::safe_truncate(source_id, 12),
            crate::safe_truncate(target_id, 12),
            score
        );
        Ok(ScoredPair { score, cached: false })
    }

    fn hit(&self, source_id: &str, target_id: &str, score: f64) -> ScoredPair {
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Score cache HIT {} -> {}: {:.4}",
            crate::safe_truncate(source_id, 12),
            crate::safe_truncate(target_id, 12),
            score
        );
        ScoredPair { score, cached: true }
    }

    fn pair_lock(&self, key: PairKey) -> PairLockRegistration<'_> {
        let lock = Arc::clone(self.pair_locks.lock().entry(key.clone()).or_default());
        PairLockRegistration { cache: self, key, lock }
    }

    pub fn stats(&self) -> ScoreCacheStats {
        ScoreCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            computed: self.computed.load(Ordering::Relaxed),
        }
    }
}

/// A caller's claim on a pair lock. Dropping it, on completion or when the
/// caller's future is dropped mid-compute, unregisters the lock once no other
/// caller holds or awaits it.
struct PairLockRegistration<'a> {
    cache: &'a ScoreCache,
    key: PairKey,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for PairLockRegistration<'_> {
    fn drop(&mut self) {
        let mut locks = self.cache.pair_locks.lock();
        // Registry + this handle: nobody else is waiting on the pair.
        if Arc::strong_count(&self.lock) <= 2 {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ExploreError;
    use crate::store::InMemoryRelationStore;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn cache() -> (Arc<InMemoryRelationStore>, ScoreCache) {
        let store = Arc::new(InMemoryRelationStore::new());
        (store.clone(), ScoreCache::new(store))
    }

    #[tokio::test]
    async fn test_compute_once_then_hit() {
        let (store, cache) = cache();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let first = cache
            .get_or_compute("root", "p1", RelationshipType::Citation, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(0.93)
            })
            .await
            .unwrap();
        let second = cache
            .get_or_compute("root", "p1", RelationshipType::Citation, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(0.10)
            })
            .await
            .unwrap();

        assert_eq!(first, ScoredPair { score: 0.93, cached: false });
        assert_eq!(second, ScoredPair { score: 0.93, cached: true });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.write_count(), 1);
        assert_eq!(cache.stats().computed, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_scores_are_clamped_before_persisting() {
        let (_, cache) = cache();
        let scored = cache
            .get_or_compute("root", "p1", RelationshipType::Citation, || async { Ok(1.0000001) })
            .await
            .unwrap();
        assert_eq!(scored.score, 1.0);
        assert_eq!(cache.lookup("root", "p1").await.unwrap(), Some(1.0));
    }

    #[tokio::test]
    async fn test_failed_compute_persists_nothing() {
        let (store, cache) = cache();
        let result = cache
            .get_or_compute("root", "p1", RelationshipType::Citation, || async {
                Err(ExploreError::ExternalService("embedding endpoint down".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(store.is_empty());
        assert!(cache.pair_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_pairs_are_ordered() {
        let (_, cache) = cache();
        cache
            .get_or_compute("a", "b", RelationshipType::Citation, || async { Ok(0.5) })
            .await
            .unwrap();
        assert_eq!(cache.lookup("b", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_callers_compute_once() {
        let (store, cache) = cache();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let compute = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(0.77)
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_compute("root", "p1", RelationshipType::Citation, compute),
            cache.get_or_compute("root", "p1", RelationshipType::Citation, compute),
            cache.get_or_compute("root", "p1", RelationshipType::Citation, compute),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.write_count(), 1);
        let scored = [a.unwrap(), b.unwrap(), c.unwrap()];
        assert!(scored.iter().all(|s| s.score == 0.77));
        assert_eq!(scored.iter().filter(|s| !s.cached).count(), 1);
        assert!(cache.pair_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_compute_releases_pair_lock() {
        let (store, cache) = cache();
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            cache.get_or_compute("root", "p1", RelationshipType::Citation, || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(0.5)
            }),
        )
        .await;

        assert!(abandoned.is_err());
        assert!(cache.pair_locks.lock().is_empty());
        assert!(store.is_empty());

        let scored = cache
            .get_or_compute("root", "p1", RelationshipType::Citation, || async { Ok(0.6) })
            .await
            .unwrap();
        assert_eq!(scored, ScoredPair { score: 0.6, cached: false });
        assert!(cache.pair_locks.lock().is_empty());
    }
}
