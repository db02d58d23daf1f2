

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Text → embedding memo, bounded by entry count and age.
pub struct EmbeddingCache {
    cache: Mutex<LruCache<String, (Vec<f32>, Instant)>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl EmbeddingCache {

    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl: Duration::from_secs(ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn make_key(model: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }


    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut cache = self.cache.lock();
        let entry = cache
            .get(key)
            .map(|(embedding, created_at)| (created_at.elapsed() < self.ttl).then(|| embedding.clone()));
        match entry {
            Some(Some(embedding)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(embedding)
            }
            Some(None) => {
                cache.pop(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }


    pub fn set(&self, key: &str, embedding: Vec<f32>) {
        self.cache.lock().put(key.to_string(), (embedding, Instant::now()));
    }


    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss_accounting() {
        let cache = EmbeddingCache::new(4, 60);
        let key = EmbeddingCache::make_key("nomic-embed-text", "introduction");

        assert!(cache.get(&key).is_none());
        cache.set(&key, vec![0.1, 0.2]);
        assert_eq!(cache.get(&key), Some(vec![0.1, 0.2]));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = EmbeddingCache::new(2, 60);
        cache.set("a", vec![1.0]);
        cache.set("b", vec![2.0]);
        cache.get("a");
        cache.set("c", vec![3.0]);

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = EmbeddingCache::new(2, 0);
        cache.set("a", vec![1.0]);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_keys_depend_on_model() {
        assert_ne!(
            EmbeddingCache::make_key("m1", "methods"),
            EmbeddingCache::make_key("m2", "methods")
        );
        assert_eq!(
            EmbeddingCache::make_key("m1", "methods"),
            EmbeddingCache::make_key("m1", "methods")
        );
    }

    #[test]
    fn test_zero_capacity_still_caches_one() {
        let cache = EmbeddingCache::new(0, 60);
        cache.set("a", vec![1.0]);
        assert!(cache.get("a").is_some());
    }
}
