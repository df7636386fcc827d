use dashmap::DashMap;
use policyhub_models::EmbeddingModelKind;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide embedding cache, keyed by SHA-256 of (model, text).
///
/// Bounded by entry count; when full, an arbitrary shard-local batch is
/// evicted instead of strict LRU. Queries repeat heavily within a session,
/// so recency precision buys little here.
pub struct EmbeddingCache {
    entries: DashMap<String, Vec<f32>>,
    budget: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl EmbeddingCache {
    pub fn new(budget: usize) -> Self {
        Self {
            entries: DashMap::new(),
            budget: budget.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(text: &str, model: EmbeddingModelKind) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, text: &str, model: EmbeddingModelKind) -> Option<Vec<f32>> {
        let key = Self::key(text, model);
        match self.entries.get(&key) {
            Some(vector) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(vector.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, text: &str, model: EmbeddingModelKind, vector: Vec<f32>) {
        if self.entries.len() >= self.budget {
            self.evict_batch();
        }
        self.entries.insert(Self::key(text, model), vector);
    }

    fn evict_batch(&self) {
        let to_drop = (self.budget / 10).max(1);
        let victims: Vec<String> = self
            .entries
            .iter()
            .take(to_drop)
            .map(|e| e.key().clone())
            .collect();
        for key in victims {
            self.entries.remove(&key);
        }
        tracing::debug!(evicted = to_drop, "embedding cache evicted a batch");
    }

    pub fn stats(&self) -> EmbeddingCacheStats {
        EmbeddingCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
