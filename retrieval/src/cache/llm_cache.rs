use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// File-backed LLM response cache: one JSON file per entry, keyed by
/// SHA-256 of (task_type, model, content). Identical prompts hit the same
/// file across process restarts.
pub struct LlmCache {
    dir: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    response: String,
    model: String,
    task_type: String,
    content_length: usize,
    cached_at: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LlmCacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl LlmCache {
    /// Creates the cache directory if needed. A directory that cannot be
    /// created degrades to a cache that always misses.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "llm cache directory unavailable");
        } else {
            tracing::info!(dir = %dir.display(), "llm cache initialized");
        }
        Self {
            dir,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(task_type: &str, model: &str, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(task_type.as_bytes());
        hasher.update(b":");
        hasher.update(model.as_bytes());
        hasher.update(b":");
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn get(&self, task_type: &str, model: &str, content: &str) -> Option<String> {
        let path = self.path_for(&Self::key(task_type, model, content));
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Some(entry.response)
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "dropping corrupt cache file");
                    let _ = std::fs::remove_file(&path);
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    None
                }
            },
            Err(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, task_type: &str, model: &str, content: &str, response: &str) {
        let entry = CacheEntry {
            response: response.to_string(),
            model: model.to_string(),
            task_type: task_type.to_string(),
            content_length: content.len(),
            cached_at: Utc::now().to_rfc3339(),
        };
        let path = self.path_for(&Self::key(task_type, model, content));
        match serde_json::to_string_pretty(&entry) {
            Ok(serialized) => {
                if let Err(e) = std::fs::write(&path, serialized) {
                    tracing::warn!(path = %path.display(), error = %e, "llm cache write failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "llm cache serialization failed"),
        }
    }

    pub fn stats(&self) -> LlmCacheStats {
        LlmCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Remove cache files older than `days` days. Returns the number
    /// removed. Invoked by maintenance tooling, not by the query path.
    pub fn cleanup_older_than(&self, days: u64) -> usize {
        let cutoff = std::time::SystemTime::now()
            .checked_sub(std::time::Duration::from_secs(days * 24 * 3600));
        let Some(cutoff) = cutoff else { return 0 };
        let mut removed = 0;

        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return 0;
        };
        for entry in entries.flatten() {
            if !is_cache_file(&entry.path()) {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if modified < cutoff && std::fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "removed stale llm cache files");
        }
        removed
    }
}

fn is_cache_file(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_responses() {
        let dir = TempDir::new().unwrap();
        let cache = LlmCache::new(dir.path());

        assert!(cache.get("answer", "gemini-2.0-flash", "prompt").is_none());
        cache.put("answer", "gemini-2.0-flash", "prompt", "the answer [1]");
        assert_eq!(
            cache.get("answer", "gemini-2.0-flash", "prompt").as_deref(),
            Some("the answer [1]")
        );

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn key_includes_task_and_model() {
        let dir = TempDir::new().unwrap();
        let cache = LlmCache::new(dir.path());
        cache.put("answer", "model-a", "prompt", "a");
        assert!(cache.get("answer", "model-b", "prompt").is_none());
        assert!(cache.get("rewrite", "model-a", "prompt").is_none());
    }

    #[test]
    fn corrupt_files_are_dropped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let cache = LlmCache::new(dir.path());
        cache.put("answer", "m", "prompt", "ok");

        // Corrupt the single cache file on disk.
        let file = std::fs::read_dir(dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        std::fs::write(&file, "not json").unwrap();

        assert!(cache.get("answer", "m", "prompt").is_none());
        assert!(!file.exists());
    }

    #[test]
    fn cleanup_ignores_fresh_files() {
        let dir = TempDir::new().unwrap();
        let cache = LlmCache::new(dir.path());
        cache.put("answer", "m", "prompt", "ok");
        assert_eq!(cache.cleanup_older_than(30), 0);
        assert!(cache.get("answer", "m", "prompt").is_some());
    }
}
