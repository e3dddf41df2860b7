use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

pub const DEFAULT_TTL_SECS: u64 = 3600; // 1 hour

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The user list.
    pub fn users() -> Self {
        Self::new(["users"])
    }

    /// Scratch entry written after updates.
    pub fn random() -> Self {
        Self::new(["random"])
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub stale: bool,
    pub fetched_at: u64,
}

/// Server-state cache shared by everything that reads or mutates records.
pub trait QueryCache: Send + Sync {
    fn read(&self, key: &QueryKey) -> Option<CacheEntry>;

    fn write(&self, key: &QueryKey, value: Value);

    /// Mark every entry under `prefix` stale.
    fn invalidate(&self, prefix: &QueryKey);

    fn generation(&self, key: &QueryKey) -> u64;

    /// Write only if no invalidation touched `key` since `generation` was
    /// read. Returns whether the value was stored.
    fn write_if_current(&self, key: &QueryKey, value: Value, generation: u64) -> bool;
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    generations: HashMap<QueryKey, u64>,
}

impl CacheState {
    fn generation(&self, key: &QueryKey) -> u64 {
        self.generations
            .iter()
            .filter(|(prefix, _)| key.starts_with(prefix))
            .map(|(_, generation)| *generation)
            .sum()
    }

    fn insert(&mut self, key: &QueryKey, value: Value) {
        self.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                stale: false,
                fetched_at: now_secs(),
            },
        );
    }
}

/// On-disk form of the cache.
#[derive(Serialize, Deserialize, Default)]
struct CacheFile {
    entries: Vec<CachedQuery>,
}

#[derive(Serialize, Deserialize)]
struct CachedQuery {
    key: QueryKey,
    #[serde(flatten)]
    entry: CacheEntry,
}

/// In-process cache, optionally persisted as JSON between runs.
pub struct MemoryCache {
    state: Mutex<CacheState>,
    ttl: Option<Duration>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl: None,
        }
    }

    /// Entries older than `ttl` read as stale.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new()
        }
    }

    /// Load a cache file. Anything unreadable yields an empty cache.
    pub fn load(path: &Path, ttl: Duration) -> Self {
        let cache = Self::with_ttl(ttl);

        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return cache,
        };

        let file: CacheFile = match serde_json::from_str(&contents) {
            Ok(f) => f,
            Err(e) => {
                debug!("Ignoring unreadable cache at {}: {e}", path.display());
                return cache;
            }
        };

        {
            let mut state = cache.state.lock();
            for query in file.entries {
                state.entries.insert(query.key, query.entry);
            }
        }

        cache
    }

    /// Persist the cache. Failures are logged and otherwise ignored.
    pub fn save(&self, path: &Path) {
        let file = {
            let state = self.state.lock();
            CacheFile {
                entries: state
                    .entries
                    .iter()
                    .map(|(key, entry)| CachedQuery {
                        key: key.clone(),
                        entry: entry.clone(),
                    })
                    .collect(),
            }
        };

        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let contents = match serde_json::to_string_pretty(&file) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to serialize cache: {e}");
                return;
            }
        };

        if let Err(e) = std::fs::write(path, contents) {
            warn!("Failed to write cache to {}: {e}", path.display());
        }
    }

    fn expired(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            Some(ttl) => now_secs().saturating_sub(entry.fetched_at) > ttl.as_secs(),
            None => false,
        }
    }
}

impl QueryCache for MemoryCache {
    fn read(&self, key: &QueryKey) -> Option<CacheEntry> {
        let state = self.state.lock();
        let mut entry = state.entries.get(key)?.clone();
        if self.expired(&entry) {
            entry.stale = true;
        }
        Some(entry)
    }

    fn write(&self, key: &QueryKey, value: Value) {
        trace!("cache write {key}");
        self.state.lock().insert(key, value);
    }

    fn invalidate(&self, prefix: &QueryKey) {
        let mut state = self.state.lock();
        *state.generations.entry(prefix.clone()).or_insert(0) += 1;

        let mut marked = 0;
        for (key, entry) in state.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                marked += 1;
            }
        }
        debug!("Invalidated {prefix} ({marked} entries)");
    }

    fn generation(&self, key: &QueryKey) -> u64 {
        self.state.lock().generation(key)
    }

    fn write_if_current(&self, key: &QueryKey, value: Value, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.generation(key) != generation {
            debug!("Discarding response for {key}: invalidated while in flight");
            return false;
        }
        state.insert(key, value);
        true
    }
}

impl<T: QueryCache + ?Sized> QueryCache for Arc<T> {
    fn read(&self, key: &QueryKey) -> Option<CacheEntry> {
        (**self).read(key)
    }

    fn write(&self, key: &QueryKey, value: Value) {
        (**self).write(key, value)
    }

    fn invalidate(&self, prefix: &QueryKey) {
        (**self).invalidate(prefix)
    }

    fn generation(&self, key: &QueryKey) -> u64 {
        (**self).generation(key)
    }

    fn write_if_current(&self, key: &QueryKey, value: Value, generation: u64) -> bool {
        (**self).write_if_current(key, value, generation)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "users-cli-{}-{}-{name}.json",
            std::process::id(),
            uuid::Uuid::new_v4()
        ))
    }

    #[test]
    fn test_read_missing() {
        let cache = MemoryCache::new();
        assert!(cache.read(&QueryKey::users()).is_none());
    }

    #[test]
    fn test_write_then_read_is_fresh() {
        let cache = MemoryCache::new();
        cache.write(&QueryKey::users(), json!([]));
        let entry = cache.read(&QueryKey::users()).unwrap();
        assert!(!entry.stale);
        assert_eq!(entry.value, json!([]));
    }

    #[test]
    fn test_invalidate_marks_prefix_stale() {
        let cache = MemoryCache::new();
        cache.write(&QueryKey::users(), json!([]));
        cache.write(&QueryKey::new(["users", "u1"]), json!({"id": "u1"}));
        cache.write(&QueryKey::random(), json!({"value": 1}));

        cache.invalidate(&QueryKey::users());

        assert!(cache.read(&QueryKey::users()).unwrap().stale);
        assert!(cache.read(&QueryKey::new(["users", "u1"])).unwrap().stale);
        assert!(!cache.read(&QueryKey::random()).unwrap().stale);
    }

    #[test]
    fn test_prefix_does_not_match_partial_segment() {
        let key = QueryKey::new(["users_archive"]);
        assert!(!key.starts_with(&QueryKey::users()));
    }

    #[test]
    fn test_generation_fence() {
        let cache = MemoryCache::new();
        let key = QueryKey::users();
        let generation = cache.generation(&key);

        cache.invalidate(&key);

        assert!(!cache.write_if_current(&key, json!(["old"]), generation));
        assert!(cache.read(&key).is_none());

        let generation = cache.generation(&key);
        assert!(cache.write_if_current(&key, json!(["new"]), generation));
        assert_eq!(cache.read(&key).unwrap().value, json!(["new"]));
    }

    #[test]
    fn test_parent_invalidation_bumps_child_generation() {
        let cache = MemoryCache::new();
        let child = QueryKey::new(["users", "u1"]);
        let before = cache.generation(&child);
        cache.invalidate(&QueryKey::users());
        assert_ne!(cache.generation(&child), before);
    }

    #[test]
    fn test_ttl_expiry_reads_stale() {
        let cache = MemoryCache::with_ttl(Duration::from_secs(60));
        cache.state.lock().entries.insert(
            QueryKey::users(),
            CacheEntry {
                value: json!([]),
                stale: false,
                fetched_at: now_secs() - 120,
            },
        );
        assert!(cache.read(&QueryKey::users()).unwrap().stale);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let cache = MemoryCache::new();
        cache.write(&QueryKey::users(), json!([{"id": "u1"}]));
        cache.write(&QueryKey::random(), json!({"value": "x"}));
        cache.invalidate(&QueryKey::random());
        cache.save(&path);

        let loaded = MemoryCache::load(&path, Duration::from_secs(DEFAULT_TTL_SECS));
        let users = loaded.read(&QueryKey::users()).unwrap();
        assert_eq!(users.value, json!([{"id": "u1"}]));
        assert!(!users.stale);
        assert!(loaded.read(&QueryKey::random()).unwrap().stale);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_garbage_is_empty() {
        let path = temp_path("garbage");
        std::fs::write(&path, "not json").unwrap();
        let loaded = MemoryCache::load(&path, Duration::from_secs(60));
        assert!(loaded.read(&QueryKey::users()).is_none());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let loaded = MemoryCache::load(&temp_path("missing"), Duration::from_secs(60));
        assert!(loaded.read(&QueryKey::users()).is_none());
    }
}
