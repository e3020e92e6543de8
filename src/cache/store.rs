//! Tag-aware cache storage.
//!
//! [`TagStore`] is the narrow port the tagged cache talks to. Values travel
//! as JSON documents so a networked backend with native tag sets can stand
//! in for [`MemoryTagStore`] without touching callers.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::keys::{CacheKey, Tag};
use super::lock::mutex_lock;
use super::registry::TagRegistry;

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<JsonValue>, CacheError>;

    /// Store `value` under `key`, filed under every tag in `tags`.
    async fn put(&self, tags: &[Tag], key: CacheKey, value: JsonValue) -> Result<(), CacheError>;

    /// Remove the entry stored under `key` if it carries `tag`.
    async fn forget(&self, tag: &Tag, key: &CacheKey) -> Result<bool, CacheError>;

    /// Remove every entry carrying `tag`. Returns how many were removed.
    async fn flush(&self, tag: &Tag) -> Result<usize, CacheError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<CacheKey, JsonValue>,
    registry: TagRegistry,
}

/// In-process tag store: forward map plus inverted tag index under one mutex.
#[derive(Debug, Default)]
pub struct MemoryTagStore {
    state: Mutex<MemoryState>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                entries: HashMap::new(),
                registry: TagRegistry::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        mutex_lock(&self.state, SOURCE, "contains")
            .entries
            .contains_key(key)
    }

    pub fn tags_for(&self, key: &CacheKey) -> HashSet<Tag> {
        mutex_lock(&self.state, SOURCE, "tags_for")
            .registry
            .tags_for_key(key)
    }

    pub fn keys_for(&self, tag: &Tag) -> HashSet<CacheKey> {
        mutex_lock(&self.state, SOURCE, "keys_for")
            .registry
            .keys_for_tag(tag)
    }

    /// Number of non-empty tag buckets.
    pub fn tag_count(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "tag_count")
            .registry
            .tag_count()
    }
}

#[async_trait]
impl TagStore for MemoryTagStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<JsonValue>, CacheError> {
        Ok(mutex_lock(&self.state, SOURCE, "get")
            .entries
            .get(key)
            .cloned())
    }

    async fn put(&self, tags: &[Tag], key: CacheKey, value: JsonValue) -> Result<(), CacheError> {
        let mut state = mutex_lock(&self.state, SOURCE, "put");
        state.registry.register(&key, tags);
        state.entries.insert(key, value);
        Ok(())
    }

    async fn forget(&self, tag: &Tag, key: &CacheKey) -> Result<bool, CacheError> {
        let mut state = mutex_lock(&self.state, SOURCE, "forget");
        if !state.registry.carries(key, tag) {
            return Ok(false);
        }
        state.registry.unregister(key);
        Ok(state.entries.remove(key).is_some())
    }

    async fn flush(&self, tag: &Tag) -> Result<usize, CacheError> {
        let mut state = mutex_lock(&self.state, SOURCE, "flush");
        let keys = state.registry.drain_tag(tag);
        let mut removed = 0;
        for key in keys {
            if state.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
