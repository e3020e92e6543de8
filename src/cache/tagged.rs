//! Read-through cache facade over a [`TagStore`].
//!
//! Cache faults never fail a request: reads fall back to computing the value
//! from the source and failed writes or invalidations are logged.
//!
//! `get_or_compute` does not coordinate concurrent misses. Two callers
//! missing the same key may both compute, and the last store wins.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::{CacheKey, Tag};
use super::store::{MemoryTagStore, TagStore};

const METRIC_CACHE_HIT: &str = "tierlist_cache_hit_total";
const METRIC_CACHE_MISS: &str = "tierlist_cache_miss_total";
const METRIC_CACHE_FLUSH: &str = "tierlist_cache_flush_total";
const METRIC_CACHE_ERROR: &str = "tierlist_cache_error_total";

#[derive(Clone)]
pub struct TaggedCache {
    config: CacheConfig,
    store: Arc<dyn TagStore>,
}

impl TaggedCache {
    pub fn new(config: CacheConfig, store: Arc<dyn TagStore>) -> Self {
        Self { config, store }
    }

    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(config, Arc::new(MemoryTagStore::new()))
    }

    /// Return the value cached under `key`, or compute it, file it under all
    /// `tags` and return it. Errors from `compute` are returned as-is and
    /// nothing is cached for them.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        tags: &[Tag],
        key: CacheKey,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_value::<T>(raw) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT).increment(1);
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    counter!(METRIC_CACHE_ERROR, "op" => "decode").increment(1);
                    warn!(key = %key, error = %err, "discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "get").increment(1);
                warn!(key = %key, error = %err, "cache read failed; reading from source");
            }
        }

        counter!(METRIC_CACHE_MISS).increment(1);
        debug!(key = %key, "cache miss");

        let value = compute().await?;

        match serde_json::to_value(&value) {
            Ok(raw) => {
                if let Err(err) = self.store.put(tags, key.clone(), raw).await {
                    counter!(METRIC_CACHE_ERROR, "op" => "put").increment(1);
                    warn!(key = %key, error = %err, "cache write failed");
                }
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "encode").increment(1);
                warn!(key = %key, error = %err, "value could not be encoded for cache");
            }
        }

        Ok(value)
    }

    /// Evict the entry addressed by `(tag, key)`. Returns whether one was removed.
    pub async fn forget_key(&self, tag: &Tag, key: &CacheKey) -> bool {
        if !self.config.enabled {
            return false;
        }

        match self.store.forget(tag, key).await {
            Ok(removed) => {
                debug!(tag = %tag, key = %key, removed, "cache key forgotten");
                removed
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "forget").increment(1);
                warn!(tag = %tag, key = %key, error = %err, "cache forget failed");
                false
            }
        }
    }

    /// Evict every entry filed under `tag`. Returns the number removed.
    pub async fn flush_tag(&self, tag: &Tag) -> usize {
        if !self.config.enabled {
            return 0;
        }

        match self.store.flush(tag).await {
            Ok(removed) => {
                counter!(METRIC_CACHE_FLUSH).increment(1);
                debug!(tag = %tag, removed, "cache tag flushed");
                removed
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "flush").increment(1);
                warn!(tag = %tag, error = %err, "cache flush failed");
                0
            }
        }
    }
}
