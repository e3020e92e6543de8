//! Bidirectional tag registry.
//!
//! Tracks tag → keys (the inverted index walked by a flush) and key → tags
//! (so a removed entry can be unlinked from every bucket it sits in).

use std::collections::{HashMap, HashSet};

use super::keys::{CacheKey, Tag};

/// Not synchronized; the owning store guards it together with the entries.
#[derive(Debug, Default)]
pub(crate) struct TagRegistry {
    tag_to_keys: HashMap<Tag, HashSet<CacheKey>>,
    key_to_tags: HashMap<CacheKey, HashSet<Tag>>,
}

impl TagRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// File `key` under exactly `tags`, replacing any previous filing.
    pub(crate) fn register(&mut self, key: &CacheKey, tags: &[Tag]) {
        self.unregister(key);

        let tags: HashSet<Tag> = tags.iter().cloned().collect();
        for tag in &tags {
            self.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.key_to_tags.insert(key.clone(), tags);
    }

    /// Remove `key` from every bucket. Returns the tags it carried.
    pub(crate) fn unregister(&mut self, key: &CacheKey) -> Option<HashSet<Tag>> {
        let tags = self.key_to_tags.remove(key)?;
        for tag in &tags {
            if let Some(keys) = self.tag_to_keys.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_to_keys.remove(tag);
                }
            }
        }
        Some(tags)
    }

    pub(crate) fn carries(&self, key: &CacheKey, tag: &Tag) -> bool {
        self.key_to_tags
            .get(key)
            .is_some_and(|tags| tags.contains(tag))
    }

    /// Drop the bucket for `tag` and unlink each of its keys everywhere.
    ///
    /// Returns the keys whose entries must now be deleted.
    pub(crate) fn drain_tag(&mut self, tag: &Tag) -> HashSet<CacheKey> {
        let keys = self.tag_to_keys.remove(tag).unwrap_or_default();
        for key in &keys {
            self.unregister(key);
        }
        keys
    }

    pub(crate) fn tags_for_key(&self, key: &CacheKey) -> HashSet<Tag> {
        self.key_to_tags.get(key).cloned().unwrap_or_default()
    }

    pub(crate) fn keys_for_tag(&self, tag: &Tag) -> HashSet<CacheKey> {
        self.tag_to_keys.get(tag).cloned().unwrap_or_default()
    }

    pub(crate) fn tag_count(&self) -> usize {
        self.tag_to_keys.len()
    }

    #[cfg(test)]
    pub(crate) fn key_count(&self) -> usize {
        self.key_to_tags.len()
    }
}
