//! Cache tags and keys.
//!
//! These strings form the shared cache namespace: every writer sharing one
//! cache must agree on them.

use std::fmt;

use uuid::Uuid;

/// Umbrella tag over every tier list cache entry.
pub const UMBRELLA_TAG: &str = "TLR";

/// Key holding the public "recent" listing, filed under [`UMBRELLA_TAG`].
pub const RECENT_KEY: &str = "TLR_R";

/// Label under which cache entries are filed for bulk invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn umbrella() -> Self {
        Self::new(UMBRELLA_TAG)
    }

    /// Per-owner tag; equal to the owner's identifier.
    pub fn owner(user_id: Uuid) -> Self {
        Self(user_id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn tier_list(id: Uuid) -> Self {
        Self(id.to_string())
    }

    /// One page of an owner's listing. The first page has no cursor.
    pub fn owner_page(user_id: Uuid, cursor: Option<&str>) -> Self {
        Self(format!("{user_id}{}", cursor.unwrap_or_default()))
    }

    pub fn recent() -> Self {
        Self::new(RECENT_KEY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
