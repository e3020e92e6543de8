//! Tag-indexed read cache.
//!
//! Every entry is filed under one or more tags. Three invalidation
//! granularities share one namespace:
//!
//! - a single board: key = board id, tag = [`UMBRELLA_TAG`]
//! - an owner's listing pages: key = owner id + cursor, tags = umbrella + owner id
//! - the public "recent" listing: key = [`RECENT_KEY`], tag = umbrella
//!
//! ```toml
//! [cache]
//! enabled = true
//! ```

mod config;
mod keys;
mod lock;
mod registry;
mod store;
mod tagged;

pub use config::CacheConfig;
pub use keys::{CacheKey, RECENT_KEY, Tag, UMBRELLA_TAG};
pub use store::{CacheError, MemoryTagStore, TagStore};
pub use tagged::TaggedCache;
