//! Cache configuration.

use serde::Deserialize;

/// Runtime switch for the tagged read cache.
///
/// With the cache disabled every read goes straight to the system of record
/// and flush/forget calls do nothing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}
