//! Images dropped from a board between two revisions of its payload.

use std::collections::{BTreeSet, HashSet};

use crate::domain::assets::{AssetUrlError, AssetUrlResolver, PublicId};
use crate::domain::payload::TierListData;

/// Result of diffing two payloads.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OrphanedAssets {
    /// Remote identifiers no longer referenced anywhere on the board.
    pub public_ids: BTreeSet<PublicId>,
    /// Dropped sources that could not be mapped to a remote identifier.
    pub unresolved: Vec<(String, AssetUrlError)>,
}

impl OrphanedAssets {
    pub fn is_empty(&self) -> bool {
        self.public_ids.is_empty() && self.unresolved.is_empty()
    }
}

/// Sources present in `previous` and absent from `next`.
///
/// Membership is board-wide: an image moved between the sidebar and a row,
/// or between rows, is retained.
pub fn orphaned_assets(
    previous: &TierListData,
    next: &TierListData,
    resolver: &AssetUrlResolver,
) -> OrphanedAssets {
    let retained: HashSet<&str> = next.sources().collect();
    let mut seen = HashSet::new();
    let mut orphans = OrphanedAssets::default();

    for src in previous.sources() {
        if retained.contains(src) || !seen.insert(src) {
            continue;
        }
        match resolver.public_id(src) {
            Ok(public_id) => {
                orphans.public_ids.insert(public_id);
            }
            Err(err) => orphans.unresolved.push((src.to_string(), err)),
        }
    }

    orphans
}
