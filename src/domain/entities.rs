//! Tier list entities and the read models handed to callers.
//!
//! `TierListRecord` is the full row including its owner. Every read model
//! returned from the cached paths omits the owner so it cannot be observed
//! through them.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::domain::payload::{PayloadError, TierListData};

/// Thumbnail stored when a board is created without one.
pub const PLACEHOLDER_THUMBNAIL: &str = "dummy";

pub const UNTITLED_PREFIX: &str = "Untitled - ";

/// Title given to a board created without one, stamped `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn untitled_title(at: OffsetDateTime) -> String {
    let utc = at.to_offset(UtcOffset::UTC);
    format!(
        "{UNTITLED_PREFIX}{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second()
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierListRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    /// Board document exactly as persisted.
    pub data: JsonValue,
    pub is_public: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TierListRecord {
    pub fn payload(&self) -> Result<TierListData, PayloadError> {
        TierListData::from_json(&self.data)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// A tier list as seen by callers; carries no owner reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierList {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    pub data: JsonValue,
    pub is_public: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<TierListRecord> for TierList {
    fn from(record: TierListRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            thumbnail: record.thumbnail,
            data: record.data,
            is_public: record.is_public,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Listing row for an owner's boards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierListSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    pub is_public: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: Uuid,
    pub username: String,
}

/// Entry of the public "recent" listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTierList {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub creator: Creator,
}
