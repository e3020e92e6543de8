//! Cursor pagination for owner listings.
//!
//! Cursors are opaque URL-safe tokens carrying the `(created_at, id)` of the
//! last row returned, so rows inserted mid-pagination never shift a page.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct TierListCursorPayload {
    created_at: OffsetDateTime,
    id: Uuid,
}

/// Position after the last tier list of a page, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierListCursor {
    created_at: OffsetDateTime,
    id: Uuid,
}

impl TierListCursor {
    pub fn new(created_at: OffsetDateTime, id: Uuid) -> Self {
        Self { created_at, id }
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        let payload = TierListCursorPayload {
            created_at: self.created_at,
            id: self.id,
        };
        let serialized = serde_json::to_vec(&payload)
            .expect("serializing tier list cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: TierListCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            created_at: payload.created_at,
            id: payload.id,
        })
    }

    /// Whether a row at `(created_at, id)` sorts strictly after this cursor
    /// in newest-first order.
    pub fn precedes(&self, created_at: OffsetDateTime, id: Uuid) -> bool {
        (created_at, id) < (self.created_at, self.id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}
