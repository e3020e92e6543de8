//! Board payload: the sidebar pool plus ranked rows of images.
//!
//! The payload is persisted as a JSON document. It is parsed into these types
//! at the persistence boundary and validated on the way in. Fields the
//! builder attaches to rows or images (labels, colours, captions) are carried
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not a valid board document: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("image at {location} has an empty `src`")]
    EmptySource { location: String },
}

/// A single image placed on the board. Identity is the `src` URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub src: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ImageEntry {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierRow {
    pub items: Vec<ImageEntry>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl TierRow {
    pub fn new(items: Vec<ImageEntry>) -> Self {
        Self {
            items,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierListData {
    pub sidebar: Vec<ImageEntry>,
    pub rows: Vec<TierRow>,
}

impl TierListData {
    /// Parse a stored document and validate it.
    pub fn from_json(value: &JsonValue) -> Result<Self, PayloadError> {
        let data = Self::deserialize(value)?;
        data.validate()?;
        Ok(data)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, PayloadError> {
        let data: Self = serde_json::from_str(raw)?;
        data.validate()?;
        Ok(data)
    }

    pub fn to_json(&self) -> Result<JsonValue, PayloadError> {
        serde_json::to_value(self).map_err(PayloadError::from)
    }

    pub fn validate(&self) -> Result<(), PayloadError> {
        for (index, image) in self.sidebar.iter().enumerate() {
            if image.src.trim().is_empty() {
                return Err(PayloadError::EmptySource {
                    location: format!("sidebar[{index}]"),
                });
            }
        }

        for (row_index, row) in self.rows.iter().enumerate() {
            for (index, image) in row.items.iter().enumerate() {
                if image.src.trim().is_empty() {
                    return Err(PayloadError::EmptySource {
                        location: format!("rows[{row_index}].items[{index}]"),
                    });
                }
            }
        }

        Ok(())
    }

    /// Every image source on the board, sidebar first, then rows top to bottom.
    pub fn sources(&self) -> impl Iterator<Item = &str> + '_ {
        self.sidebar
            .iter()
            .chain(self.rows.iter().flat_map(|row| row.items.iter()))
            .map(|image| image.src.as_str())
    }
}
