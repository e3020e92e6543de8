//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{CursorPage, PageRequest, TierListCursor};
use crate::domain::assets::PublicId;
use crate::domain::entities::{RecentTierList, TierListRecord, TierListSummary};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateTierListParams {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    pub data: JsonValue,
    pub is_public: bool,
}

/// Full replacement of the mutable columns of a tier list.
#[derive(Debug, Clone)]
pub struct UpdateTierListParams {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    pub data: JsonValue,
    pub is_public: bool,
}

#[async_trait]
pub trait TierListsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TierListRecord>, RepoError>;

    /// Boards owned by `user_id`, newest first.
    async fn list_for_owner(
        &self,
        user_id: Uuid,
        page: PageRequest<TierListCursor>,
    ) -> Result<CursorPage<TierListSummary>, RepoError>;

    /// Public boards, newest first, with their creator.
    async fn list_recent_public(&self, limit: u32) -> Result<Vec<RecentTierList>, RepoError>;

    async fn create_tier_list(
        &self,
        params: CreateTierListParams,
    ) -> Result<TierListRecord, RepoError>;

    async fn update_tier_list(
        &self,
        params: UpdateTierListParams,
    ) -> Result<TierListRecord, RepoError>;
}

#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("asset store request failed: {0}")]
    Transport(String),
    #[error("asset store rejected `{public_id}`: {reason}")]
    Rejected { public_id: String, reason: String },
}

impl AssetStoreError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Remote store holding uploaded board images.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn destroy(&self, public_id: &PublicId) -> Result<(), AssetStoreError>;
}
