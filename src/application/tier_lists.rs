//! Tier list reads and writes, fronted by the tagged cache.
//!
//! Reads go through [`TaggedCache::get_or_compute`]. Writes commit to the
//! repository first, then invalidate before returning, so the caller reads
//! its own write:
//!
//! | operation | flushed tag | forgotten keys (under the umbrella tag) |
//! |-----------|-------------|-----------------------------------------|
//! | `store`   | owner       | `RECENT` when created public            |
//! | `update`  | owner       | board id; `RECENT` when public before or after |
//!
//! After an update that replaced the payload, images no longer on the board
//! are handed to the [`AssetJanitor`].

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::janitor::AssetJanitor;
use crate::application::orphans::orphaned_assets;
use crate::application::pagination::{
    CursorPage, DEFAULT_PAGE_SIZE, PageRequest, PaginationError, TierListCursor,
};
use crate::application::repos::{
    CreateTierListParams, RepoError, TierListsRepo, UpdateTierListParams,
};
use crate::cache::{CacheKey, Tag, TaggedCache};
use crate::domain::assets::AssetUrlResolver;
use crate::domain::entities::{
    PLACEHOLDER_THUMBNAIL, RecentTierList, TierList, TierListRecord, TierListSummary,
    untitled_title,
};
use crate::domain::payload::{PayloadError, TierListData};

/// Size of the public "recent" listing.
pub const RECENT_LIMIT: u32 = 4;

#[derive(Debug, Error)]
pub enum TierListError {
    #[error("tier list `{0}` not found")]
    NotFound(Uuid),
    #[error("tier list `{0}` belongs to another user")]
    Forbidden(Uuid),
    #[error(transparent)]
    InvalidCursor(#[from] PaginationError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Fields for a new board. Missing fields take their defaults.
#[derive(Debug, Clone, Default)]
pub struct NewTierList {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub data: TierListData,
    pub is_public: bool,
}

/// Field changes for an existing board; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct TierListChanges {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub thumbnail: Option<String>,
    pub data: Option<TierListData>,
    pub is_public: Option<bool>,
}

#[derive(Clone)]
pub struct TierListService {
    repo: Arc<dyn TierListsRepo>,
    cache: TaggedCache,
    janitor: AssetJanitor,
    resolver: AssetUrlResolver,
    page_size: u32,
}

impl TierListService {
    pub fn new(
        repo: Arc<dyn TierListsRepo>,
        cache: TaggedCache,
        janitor: AssetJanitor,
        resolver: AssetUrlResolver,
    ) -> Self {
        Self {
            repo,
            cache,
            janitor,
            resolver,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn janitor(&self) -> &AssetJanitor {
        &self.janitor
    }

    pub async fn get_or_fail(&self, id: Uuid) -> Result<TierList, TierListError> {
        self.cache
            .get_or_compute(&[Tag::umbrella()], CacheKey::tier_list(id), || async move {
                self.repo
                    .find_by_id(id)
                    .await?
                    .map(TierList::from)
                    .ok_or(TierListError::NotFound(id))
            })
            .await
    }

    /// Full record for a mutation by `owner`. Always read from the repository.
    pub async fn get_owned(&self, id: Uuid, owner: Uuid) -> Result<TierListRecord, TierListError> {
        let record = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(TierListError::NotFound(id))?;

        if !record.is_owned_by(owner) {
            return Err(TierListError::Forbidden(id));
        }

        Ok(record)
    }

    pub async fn list_for_owner(
        &self,
        owner: Uuid,
        cursor: Option<&str>,
    ) -> Result<CursorPage<TierListSummary>, TierListError> {
        let decoded = cursor.map(TierListCursor::decode).transpose()?;
        let page = PageRequest::new(self.page_size, decoded);

        self.cache
            .get_or_compute(
                &[Tag::umbrella(), Tag::owner(owner)],
                CacheKey::owner_page(owner, cursor),
                || async move {
                    Ok::<_, TierListError>(self.repo.list_for_owner(owner, page).await?)
                },
            )
            .await
    }

    /// Newest public boards with their creators.
    pub async fn recent(&self) -> Result<Vec<RecentTierList>, TierListError> {
        self.cache
            .get_or_compute(&[Tag::umbrella()], CacheKey::recent(), || async move {
                let mut recent = self.repo.list_recent_public(RECENT_LIMIT).await?;
                recent.truncate(RECENT_LIMIT as usize);
                Ok::<_, TierListError>(recent)
            })
            .await
    }

    pub async fn store(&self, owner: Uuid, new: NewTierList) -> Result<TierList, TierListError> {
        new.data.validate()?;

        let params = CreateTierListParams {
            user_id: owner,
            title: new
                .title
                .unwrap_or_else(|| untitled_title(OffsetDateTime::now_utc())),
            description: new.description,
            thumbnail: new
                .thumbnail
                .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
            data: new.data.to_json()?,
            is_public: new.is_public,
        };

        let record = self.repo.create_tier_list(params).await?;

        let flushed = self.cache.flush_tag(&Tag::owner(owner)).await;
        if record.is_public {
            self.cache
                .forget_key(&Tag::umbrella(), &CacheKey::recent())
                .await;
        }

        info!(
            tier_list_id = %record.id,
            is_public = record.is_public,
            flushed,
            "tier list created"
        );

        Ok(record.into())
    }

    /// Apply `changes` to `current`, which the caller has already checked is
    /// owned by the acting user.
    pub async fn update(
        &self,
        current: &TierListRecord,
        changes: TierListChanges,
    ) -> Result<TierList, TierListError> {
        let next_data = match changes.data.as_ref() {
            Some(data) => {
                data.validate()?;
                Some(data.to_json()?)
            }
            None => None,
        };

        let params = UpdateTierListParams {
            id: current.id,
            title: changes.title.unwrap_or_else(|| current.title.clone()),
            description: changes
                .description
                .unwrap_or_else(|| current.description.clone()),
            thumbnail: changes.thumbnail.unwrap_or_else(|| current.thumbnail.clone()),
            data: next_data.unwrap_or_else(|| current.data.clone()),
            is_public: changes.is_public.unwrap_or(current.is_public),
        };

        let updated = self.repo.update_tier_list(params).await?;

        let flushed = self.cache.flush_tag(&Tag::owner(current.user_id)).await;
        self.cache
            .forget_key(&Tag::umbrella(), &CacheKey::tier_list(current.id))
            .await;
        let touches_recent = current.is_public || updated.is_public;
        if touches_recent {
            self.cache
                .forget_key(&Tag::umbrella(), &CacheKey::recent())
                .await;
        }

        info!(
            tier_list_id = %updated.id,
            is_public = updated.is_public,
            flushed,
            touches_recent,
            "tier list updated"
        );

        if let Some(next) = changes.data.as_ref() {
            self.reclaim_dropped_images(current, next);
        }

        Ok(updated.into())
    }

    fn reclaim_dropped_images(&self, current: &TierListRecord, next: &TierListData) {
        let previous = match current.payload() {
            Ok(previous) => previous,
            Err(err) => {
                warn!(
                    tier_list_id = %current.id,
                    error = %err,
                    "stored payload is malformed; skipping image cleanup"
                );
                return;
            }
        };

        let orphans = orphaned_assets(&previous, next, &self.resolver);
        if orphans.is_empty() {
            return;
        }

        debug!(
            tier_list_id = %current.id,
            orphaned = orphans.public_ids.len(),
            unresolved = orphans.unresolved.len(),
            "images dropped from board"
        );
        self.janitor.dispatch(current.id, orphans);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::cache::CacheConfig;
    use crate::domain::entities::{Creator, UNTITLED_PREFIX};
    use crate::domain::payload::{ImageEntry, TierRow};

    #[derive(Default)]
    struct MemoryRepo {
        rows: Mutex<HashMap<Uuid, TierListRecord>>,
        reads: Mutex<usize>,
    }

    impl MemoryRepo {
        fn reads(&self) -> usize {
            *self.reads.lock().expect("reads lock")
        }

        fn insert(&self, record: TierListRecord) {
            self.rows
                .lock()
                .expect("rows lock")
                .insert(record.id, record);
        }
    }

    #[async_trait]
    impl TierListsRepo for MemoryRepo {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<TierListRecord>, RepoError> {
            *self.reads.lock().expect("reads lock") += 1;
            Ok(self.rows.lock().expect("rows lock").get(&id).cloned())
        }

        async fn list_for_owner(
            &self,
            user_id: Uuid,
            _page: PageRequest<TierListCursor>,
        ) -> Result<CursorPage<TierListSummary>, RepoError> {
            *self.reads.lock().expect("reads lock") += 1;
            let items = self
                .rows
                .lock()
                .expect("rows lock")
                .values()
                .filter(|record| record.user_id == user_id)
                .map(|record| TierListSummary {
                    id: record.id,
                    title: record.title.clone(),
                    description: record.description.clone(),
                    thumbnail: record.thumbnail.clone(),
                    is_public: record.is_public,
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                })
                .collect();
            Ok(CursorPage::new(items, None))
        }

        async fn list_recent_public(&self, limit: u32) -> Result<Vec<RecentTierList>, RepoError> {
            *self.reads.lock().expect("reads lock") += 1;
            let mut public: Vec<_> = self
                .rows
                .lock()
                .expect("rows lock")
                .values()
                .filter(|record| record.is_public)
                .cloned()
                .collect();
            public.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(public
                .into_iter()
                .take(limit as usize)
                .map(|record| RecentTierList {
                    id: record.id,
                    title: record.title,
                    description: record.description,
                    thumbnail: record.thumbnail,
                    created_at: record.created_at,
                    creator: Creator {
                        id: record.user_id,
                        username: "someone".to_string(),
                    },
                })
                .collect())
        }

        async fn create_tier_list(
            &self,
            params: CreateTierListParams,
        ) -> Result<TierListRecord, RepoError> {
            let now = OffsetDateTime::now_utc();
            let record = TierListRecord {
                id: Uuid::new_v4(),
                user_id: params.user_id,
                title: params.title,
                description: params.description,
                thumbnail: params.thumbnail,
                data: params.data,
                is_public: params.is_public,
                created_at: now,
                updated_at: now,
            };
            self.insert(record.clone());
            Ok(record)
        }

        async fn update_tier_list(
            &self,
            params: UpdateTierListParams,
        ) -> Result<TierListRecord, RepoError> {
            let mut rows = self.rows.lock().expect("rows lock");
            let record = rows.get_mut(&params.id).ok_or(RepoError::NotFound)?;
            record.title = params.title;
            record.description = params.description;
            record.thumbnail = params.thumbnail;
            record.data = params.data;
            record.is_public = params.is_public;
            record.updated_at = OffsetDateTime::now_utc();
            Ok(record.clone())
        }
    }

    fn service(repo: Arc<MemoryRepo>) -> TierListService {
        TierListService::new(
            repo,
            TaggedCache::in_memory(CacheConfig::default()),
            AssetJanitor::disabled(),
            AssetUrlResolver::default(),
        )
    }

    fn board(srcs: &[&str]) -> TierListData {
        TierListData {
            sidebar: Vec::new(),
            rows: vec![TierRow::new(
                srcs.iter().map(|src| ImageEntry::new(*src)).collect(),
            )],
        }
    }

    #[tokio::test]
    async fn store_applies_defaults() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo);

        let created = service
            .store(Uuid::new_v4(), NewTierList::default())
            .await
            .expect("stored");

        assert!(created.title.starts_with(UNTITLED_PREFIX));
        assert_eq!(created.thumbnail, PLACEHOLDER_THUMBNAIL);
        assert_eq!(created.description, None);
        assert!(!created.is_public);
    }

    #[tokio::test]
    async fn store_rejects_empty_sources() {
        let service = service(Arc::new(MemoryRepo::default()));

        let result = service
            .store(
                Uuid::new_v4(),
                NewTierList {
                    data: board(&[""]),
                    ..NewTierList::default()
                },
            )
            .await;

        assert!(matches!(result, Err(TierListError::Payload(_))));
    }

    #[tokio::test]
    async fn missing_board_is_not_found_and_not_cached() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo.clone());
        let id = Uuid::new_v4();

        for _ in 0..2 {
            assert!(matches!(
                service.get_or_fail(id).await,
                Err(TierListError::NotFound(missing)) if missing == id
            ));
        }
        assert_eq!(repo.reads(), 2);
    }

    #[tokio::test]
    async fn get_or_fail_reads_through_cache() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo.clone());
        let created = service
            .store(Uuid::new_v4(), NewTierList::default())
            .await
            .expect("stored");

        let first = service.get_or_fail(created.id).await.expect("found");
        let second = service.get_or_fail(created.id).await.expect("cached");

        assert_eq!(first, second);
        assert_eq!(repo.reads(), 1);
    }

    #[tokio::test]
    async fn update_is_visible_to_next_read() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo.clone());
        let owner = Uuid::new_v4();
        let created = service
            .store(owner, NewTierList::default())
            .await
            .expect("stored");
        let _ = service.get_or_fail(created.id).await.expect("warm");
        let _ = service.list_for_owner(owner, None).await.expect("warm");

        let record = service.get_owned(created.id, owner).await.expect("owned");
        service
            .update(
                &record,
                TierListChanges {
                    title: Some("Renamed".to_string()),
                    ..TierListChanges::default()
                },
            )
            .await
            .expect("updated");

        assert_eq!(
            service.get_or_fail(created.id).await.expect("found").title,
            "Renamed"
        );
        let page = service.list_for_owner(owner, None).await.expect("listed");
        assert_eq!(page.items[0].title, "Renamed");
    }

    #[tokio::test]
    async fn get_owned_rejects_other_users() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo);
        let created = service
            .store(Uuid::new_v4(), NewTierList::default())
            .await
            .expect("stored");

        assert!(matches!(
            service.get_owned(created.id, Uuid::new_v4()).await,
            Err(TierListError::Forbidden(_))
        ));
        assert!(matches!(
            service.get_owned(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(TierListError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_cursor_is_rejected() {
        let service = service(Arc::new(MemoryRepo::default()));

        assert!(matches!(
            service.list_for_owner(Uuid::new_v4(), Some("%%%")).await,
            Err(TierListError::InvalidCursor(_))
        ));
    }

    #[tokio::test]
    async fn update_with_malformed_stored_payload_still_succeeds() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo.clone());
        let owner = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let record = TierListRecord {
            id: Uuid::new_v4(),
            user_id: owner,
            title: "Legacy".to_string(),
            description: None,
            thumbnail: PLACEHOLDER_THUMBNAIL.to_string(),
            data: json!({ "rows": 3 }),
            is_public: false,
            created_at: now,
            updated_at: now,
        };
        repo.insert(record.clone());

        let updated = service
            .update(
                &record,
                TierListChanges {
                    data: Some(board(&["https://res.cloudinary.com/d/image/upload/v1/a.png"])),
                    ..TierListChanges::default()
                },
            )
            .await
            .expect("updated");

        assert_eq!(
            updated.data["rows"][0]["items"][0]["src"],
            json!("https://res.cloudinary.com/d/image/upload/v1/a.png")
        );
    }
}
