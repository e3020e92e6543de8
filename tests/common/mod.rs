#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use uuid::Uuid;

use tierlist::application::janitor::{AssetJanitor, JanitorConfig};
use tierlist::application::pagination::{CursorPage, PageRequest, TierListCursor};
use tierlist::application::repos::{
    AssetStore, AssetStoreError, CreateTierListParams, RepoError, TierListsRepo,
    UpdateTierListParams,
};
use tierlist::application::tier_lists::TierListService;
use tierlist::cache::{
    CacheConfig, CacheError, CacheKey, MemoryTagStore, Tag, TagStore, TaggedCache,
};
use tierlist::domain::assets::{AssetUrlResolver, PublicId};
use tierlist::domain::entities::{
    Creator, RecentTierList, TierListRecord, TierListSummary,
};
use tierlist::domain::payload::{ImageEntry, TierListData, TierRow};

pub fn image_url(name: &str) -> String {
    format!("https://res.cloudinary.com/demo/image/upload/v1700000000/boards/{name}.png")
}

pub fn public_id(name: &str) -> PublicId {
    AssetUrlResolver::default()
        .public_id(&image_url(name))
        .expect("test urls resolve")
}

/// Board with `sidebar` images and one row per entry of `rows`.
pub fn board(sidebar: &[&str], rows: &[&[&str]]) -> TierListData {
    TierListData {
        sidebar: sidebar.iter().map(|name| ImageEntry::new(image_url(name))).collect(),
        rows: rows
            .iter()
            .map(|items| {
                TierRow::new(items.iter().map(|name| ImageEntry::new(image_url(name))).collect())
            })
            .collect(),
    }
}

/// In-memory system of record with a users table and read counters.
#[derive(Default)]
pub struct FakeRepo {
    rows: Mutex<HashMap<Uuid, TierListRecord>>,
    usernames: Mutex<HashMap<Uuid, String>>,
    clock: AtomicUsize,
    pub find_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub recent_calls: AtomicUsize,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.usernames
            .lock()
            .expect("users lock")
            .insert(id, username.to_string());
        id
    }

    pub fn record(&self, id: Uuid) -> Option<TierListRecord> {
        self.rows.lock().expect("rows lock").get(&id).cloned()
    }

    /// Overwrite the stored document, bypassing validation.
    pub fn corrupt_payload(&self, id: Uuid, data: JsonValue) {
        if let Some(record) = self.rows.lock().expect("rows lock").get_mut(&id) {
            record.data = data;
        }
    }

    /// Strictly increasing timestamps so recency order is deterministic.
    fn tick(&self) -> OffsetDateTime {
        let step = self.clock.fetch_add(1, Ordering::SeqCst) as i64;
        OffsetDateTime::from_unix_timestamp(1_700_000_000 + step).expect("valid timestamp")
    }
}

#[async_trait]
impl TierListsRepo for FakeRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TierListRecord>, RepoError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.record(id))
    }

    async fn list_for_owner(
        &self,
        user_id: Uuid,
        page: PageRequest<TierListCursor>,
    ) -> Result<CursorPage<TierListSummary>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let mut owned: Vec<TierListRecord> = self
            .rows
            .lock()
            .expect("rows lock")
            .values()
            .filter(|record| record.user_id == user_id)
            .filter(|record| {
                page.cursor
                    .is_none_or(|cursor| cursor.precedes(record.created_at, record.id))
            })
            .cloned()
            .collect();
        owned.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let limit = page.limit as usize;
        let next_cursor = if owned.len() > limit {
            owned.truncate(limit);
            owned
                .last()
                .map(|last| TierListCursor::new(last.created_at, last.id).encode())
        } else {
            None
        };

        let items = owned
            .into_iter()
            .map(|record| TierListSummary {
                id: record.id,
                title: record.title,
                description: record.description,
                thumbnail: record.thumbnail,
                is_public: record.is_public,
                created_at: record.created_at,
                updated_at: record.updated_at,
            })
            .collect();

        Ok(CursorPage::new(items, next_cursor))
    }

    async fn list_recent_public(&self, limit: u32) -> Result<Vec<RecentTierList>, RepoError> {
        self.recent_calls.fetch_add(1, Ordering::SeqCst);

        let usernames = self.usernames.lock().expect("users lock").clone();
        let mut public: Vec<TierListRecord> = self
            .rows
            .lock()
            .expect("rows lock")
            .values()
            .filter(|record| record.is_public)
            .cloned()
            .collect();
        public.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

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
                    username: usernames
                        .get(&record.user_id)
                        .cloned()
                        .unwrap_or_default(),
                },
            })
            .collect())
    }

    async fn create_tier_list(
        &self,
        params: CreateTierListParams,
    ) -> Result<TierListRecord, RepoError> {
        if !self
            .usernames
            .lock()
            .expect("users lock")
            .contains_key(&params.user_id)
        {
            return Err(RepoError::InvalidInput {
                message: "unknown user".to_string(),
            });
        }

        let now = self.tick();
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
        self.rows
            .lock()
            .expect("rows lock")
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_tier_list(
        &self,
        params: UpdateTierListParams,
    ) -> Result<TierListRecord, RepoError> {
        let now = self.tick();
        let mut rows = self.rows.lock().expect("rows lock");
        let record = rows.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        record.title = params.title;
        record.description = params.description;
        record.thumbnail = params.thumbnail;
        record.data = params.data;
        record.is_public = params.is_public;
        record.updated_at = now;
        Ok(record.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    Forget { tag: String, key: String },
    Flush { tag: String },
}

/// Tag store that records invalidations before delegating to memory.
#[derive(Default)]
pub struct RecordingTagStore {
    pub inner: MemoryTagStore,
    ops: Mutex<Vec<CacheOp>>,
}

impl RecordingTagStore {
    pub fn ops(&self) -> Vec<CacheOp> {
        self.ops.lock().expect("ops lock").clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().expect("ops lock").clear();
    }

    pub fn forgot(&self, tag: &str, key: &str) -> bool {
        self.ops().contains(&CacheOp::Forget {
            tag: tag.to_string(),
            key: key.to_string(),
        })
    }

    pub fn flushed(&self, tag: &str) -> bool {
        self.ops().contains(&CacheOp::Flush {
            tag: tag.to_string(),
        })
    }
}

#[async_trait]
impl TagStore for RecordingTagStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<JsonValue>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, tags: &[Tag], key: CacheKey, value: JsonValue) -> Result<(), CacheError> {
        self.inner.put(tags, key, value).await
    }

    async fn forget(&self, tag: &Tag, key: &CacheKey) -> Result<bool, CacheError> {
        self.ops.lock().expect("ops lock").push(CacheOp::Forget {
            tag: tag.to_string(),
            key: key.to_string(),
        });
        self.inner.forget(tag, key).await
    }

    async fn flush(&self, tag: &Tag) -> Result<usize, CacheError> {
        self.ops.lock().expect("ops lock").push(CacheOp::Flush {
            tag: tag.to_string(),
        });
        self.inner.flush(tag).await
    }
}

/// Asset store that records every destroy call.
#[derive(Default)]
pub struct RecordingAssetStore {
    destroyed: Mutex<Vec<PublicId>>,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl RecordingAssetStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn destroyed(&self) -> Vec<PublicId> {
        let mut destroyed = self.destroyed.lock().expect("destroyed lock").clone();
        destroyed.sort();
        destroyed
    }
}

#[async_trait]
impl AssetStore for RecordingAssetStore {
    async fn destroy(&self, public_id: &PublicId) -> Result<(), AssetStoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.destroyed
            .lock()
            .expect("destroyed lock")
            .push(public_id.clone());
        if self.fail {
            return Err(AssetStoreError::Rejected {
                public_id: public_id.to_string(),
                reason: "not found".to_string(),
            });
        }
        Ok(())
    }
}

pub struct Harness {
    pub repo: Arc<FakeRepo>,
    pub tags: Arc<RecordingTagStore>,
    pub assets: Arc<RecordingAssetStore>,
    pub service: TierListService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_assets(RecordingAssetStore::default())
    }

    pub fn with_assets(assets: RecordingAssetStore) -> Self {
        let repo = Arc::new(FakeRepo::new());
        let tags = Arc::new(RecordingTagStore::default());
        let assets = Arc::new(assets);

        let cache = TaggedCache::new(CacheConfig::default(), tags.clone());
        let janitor = AssetJanitor::new(
            assets.clone(),
            JanitorConfig {
                concurrency: 2,
                timeout: Duration::from_millis(200),
            },
        );
        let service = TierListService::new(
            repo.clone(),
            cache,
            janitor,
            AssetUrlResolver::default(),
        );

        Self {
            repo,
            tags,
            assets,
            service,
        }
    }
}
