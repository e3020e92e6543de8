use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, TierListCursor},
    application::repos::{
        CreateTierListParams, RepoError, TierListsRepo, UpdateTierListParams,
    },
    domain::entities::{Creator, RecentTierList, TierListRecord, TierListSummary},
};

use super::{PostgresRepositories, map_sqlx_error};

const TIER_LIST_COLUMNS: &str = "id, user_id, title, description, thumbnail, data, is_public, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TierListRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    thumbnail: String,
    data: JsonValue,
    is_public: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<TierListRow> for TierListRecord {
    fn from(row: TierListRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            thumbnail: row.thumbnail,
            data: row.data,
            is_public: row.is_public,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TierListSummaryRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    thumbnail: String,
    is_public: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<TierListSummaryRow> for TierListSummary {
    fn from(row: TierListSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            thumbnail: row.thumbnail,
            is_public: row.is_public,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecentTierListRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    thumbnail: String,
    created_at: OffsetDateTime,
    creator_id: Uuid,
    creator_username: String,
}

impl From<RecentTierListRow> for RecentTierList {
    fn from(row: RecentTierListRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            thumbnail: row.thumbnail,
            created_at: row.created_at,
            creator: Creator {
                id: row.creator_id,
                username: row.creator_username,
            },
        }
    }
}

#[async_trait]
impl TierListsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TierListRecord>, RepoError> {
        let row = sqlx::query_as::<_, TierListRow>(&format!(
            "SELECT {TIER_LIST_COLUMNS} FROM tier_lists WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TierListRecord::from))
    }

    async fn list_for_owner(
        &self,
        user_id: Uuid,
        page: PageRequest<TierListCursor>,
    ) -> Result<CursorPage<TierListSummary>, RepoError> {
        let limit = page.limit.clamp(1, 100) as i64;
        let mut qb = QueryBuilder::new(
            "SELECT id, title, description, thumbnail, is_public, created_at, updated_at \
             FROM tier_lists WHERE user_id = ",
        );
        qb.push_bind(user_id);

        if let Some(cursor) = page.cursor {
            qb.push(" AND (created_at, id) < (");
            qb.push_bind(cursor.created_at());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(")");
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(limit + 1);

        let mut rows = qb
            .build_query_as::<TierListSummaryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let next_cursor = if (rows.len() as i64) > limit {
            rows.truncate(limit as usize);
            rows.last()
                .map(|last| TierListCursor::new(last.created_at, last.id).encode())
        } else {
            None
        };

        let items = rows.into_iter().map(TierListSummary::from).collect();

        Ok(CursorPage::new(items, next_cursor))
    }

    async fn list_recent_public(&self, limit: u32) -> Result<Vec<RecentTierList>, RepoError> {
        let rows = sqlx::query_as::<_, RecentTierListRow>(
            r#"
            SELECT t.id, t.title, t.description, t.thumbnail, t.created_at,
                   u.id AS creator_id, u.username AS creator_username
            FROM tier_lists t
            INNER JOIN users u ON u.id = t.user_id
            WHERE t.is_public
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RecentTierList::from).collect())
    }

    async fn create_tier_list(
        &self,
        params: CreateTierListParams,
    ) -> Result<TierListRecord, RepoError> {
        let row = sqlx::query_as::<_, TierListRow>(&format!(
            "INSERT INTO tier_lists (user_id, title, description, thumbnail, data, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {TIER_LIST_COLUMNS}"
        ))
        .bind(params.user_id)
        .bind(&params.title)
        .bind(params.description.as_deref())
        .bind(&params.thumbnail)
        .bind(&params.data)
        .bind(params.is_public)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_tier_list(
        &self,
        params: UpdateTierListParams,
    ) -> Result<TierListRecord, RepoError> {
        let row = sqlx::query_as::<_, TierListRow>(&format!(
            "UPDATE tier_lists \
             SET title = $2, description = $3, thumbnail = $4, data = $5, is_public = $6, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {TIER_LIST_COLUMNS}"
        ))
        .bind(params.id)
        .bind(&params.title)
        .bind(params.description.as_deref())
        .bind(&params.thumbnail)
        .bind(&params.data)
        .bind(params.is_public)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(TierListRecord::from).ok_or(RepoError::NotFound)
    }
}
