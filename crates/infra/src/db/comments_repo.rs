use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use thiserror::Error;
use tracing::debug;

use comment_tree_core::domain::comments::{Comment, NewComment};
use comment_tree_core::path::{MaterializedPath, PathId, escape_like};
use comment_tree_core::store::{CommentStore, StoreError};
use comment_tree_core::types::comment_id::CommentId;
use comment_tree_core::types::page::{SortBy, SortOrder};

use super::retry::{Retry, RetryPolicy, is_transient, with_retry};

#[derive(Debug, Error)]
pub enum CommentsRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("invalid row: {0}")]
    InvalidRow(String),
}

const SELECT_COLUMNS: &str = "id, parent_id, path_id, path, comment, created_at";

/// Postgres-backed [`CommentStore`].
#[derive(Debug, Clone)]
pub struct PgCommentStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PgCommentStore {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    async fn fetch_by_id(&self, id: CommentId) -> Result<Option<Comment>, CommentsRepoError> {
        let pool = &self.pool;
        let query = format!("SELECT {SELECT_COLUMNS} FROM comments WHERE id = $1");
        let query = query.as_str();
        let row = with_retry(&self.retry, "get_by_id", idempotent, || async move {
            sqlx::query(query).bind(id.get()).fetch_optional(pool).await
        })
        .await?;
        row.map(map_comment).transpose()
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn insert(&self, comment: NewComment) -> Result<CommentId, StoreError> {
        let pool = &self.pool;
        let record = &comment;
        let result = with_retry(&self.retry, "insert", non_idempotent, || async move {
            sqlx::query(
                r#"
                INSERT INTO comments (parent_id, path_id, path, comment, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(record.parent_id.map(CommentId::get))
            .bind(record.path_id.as_str())
            .bind(record.path.as_str())
            .bind(&record.text)
            .bind(record.created_at)
            .fetch_one(pool)
            .await
        })
        .await;
        let row = match result {
            Ok(row) => row,
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                let parent_id = comment
                    .parent_id
                    .ok_or_else(|| StoreError::Backend(db.to_string()))?;
                return Err(StoreError::ParentNotFound(parent_id));
            }
            Err(err) => return Err(to_store_error(CommentsRepoError::Sqlx(err))),
        };
        let id: i64 = row
            .try_get("id")
            .map_err(|err| to_store_error(err.into()))?;
        CommentId::new(id).map_err(|err| StoreError::Corrupt(err.to_string()))
    }

    async fn get_path(&self, id: CommentId) -> Result<MaterializedPath, StoreError> {
        let pool = &self.pool;
        let row = with_retry(&self.retry, "get_path", idempotent, || async move {
            sqlx::query("SELECT path FROM comments WHERE id = $1")
                .bind(id.get())
                .fetch_optional(pool)
                .await
        })
        .await
        .map_err(|err| to_store_error(err.into()))?;
        let row = row.ok_or(StoreError::NotFound(id))?;
        let path: String = row
            .try_get("path")
            .map_err(|err| to_store_error(err.into()))?;
        MaterializedPath::try_from(path).map_err(|err| StoreError::Corrupt(err.to_string()))
    }

    async fn get_by_id(&self, id: CommentId) -> Result<Comment, StoreError> {
        self.fetch_by_id(id)
            .await
            .map_err(to_store_error)?
            .ok_or(StoreError::NotFound(id))
    }

    async fn get_by_path_prefix(
        &self,
        prefix: &MaterializedPath,
    ) -> Result<Vec<Comment>, StoreError> {
        let pool = &self.pool;
        let pattern = prefix.like_pattern();
        let pattern = pattern.as_str();
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM comments WHERE path LIKE $1 ORDER BY created_at ASC, id ASC"
        );
        let query = query.as_str();
        let rows = with_retry(&self.retry, "get_by_path_prefix", idempotent, || async move {
            sqlx::query(query).bind(pattern).fetch_all(pool).await
        })
        .await
        .map_err(|err| to_store_error(err.into()))?;
        debug!(prefix = %prefix, count = rows.len(), "fetched subtree rows");
        map_comments(rows)
    }

    async fn delete_by_path_prefix(&self, prefix: &MaterializedPath) -> Result<u64, StoreError> {
        let pool = &self.pool;
        let pattern = prefix.like_pattern();
        let pattern = pattern.as_str();
        let result = with_retry(&self.retry, "delete_by_path_prefix", idempotent, || async move {
            sqlx::query("DELETE FROM comments WHERE path LIKE $1")
                .bind(pattern)
                .execute(pool)
                .await
        })
        .await
        .map_err(|err| to_store_error(err.into()))?;
        Ok(result.rows_affected())
    }

    async fn count_top_level(&self) -> Result<i64, StoreError> {
        let pool = &self.pool;
        let row = with_retry(&self.retry, "count_top_level", idempotent, || async move {
            sqlx::query("SELECT COUNT(*) AS count FROM comments WHERE parent_id IS NULL")
                .fetch_one(pool)
                .await
        })
        .await
        .map_err(|err| to_store_error(err.into()))?;
        row.try_get("count")
            .map_err(|err| to_store_error(err.into()))
    }

    async fn get_top_level_page(
        &self,
        limit: i64,
        offset: i64,
        sort_by: SortBy,
        sort_order: SortOrder,
    ) -> Result<Vec<Comment>, StoreError> {
        let pool = &self.pool;
        let query = top_level_query(sort_by, sort_order);
        let query = query.as_str();
        let rows = with_retry(&self.retry, "get_top_level_page", idempotent, || async move {
            sqlx::query(query)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
        })
        .await
        .map_err(|err| to_store_error(err.into()))?;
        map_comments(rows)
    }

    async fn search_text(&self, needle: &str, limit: usize) -> Result<Vec<Comment>, StoreError> {
        let pool = &self.pool;
        let pattern = format!("%{}%", escape_like(needle));
        let pattern = pattern.as_str();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM comments WHERE comment ILIKE $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        let query = query.as_str();
        let rows = with_retry(&self.retry, "search_text", idempotent, || async move {
            sqlx::query(query)
                .bind(pattern)
                .bind(limit)
                .fetch_all(pool)
                .await
        })
        .await
        .map_err(|err| to_store_error(err.into()))?;
        map_comments(rows)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

fn idempotent(err: &sqlx::Error) -> bool {
    is_transient(err, Retry::Idempotent)
}

fn non_idempotent(err: &sqlx::Error) -> bool {
    is_transient(err, Retry::NonIdempotent)
}

/// Sort column and direction come from closed enums, never from request text.
fn top_level_query(sort_by: SortBy, sort_order: SortOrder) -> String {
    let direction = sort_order.keyword();
    let order = match sort_by {
        SortBy::Id => format!("id {direction}"),
        SortBy::CreatedAt => format!("created_at {direction}, id {direction}"),
    };
    format!(
        "SELECT {SELECT_COLUMNS} FROM comments WHERE parent_id IS NULL ORDER BY {order} LIMIT $1 OFFSET $2"
    )
}

fn map_comments(rows: Vec<sqlx::postgres::PgRow>) -> Result<Vec<Comment>, StoreError> {
    rows.into_iter()
        .map(|row| map_comment(row).map_err(to_store_error))
        .collect()
}

fn map_comment(row: sqlx::postgres::PgRow) -> Result<Comment, CommentsRepoError> {
    let id: i64 = row.try_get("id")?;
    let parent_id: Option<i64> = row.try_get("parent_id")?;
    let path_id: String = row.try_get("path_id")?;
    let path: String = row.try_get("path")?;
    let text: String = row.try_get("comment")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let invalid = |err: comment_tree_core::error::CoreError| CommentsRepoError::InvalidRow(err.to_string());
    Ok(Comment {
        id: CommentId::new(id).map_err(invalid)?,
        parent_id: parent_id.map(CommentId::new).transpose().map_err(invalid)?,
        path_id: PathId::try_from(path_id).map_err(invalid)?,
        path: MaterializedPath::try_from(path).map_err(invalid)?,
        text,
        created_at,
        children: Vec::new(),
    })
}

fn to_store_error(err: CommentsRepoError) -> StoreError {
    match err {
        CommentsRepoError::InvalidRow(message) => StoreError::Corrupt(message),
        CommentsRepoError::Sqlx(err) => {
            if is_transient(&err, Retry::Idempotent) {
                StoreError::Unavailable(err.to_string())
            } else {
                StoreError::Backend(err.to_string())
            }
        }
    }
}
