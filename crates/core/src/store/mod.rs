pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::comments::{Comment, NewComment};
use crate::path::MaterializedPath;
use crate::types::comment_id::CommentId;
use crate::types::page::{SortBy, SortOrder};

pub use memory::MemoryCommentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("comment {0} not found")]
    NotFound(CommentId),
    #[error("parent comment {0} not found")]
    ParentNotFound(CommentId),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Backend(String),
    #[error("corrupt comment row: {0}")]
    Corrupt(String),
}

/// Persistence for comments keyed by materialized path.
///
/// Rows returned by the prefix and search queries must come back in a
/// deterministic order: subtree reads by `created_at` then `id`, search
/// results newest first.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Stores a comment and returns its assigned id. Fails with
    /// [`StoreError::ParentNotFound`] when `parent_id` no longer resolves.
    async fn insert(&self, comment: NewComment) -> Result<CommentId, StoreError>;

    async fn get_path(&self, id: CommentId) -> Result<MaterializedPath, StoreError>;

    async fn get_by_id(&self, id: CommentId) -> Result<Comment, StoreError>;

    /// Every comment whose path starts with `prefix`, the prefix owner included.
    async fn get_by_path_prefix(
        &self,
        prefix: &MaterializedPath,
    ) -> Result<Vec<Comment>, StoreError>;

    /// Removes every comment under `prefix` and returns how many went away.
    /// Matching nothing is not an error.
    async fn delete_by_path_prefix(&self, prefix: &MaterializedPath) -> Result<u64, StoreError>;

    async fn count_top_level(&self) -> Result<i64, StoreError>;

    async fn get_top_level_page(
        &self,
        limit: i64,
        offset: i64,
        sort_by: SortBy,
        sort_order: SortOrder,
    ) -> Result<Vec<Comment>, StoreError>;

    /// Case-insensitive substring match over comment text, newest first.
    async fn search_text(&self, needle: &str, limit: usize) -> Result<Vec<Comment>, StoreError>;

    /// Short backend name for health reporting.
    fn backend(&self) -> &'static str;
}
