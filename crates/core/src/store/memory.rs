use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CommentStore, StoreError};
use crate::domain::comments::{Comment, NewComment};
use crate::path::MaterializedPath;
use crate::types::comment_id::CommentId;
use crate::types::page::{SortBy, SortOrder};

/// In-process store used when no database is configured, and by tests.
#[derive(Debug, Default)]
pub struct MemoryCommentStore {
    inner: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    rows: BTreeMap<CommentId, Comment>,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert(&self, comment: NewComment) -> Result<CommentId, StoreError> {
        let mut state = self.inner.write().await;
        if let Some(parent_id) = comment.parent_id {
            if !state.rows.contains_key(&parent_id) {
                return Err(StoreError::ParentNotFound(parent_id));
            }
        }
        if state.rows.values().any(|row| row.path == comment.path) {
            return Err(StoreError::Backend(format!(
                "duplicate path {}",
                comment.path
            )));
        }
        state.last_id += 1;
        let id = CommentId::new(state.last_id).map_err(|err| StoreError::Backend(err.to_string()))?;
        state.rows.insert(id, comment.into_comment(id));
        Ok(id)
    }

    async fn get_path(&self, id: CommentId) -> Result<MaterializedPath, StoreError> {
        let state = self.inner.read().await;
        state
            .rows
            .get(&id)
            .map(|row| row.path.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn get_by_id(&self, id: CommentId) -> Result<Comment, StoreError> {
        let state = self.inner.read().await;
        state.rows.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn get_by_path_prefix(
        &self,
        prefix: &MaterializedPath,
    ) -> Result<Vec<Comment>, StoreError> {
        let state = self.inner.read().await;
        let mut rows: Vec<Comment> = state
            .rows
            .values()
            .filter(|row| row.path.as_str().starts_with(prefix.as_str()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn delete_by_path_prefix(&self, prefix: &MaterializedPath) -> Result<u64, StoreError> {
        let mut state = self.inner.write().await;
        let before = state.rows.len();
        state
            .rows
            .retain(|_, row| !row.path.as_str().starts_with(prefix.as_str()));
        Ok((before - state.rows.len()) as u64)
    }

    async fn count_top_level(&self) -> Result<i64, StoreError> {
        let state = self.inner.read().await;
        Ok(state.rows.values().filter(|row| row.parent_id.is_none()).count() as i64)
    }

    async fn get_top_level_page(
        &self,
        limit: i64,
        offset: i64,
        sort_by: SortBy,
        sort_order: SortOrder,
    ) -> Result<Vec<Comment>, StoreError> {
        let state = self.inner.read().await;
        let mut roots: Vec<&Comment> = state
            .rows
            .values()
            .filter(|row| row.parent_id.is_none())
            .collect();
        roots.sort_by(|a, b| {
            let ordering = match sort_by {
                SortBy::Id => a.id.cmp(&b.id),
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
            };
            apply_order(ordering, sort_order)
        });
        Ok(roots
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn search_text(&self, needle: &str, limit: usize) -> Result<Vec<Comment>, StoreError> {
        let needle = needle.to_lowercase();
        let state = self.inner.read().await;
        let mut hits: Vec<&Comment> = state
            .rows
            .values()
            .filter(|row| row.text.to_lowercase().contains(&needle))
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(hits.into_iter().take(limit).cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

fn apply_order(ordering: Ordering, sort_order: SortOrder) -> Ordering {
    match sort_order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}
