use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::comments::{Comment, CommentPage, DeletedTree, NewComment};
use crate::error::CoreError;
use crate::path::{MaterializedPath, PathId};
use crate::store::{CommentStore, StoreError};
use crate::tree;
use crate::types::comment_id::CommentId;
use crate::types::page::PageRequest;

/// Hard ceiling on search results, whatever the configuration asks for.
pub const MAX_SEARCH_RESULTS: usize = 50;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Shorter search queries return no results.
    pub min_query_chars: usize,
    pub max_search_results: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            min_query_chars: 3,
            max_search_results: MAX_SEARCH_RESULTS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Invalid(#[from] CoreError),
    #[error("comment {0} not found")]
    NotFound(CommentId),
    #[error("parent comment {0} not found")]
    ParentNotFound(CommentId),
    #[error(transparent)]
    Storage(StoreError),
}

/// Caller-facing outcome classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Internal,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Invalid(_) | ServiceError::ParentNotFound(_) => ErrorKind::BadInput,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::ParentNotFound(id) => ServiceError::ParentNotFound(id),
            other => ServiceError::Storage(other),
        }
    }
}

pub struct CommentService {
    store: Arc<dyn CommentStore>,
    config: ServiceConfig,
}

impl CommentService {
    pub fn new(store: Arc<dyn CommentStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn create_comment(
        &self,
        parent_id: Option<i64>,
        text: String,
    ) -> Result<Comment, ServiceError> {
        if text.trim().is_empty() {
            return Err(CoreError::EmptyText.into());
        }
        let parent_id = match parent_id {
            Some(raw) if raw < 0 => return Err(CoreError::NegativeParentId(raw).into()),
            Some(raw) => Some(CommentId::new(raw)?),
            None => None,
        };

        let parent_path = match parent_id {
            Some(id) => Some(self.store.get_path(id).await.map_err(|err| match err {
                StoreError::NotFound(id) => {
                    warn!(parent_id = %id, "parent comment not found on create");
                    ServiceError::ParentNotFound(id)
                }
                other => storage_failure("get parent path", other),
            })?),
            None => None,
        };

        let path_id = PathId::generate();
        let path = MaterializedPath::encode(parent_path.as_ref(), &path_id);
        let new_comment = NewComment {
            parent_id,
            path_id,
            path,
            text,
            created_at: Utc::now(),
        };
        let id = self
            .store
            .insert(new_comment.clone())
            .await
            .map_err(|err| storage_failure("insert comment", err))?;
        info!(id = %id, parent_id = ?parent_id.map(CommentId::get), "comment created");
        Ok(new_comment.into_comment(id))
    }

    pub async fn get_comment_tree(&self, id: CommentId) -> Result<Comment, ServiceError> {
        debug!(id = %id, "loading comment tree");
        let root = self
            .store
            .get_by_id(id)
            .await
            .map_err(|err| storage_failure("get root comment", err))?;
        let records = self
            .store
            .get_by_path_prefix(&root.path)
            .await
            .map_err(|err| storage_failure("get subtree", err))?;
        debug!(id = %id, count = records.len(), "loaded subtree records");
        Ok(tree::assemble(root, records))
    }

    pub async fn delete_comment_tree(&self, id: CommentId) -> Result<DeletedTree, ServiceError> {
        debug!(id = %id, "deleting comment tree");
        let root = self
            .store
            .get_by_id(id)
            .await
            .map_err(|err| storage_failure("get root comment", err))?;
        let removed = self
            .store
            .delete_by_path_prefix(&root.path)
            .await
            .map_err(|err| storage_failure("delete subtree", err))?;
        info!(id = %id, removed, "comment tree deleted");
        Ok(DeletedTree { id, removed })
    }

    pub async fn list_top_level_trees(
        &self,
        request: PageRequest,
    ) -> Result<CommentPage, ServiceError> {
        debug!(
            page = request.page,
            limit = request.limit,
            sort_by = request.sort_by.column(),
            sort_order = request.sort_order.keyword(),
            "listing top-level trees"
        );
        let total = self
            .store
            .count_top_level()
            .await
            .map_err(|err| storage_failure("count top-level comments", err))?;
        let roots = self
            .store
            .get_top_level_page(
                request.limit,
                request.offset(),
                request.sort_by,
                request.sort_order,
            )
            .await
            .map_err(|err| storage_failure("get top-level page", err))?;

        let mut comments = Vec::with_capacity(roots.len());
        let mut skipped = Vec::new();
        for root in roots {
            match self.get_comment_tree(root.id).await {
                Ok(tree) => comments.push(tree),
                Err(err) => {
                    warn!(id = %root.id, error = %err, "skipping tree that failed to assemble");
                    skipped.push(root.id);
                }
            }
        }

        Ok(CommentPage {
            comments,
            total,
            page: request.page,
            limit: request.limit,
            skipped,
        })
    }

    pub async fn search_comments(&self, query: &str) -> Result<Vec<Comment>, ServiceError> {
        let query = query.trim();
        debug!(query = %query, "searching comments");
        if query.chars().count() < self.config.min_query_chars {
            return Ok(Vec::new());
        }
        let limit = self.config.max_search_results.min(MAX_SEARCH_RESULTS);
        self.store
            .search_text(query, limit)
            .await
            .map_err(|err| storage_failure("search comments", err))
    }
}

fn storage_failure(operation: &'static str, err: StoreError) -> ServiceError {
    match &err {
        StoreError::NotFound(_) | StoreError::ParentNotFound(_) => {}
        _ => error!(operation, error = %err, "storage operation failed"),
    }
    ServiceError::from(err)
}
