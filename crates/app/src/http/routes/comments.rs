use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use super::{ErrorBody, status_for};
use crate::state::AppState;
use comment_tree_core::domain::comments::{Comment, DeletedTree};
use comment_tree_core::error::CoreError;
use comment_tree_core::service::{ErrorKind, ServiceError};
use comment_tree_core::types::comment_id::CommentId;
use comment_tree_core::types::page::{DEFAULT_PAGE_LIMIT, PageRequest, SortBy, SortOrder};

#[derive(Debug, Deserialize)]
pub struct CreateCommentBody {
    #[serde(default)]
    pub comment: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CommentsParams {
    pub parent: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: Comment,
}

#[derive(Debug, Error)]
pub enum CommentsApiError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error(transparent)]
    InvalidId(#[from] CoreError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<JsonRejection> for CommentsApiError {
    fn from(rejection: JsonRejection) -> Self {
        CommentsApiError::InvalidBody(rejection.body_text())
    }
}

pub async fn create_comment(
    State(state): State<AppState>,
    body: Result<Json<CreateCommentBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentResponse>), CommentsApiError> {
    let Json(body) = body?;
    let comment = state
        .comments
        .create_comment(body.parent_id, body.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

/// `?parent=<id>` returns that comment's subtree; without it, a page of
/// top-level trees.
pub async fn get_comments(
    State(state): State<AppState>,
    Query(params): Query<CommentsParams>,
) -> Result<Response, CommentsApiError> {
    if let Some(raw) = params.parent.as_deref().filter(|raw| !raw.trim().is_empty()) {
        let id = CommentId::try_from(raw)?;
        let comment = state.comments.get_comment_tree(id).await?;
        return Ok(Json(CommentResponse { comment }).into_response());
    }

    let request = PageRequest::new(
        lenient_number(params.page.as_deref(), 1),
        lenient_number(params.limit.as_deref(), DEFAULT_PAGE_LIMIT),
        SortBy::from_param(params.sort_by.as_deref()),
        SortOrder::from_param(params.sort_order.as_deref()),
    );
    let page = state.comments.list_top_level_trees(request).await?;
    Ok(Json(page).into_response())
}

/// Unparseable paging values fall back to the default; `PageRequest` clamps
/// whatever survives.
fn lenient_number(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|raw| raw.trim().parse().ok()).unwrap_or(default)
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeletedTree>, CommentsApiError> {
    let id = CommentId::try_from(raw_id.as_str())?;
    let deleted = state.comments.delete_comment_tree(id).await?;
    Ok(Json(deleted))
}

impl IntoResponse for CommentsApiError {
    fn into_response(self) -> axum::response::Response {
        let kind = match &self {
            CommentsApiError::InvalidBody(_) | CommentsApiError::InvalidId(_) => ErrorKind::BadInput,
            CommentsApiError::Service(err) => err.kind(),
        };
        let message = if kind == ErrorKind::Internal {
            error!(error = %self, "comments request failed");
            "internal storage error".to_string()
        } else {
            self.to_string()
        };
        (status_for(kind), Json(ErrorBody { error: message })).into_response()
    }
}
