use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use super::{ErrorBody, status_for};
use crate::state::AppState;
use comment_tree_core::domain::comments::Comment;
use comment_tree_core::service::{ErrorKind, ServiceError};

const MAX_QUERY_LEN: usize = 256;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Error)]
pub enum SearchApiError {
    #[error("query too long (max {0} chars)")]
    QueryTooLong(usize),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, SearchApiError> {
    let query_text = params.q.unwrap_or_default();
    enforce_query_length(&query_text)?;
    let comments = state.comments.search_comments(&query_text).await?;
    debug!(query_text = %query_text, hits = comments.len(), "comment search complete");
    Ok(Json(SearchResponse { comments }))
}

fn enforce_query_length(query_text: &str) -> Result<(), SearchApiError> {
    if query_text.chars().count() > MAX_QUERY_LEN {
        return Err(SearchApiError::QueryTooLong(MAX_QUERY_LEN));
    }
    Ok(())
}

impl IntoResponse for SearchApiError {
    fn into_response(self) -> axum::response::Response {
        let kind = match &self {
            SearchApiError::QueryTooLong(_) => ErrorKind::BadInput,
            SearchApiError::Service(err) => err.kind(),
        };
        let message = if kind == ErrorKind::Internal {
            error!(error = %self, "search request failed");
            "internal storage error".to_string()
        } else {
            self.to_string()
        };
        (status_for(kind), Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_QUERY_LEN, SearchApiError, enforce_query_length};

    #[test]
    fn query_length_rejects_long_text() {
        let query = "a".repeat(MAX_QUERY_LEN + 1);
        let err = enforce_query_length(&query).unwrap_err();
        assert!(matches!(err, SearchApiError::QueryTooLong(_)));
    }

    #[test]
    fn query_length_counts_chars_not_bytes() {
        let query = "é".repeat(MAX_QUERY_LEN);
        enforce_query_length(&query).unwrap();
    }
}
