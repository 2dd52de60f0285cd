use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::path::{MaterializedPath, PathId};
use crate::types::comment_id::CommentId;

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub parent_id: Option<CommentId>,
    pub path_id: PathId,
    #[serde(skip)]
    pub path: MaterializedPath,
    #[serde(rename = "comment")]
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub children: Vec<Comment>,
}

/// Insert payload; the id is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub parent_id: Option<CommentId>,
    pub path_id: PathId,
    pub path: MaterializedPath,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl NewComment {
    pub fn into_comment(self, id: CommentId) -> Comment {
        Comment {
            id,
            parent_id: self.parent_id,
            path_id: self.path_id,
            path: self.path,
            text: self.text,
            created_at: self.created_at,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<CommentId>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeletedTree {
    pub id: CommentId,
    pub removed: u64,
}
