use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("comment text is required")]
    EmptyText,
    #[error("parent id cannot be negative: {0}")]
    NegativeParentId(i64),
    #[error("invalid comment id: {0}")]
    InvalidId(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
}
