use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Storage-assigned identity of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(i64);

impl CommentId {
    pub fn new(value: i64) -> Result<Self, CoreError> {
        if value < 0 {
            return Err(CoreError::InvalidId(value.to_string()));
        }
        Ok(CommentId(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<&str> for CommentId {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        let parsed: i64 = trimmed
            .parse()
            .map_err(|_| CoreError::InvalidId(trimmed.to_string()))?;
        CommentId::new(parsed)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        let id = CommentId::try_from(" 42 ").unwrap();
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn reject_negative_id() {
        assert_eq!(
            CommentId::try_from("-1"),
            Err(CoreError::InvalidId("-1".to_string()))
        );
    }

    #[test]
    fn reject_non_numeric_id() {
        assert!(CommentId::try_from("abc").is_err());
        assert!(CommentId::try_from("").is_err());
    }
}
