//! Materialized paths.
//!
//! A path is the chain of `path_id` segments from the root down to a comment,
//! each terminated by [`SEPARATOR`]. A root with id `A` has path `A/`, its child
//! `B` has `A/B/`. Every descendant of a node therefore shares the node's path
//! as a string prefix, which is what subtree reads and deletes match on.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

pub const SEPARATOR: char = '/';

const LIKE_ESCAPE: char = '\\';

/// Opaque leaf segment of a path. Unrelated to the sequential comment id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(String);

impl PathId {
    pub fn generate() -> Self {
        PathId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PathId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() || value.contains(SEPARATOR) {
            return Err(CoreError::InvalidPath(value));
        }
        Ok(PathId(value))
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterializedPath(String);

impl MaterializedPath {
    /// Builds the path of a new comment: the parent's path (empty for a root)
    /// followed by the new segment and a separator.
    pub fn encode(parent: Option<&MaterializedPath>, path_id: &PathId) -> Self {
        let prefix = parent.map(MaterializedPath::as_str).unwrap_or_default();
        let mut path = String::with_capacity(prefix.len() + path_id.as_str().len() + 1);
        path.push_str(prefix);
        path.push_str(path_id.as_str());
        path.push(SEPARATOR);
        MaterializedPath(path)
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let Some(body) = value.strip_suffix(SEPARATOR) else {
            return Err(CoreError::InvalidPath(value.to_string()));
        };
        if body.is_empty() || body.split(SEPARATOR).any(str::is_empty) {
            return Err(CoreError::InvalidPath(value.to_string()));
        }
        Ok(MaterializedPath(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split_terminator(SEPARATOR)
    }

    /// Number of segments; a root has depth 1.
    pub fn depth(&self) -> usize {
        self.0.matches(SEPARATOR).count()
    }

    pub fn leaf(&self) -> &str {
        self.segments().last().unwrap_or_default()
    }

    pub fn parent(&self) -> Option<MaterializedPath> {
        let body = self.0.strip_suffix(SEPARATOR)?;
        let cut = body.rfind(SEPARATOR)?;
        Some(MaterializedPath(self.0[..=cut].to_string()))
    }

    /// True when `other` lies strictly below `self`.
    pub fn is_ancestor_of(&self, other: &MaterializedPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    pub fn is_descendant_of(&self, other: &MaterializedPath) -> bool {
        other.is_ancestor_of(self)
    }

    /// `LIKE` pattern matching this path and everything below it. Wildcards in
    /// the path itself are escaped with a backslash.
    pub fn like_pattern(&self) -> String {
        let mut pattern = escape_like(&self.0);
        pattern.push('%');
        pattern
    }
}

impl TryFrom<String> for MaterializedPath {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MaterializedPath::parse(&value)?;
        Ok(MaterializedPath(value))
    }
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(value: &str) -> PathId {
        PathId::try_from(value.to_string()).unwrap()
    }

    #[test]
    fn encode_root_and_descendants() {
        let root = MaterializedPath::encode(None, &pid("A"));
        assert_eq!(root.as_str(), "A/");
        let child = MaterializedPath::encode(Some(&root), &pid("B"));
        assert_eq!(child.as_str(), "A/B/");
        let grandchild = MaterializedPath::encode(Some(&child), &pid("C"));
        assert_eq!(grandchild.as_str(), "A/B/C/");
        assert_eq!(grandchild.depth(), 3);
        assert_eq!(grandchild.leaf(), "C");
        assert_eq!(grandchild.segments().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn child_path_extends_parent_path() {
        let parent = MaterializedPath::encode(None, &PathId::generate());
        let child_id = PathId::generate();
        let child = MaterializedPath::encode(Some(&parent), &child_id);
        assert!(child.as_str().starts_with(parent.as_str()));
        assert_eq!(child.as_str(), format!("{parent}{child_id}/"));
        assert_eq!(child.parent(), Some(parent));
    }

    #[test]
    fn generated_ids_are_distinct_and_separator_free() {
        let a = PathId::generate();
        let b = PathId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().contains(SEPARATOR));
    }

    #[test]
    fn ancestry_is_prefix_on_segment_boundaries() {
        let a = MaterializedPath::parse("A/").unwrap();
        let ab = MaterializedPath::parse("A/B/").unwrap();
        let ax = MaterializedPath::parse("AX/").unwrap();
        assert!(a.is_ancestor_of(&ab));
        assert!(ab.is_descendant_of(&a));
        assert!(!a.is_ancestor_of(&a));
        assert!(!a.is_ancestor_of(&ax));
        assert_eq!(a.parent(), None);
    }

    #[test]
    fn parse_rejects_malformed_paths() {
        assert!(MaterializedPath::parse("").is_err());
        assert!(MaterializedPath::parse("/").is_err());
        assert!(MaterializedPath::parse("A").is_err());
        assert!(MaterializedPath::parse("A//B/").is_err());
        assert!(PathId::try_from("A/B".to_string()).is_err());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let path = MaterializedPath::parse("a_b%/").unwrap();
        assert_eq!(path.like_pattern(), r"a\_b\%/%");
        assert_eq!(escape_like(r"c:\x"), r"c:\\x");
    }
}
