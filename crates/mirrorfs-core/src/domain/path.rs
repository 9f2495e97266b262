//! Pre-parsed store paths
//!
//! A [`StorePath`] is parsed from its string form exactly once and carried
//! through the call chain as a sequence of segments, so tree operations
//! compare segment identity instead of re-splitting strings at every level.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An absolute path inside the mirrored namespace, held as parsed segments.
///
/// The root path has no segments and renders as `/`. Empty segments
/// (doubled or trailing slashes) are dropped during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root path `/`.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses a slash-separated path. Leading, trailing, and doubled
    /// slashes are tolerated; relative input is treated as rooted.
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final path component, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The parent path; the root is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Appends one segment.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for StorePath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root() {
        let p = StorePath::parse("/");
        assert!(p.is_root());
        assert_eq!(p.to_string(), "/");
        assert_eq!(p.file_name(), None);
    }

    #[test]
    fn parses_nested_path() {
        let p = StorePath::parse("/a/b/c.txt");
        assert_eq!(p.segments(), &["a", "b", "c.txt"]);
        assert_eq!(p.file_name(), Some("c.txt"));
        assert_eq!(p.depth(), 3);
    }

    #[test]
    fn tolerates_doubled_and_trailing_slashes() {
        let p = StorePath::parse("//a//b/");
        assert_eq!(p.segments(), &["a", "b"]);
        assert_eq!(p.to_string(), "/a/b");
    }

    #[test]
    fn parent_of_root_is_root() {
        assert!(StorePath::root().parent().is_root());
    }

    #[test]
    fn parent_drops_last_segment() {
        let p = StorePath::parse("/a/b");
        assert_eq!(p.parent().to_string(), "/a");
    }

    #[test]
    fn join_appends_segment() {
        let p = StorePath::parse("/a").join("b");
        assert_eq!(p.to_string(), "/a/b");
    }

    #[test]
    fn display_round_trips() {
        for raw in ["/", "/a", "/a/b/c"] {
            let p = StorePath::parse(raw);
            assert_eq!(p.to_string(), raw);
        }
    }
}
