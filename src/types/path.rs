//! Path-encoded ontology addresses.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Segment delimiter of an ontology path.
pub const PATH_DELIMITER: char = '\\';

/// Full path of an ontology node, e.g. `\SHRINE\Diagnoses\Neoplasms\`.
///
/// The whole ancestry of a node is embedded in its path. A valid path is at
/// least two characters long and both starts and ends with [`PATH_DELIMITER`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OntologyPath(String);

impl OntologyPath {
    /// Parse and validate a path.
    pub fn parse(s: impl Into<String>) -> Result<Self, PathError> {
        let s = s.into();
        if s.len() < 2 || !s.starts_with(PATH_DELIMITER) || !s.ends_with(PATH_DELIMITER) {
            return Err(PathError::NotDelimited(s));
        }
        Ok(Self(s))
    }

    /// Build a path from its segments, re-wrapping with delimiters.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let mut path = String::from(PATH_DELIMITER);
        for segment in segments {
            path.push_str(segment.as_ref());
            path.push(PATH_DELIMITER);
        }
        Self(path)
    }

    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ordered segments between the leading and trailing delimiter.
    pub fn segments(&self) -> Vec<&str> {
        self.0[1..self.0.len() - 1].split(PATH_DELIMITER).collect()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().len()
    }

    /// Last segment (the node's own label).
    pub fn label(&self) -> &str {
        let inner = &self.0[1..self.0.len() - 1];
        inner.rsplit(PATH_DELIMITER).next().unwrap_or(inner)
    }

    /// Strict ancestors, nearest first.
    ///
    /// Drops one trailing segment at a time until a single segment remains:
    /// `\A\B\C\` yields `\A\B\` then `\A\`. The path itself is never yielded.
    pub fn ancestors(&self) -> Vec<OntologyPath> {
        let segments = self.segments();
        (1..segments.len())
            .rev()
            .map(|keep| Self::from_segments(&segments[..keep]))
            .collect()
    }

    /// The nearest strict ancestor, if any.
    pub fn parent(&self) -> Option<OntologyPath> {
        let segments = self.segments();
        if segments.len() < 2 {
            return None;
        }
        Some(Self::from_segments(&segments[..segments.len() - 1]))
    }

    /// Whether `self` is a strict prefix of `other` on segment boundaries.
    pub fn is_strict_ancestor_of(&self, other: &OntologyPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Replace the last segment, keeping the ancestry.
    pub fn with_label(&self, label: &str) -> OntologyPath {
        let mut segments: Vec<&str> = self.segments();
        if let Some(last) = segments.last_mut() {
            *last = label;
        }
        Self::from_segments(&segments)
    }
}

impl fmt::Display for OntologyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OntologyPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for OntologyPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OntologyPath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<OntologyPath> for String {
    fn from(path: OntologyPath) -> Self {
        path.0
    }
}

/// Error when a path is not delimiter-wrapped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Path does not start and end with the delimiter.
    #[error("path must start and end with '\\': {0:?}")]
    NotDelimited(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> OntologyPath {
        OntologyPath::parse(s).unwrap()
    }

    #[test]
    fn test_rejects_undelimited() {
        assert!(OntologyPath::parse("SHRINE\\Diagnoses\\").is_err());
        assert!(OntologyPath::parse("\\SHRINE\\Diagnoses").is_err());
        assert!(OntologyPath::parse("\\").is_err());
        assert!(OntologyPath::parse("").is_err());
    }

    #[test]
    fn test_segments() {
        assert_eq!(p(r"\SHRINE\Diagnoses\Leg\").segments(), vec!["SHRINE", "Diagnoses", "Leg"]);
        assert_eq!(p(r"\A\").segments(), vec!["A"]);
        assert_eq!(p(r"\A\B\").depth(), 2);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let ancestors = p(r"\A\B\C\").ancestors();
        assert_eq!(ancestors, vec![p(r"\A\B\"), p(r"\A\")]);
        assert!(p(r"\A\").ancestors().is_empty());
    }

    #[test]
    fn test_parent_and_label() {
        assert_eq!(p(r"\A\B\C\").parent(), Some(p(r"\A\B\")));
        assert_eq!(p(r"\A\").parent(), None);
        assert_eq!(p(r"\A\B\C\").label(), "C");
    }

    #[test]
    fn test_strict_ancestor_respects_segment_boundaries() {
        assert!(p(r"\A\").is_strict_ancestor_of(&p(r"\A\B\")));
        assert!(!p(r"\A\").is_strict_ancestor_of(&p(r"\A\")));
        assert!(!p(r"\A\").is_strict_ancestor_of(&p(r"\AB\C\")));
    }

    #[test]
    fn test_with_label() {
        assert_eq!(
            p(r"\SHRINE\ONTOLOGYVERSION\1.9\").with_label("1.9_Converted"),
            p(r"\SHRINE\ONTOLOGYVERSION\1.9_Converted\")
        );
    }

    #[test]
    fn test_serde_validates() {
        let ok: Result<OntologyPath, _> = serde_json::from_str(r#""\\A\\""#);
        assert!(ok.is_ok());
        let bad: Result<OntologyPath, _> = serde_json::from_str(r#""A""#);
        assert!(bad.is_err());
    }
}
