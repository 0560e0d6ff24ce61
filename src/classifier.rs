//! Exact-match sensitivity classification.
//!
//! A row is sensitive iff its full path is a member of the configured set.
//! This is not a prefix test: descendants of a sensitive path
//! stay public unless listed themselves. Prefix relationships only matter
//! later, in [`crate::linker`].

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::types::{NodeKind, OntologyNode, PATH_DELIMITER};

/// Result of classifying one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class", content = "kind", rename_all = "snake_case")]
pub enum Classification {
    /// Path is not in the sensitive set.
    Public,
    /// Path is in the sensitive set.
    Sensitive(NodeKind),
}

impl Classification {
    /// Whether the node is sensitive.
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Self::Sensitive(_))
    }
}

/// A sensitive row whose kind cannot be determined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    /// `c_facttablecolumn` is neither `concept_cd` nor `modifier_cd`.
    #[error("unknown fact table column {value:?} on sensitive path {path}")]
    UnknownNodeKind {
        /// Path of the offending row.
        path: String,
        /// Raw column value.
        value: String,
    },
}

/// The configured set of exact sensitive paths.
#[derive(Debug, Clone, Default)]
pub struct SensitivePathSet {
    paths: HashSet<String>,
}

impl SensitivePathSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from path strings, warning on entries that can never match a row.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for path in paths {
            set.insert(path);
        }
        set
    }

    /// Read one path per line; blank lines and `#` comments are skipped.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse_list(&text))
    }

    /// Parse the line-oriented list format of [`SensitivePathSet::from_file`].
    pub fn parse_list(text: &str) -> Self {
        Self::from_paths(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Add a path. Returns false if it was already present.
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if path.len() < 2 || !path.starts_with(PATH_DELIMITER) || !path.ends_with(PATH_DELIMITER) {
            tracing::warn!(path = %path, "sensitive path is not delimiter-wrapped and will never match");
        }
        self.paths.insert(path)
    }

    /// Exact membership.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Number of configured paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no path is configured.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: SensitivePathSet) {
        self.paths.extend(other.paths);
    }

    /// Order-independent fingerprint of the configured paths.
    pub fn fingerprint(&self) -> String {
        let mut sorted: Vec<&String> = self.paths.iter().collect();
        sorted.sort();
        canonical_hash_hex(&sorted)
    }
}

/// Classify a node against the sensitive set.
///
/// Public nodes are never checked for a node kind: only sensitive rows need a
/// valid `c_facttablecolumn`.
pub fn classify(node: &OntologyNode, sensitive: &SensitivePathSet) -> Result<Classification, ClassifyError> {
    if !sensitive.contains(node.path.as_str()) {
        return Ok(Classification::Public);
    }
    node.node_kind()
        .map(Classification::Sensitive)
        .ok_or_else(|| ClassifyError::UnknownNodeKind {
            path: node.path.to_string(),
            value: node.fact_table_column.clone(),
        })
}
