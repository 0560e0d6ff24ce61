//! Run-level errors.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifyError;
use crate::config::ConfigError;
use crate::emitter::EmitError;
use crate::source::SourceError;

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Loading configuration and the sensitive-path set.
    Config,
    /// Reading and parsing the source table.
    Read,
    /// Classifying parsed rows.
    Classify,
    /// Writing the output table or manifest.
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Read => write!(f, "read"),
            Self::Classify => write!(f, "classify"),
            Self::Emit => write!(f, "emit"),
        }
    }
}

/// Error from a conversion run.
///
/// Row-level kinds (`MalformedRow`, `UnknownNodeKind`) may be skipped by the
/// driver under [`crate::ErrorPolicy::SkipRow`]; all others end the run.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Source missing or unreadable.
    #[error("cannot read {}: {source}", .path.display())]
    SourceRead {
        /// Source file.
        path: PathBuf,
        /// Cause.
        #[source]
        source: SourceError,
    },
    /// Wrong column count, bad numeric field or bad path.
    #[error("{}:{line}: malformed row: {reason}", .path.display())]
    MalformedRow {
        /// Source file.
        path: PathBuf,
        /// 1-based line.
        line: u64,
        /// What was wrong.
        reason: String,
    },
    /// Sensitive row with an unrecognized fact-table column.
    #[error("{}:{line}: {source}", .path.display())]
    UnknownNodeKind {
        /// Source file.
        path: PathBuf,
        /// 1-based line.
        line: u64,
        /// Cause.
        #[source]
        source: ClassifyError,
    },
    /// Destination not creatable or writable.
    #[error("cannot write {}: {source}", .path.display())]
    SinkWrite {
        /// Destination file.
        path: PathBuf,
        /// Cause.
        #[source]
        source: EmitError,
    },
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ConversionError {
    /// Stage the error was raised in.
    pub fn stage(&self) -> Stage {
        match self {
            Self::SourceRead { .. } | Self::MalformedRow { .. } => Stage::Read,
            Self::UnknownNodeKind { .. } => Stage::Classify,
            Self::SinkWrite { .. } => Stage::Emit,
            Self::Config(_) => Stage::Config,
        }
    }

    /// File the error concerns, when known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::SourceRead { path, .. }
            | Self::MalformedRow { path, .. }
            | Self::UnknownNodeKind { path, .. }
            | Self::SinkWrite { path, .. } => Some(path.as_path()),
            Self::Config(e) => e.path(),
        }
    }

    /// Line number for row-level errors.
    pub fn line(&self) -> Option<u64> {
        match self {
            Self::MalformedRow { line, .. } | Self::UnknownNodeKind { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Whether the driver may skip the offending row and continue.
    pub fn is_row_level(&self) -> bool {
        self.line().is_some()
    }
}
