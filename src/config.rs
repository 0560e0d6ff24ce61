//! Run configuration.
//!
//! Loaded from JSON; every field has a default so a config file only needs
//! the values that differ. Command-line flags override file values.
//!
//! ```json
//! {
//!   "input_path": "data/original/shrine.csv",
//!   "output_path": "data/converted/shrine.csv",
//!   "sensitive_paths": ["\\SHRINE\\Diagnoses\\", "\\Admit Diagnosis\\"],
//!   "emission_policy": "sensitive_only"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classifier::SensitivePathSet;
use crate::emitter::{EmissionPolicy, VersionMarkerRule, DEFAULT_VERSION_ROOT};
use crate::linker::LinkDepth;
use crate::pipeline::ErrorPolicy;
use crate::types::{DEFAULT_LINKAGE_COLUMN, PATH_DELIMITER, SHRINE_ONTOLOGY_COLUMNS};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config or sensitive-path file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Cause.
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid JSON for [`ConverterConfig`].
    #[error("cannot parse {}: {source}", .path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Cause.
        #[source]
        source: serde_json::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// File the error concerns, when known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => Some(path.as_path()),
            Self::Invalid(_) => None,
        }
    }
}

/// Settings for one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Source shrine-ontology table.
    pub input_path: PathBuf,
    /// Destination table.
    pub output_path: PathBuf,
    /// Where to write the run manifest; none if unset.
    pub manifest_path: Option<PathBuf>,
    /// Exact sensitive paths.
    pub sensitive_paths: Vec<String>,
    /// Extra sensitive paths, one per line.
    pub sensitive_paths_file: Option<PathBuf>,
    /// Root segment of the ontology-version marker.
    pub version_root: String,
    /// Which partitions are written.
    pub emission_policy: EmissionPolicy,
    /// Abort or skip on row-level errors.
    pub error_policy: ErrorPolicy,
    /// Transitive or nearest-ancestor linking.
    pub link_depth: LinkDepth,
    /// Name of the appended linkage column.
    pub linkage_column: String,
    /// Accepted for compatibility with encrypting deployments; never applied.
    pub public_key: Option<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("../data/original/shrine.csv"),
            output_path: PathBuf::from("../data/converted/shrine.csv"),
            manifest_path: None,
            sensitive_paths: Vec::new(),
            sensitive_paths_file: None,
            version_root: DEFAULT_VERSION_ROOT.to_string(),
            emission_policy: EmissionPolicy::default(),
            error_policy: ErrorPolicy::default(),
            link_depth: LinkDepth::default(),
            linkage_column: DEFAULT_LINKAGE_COLUMN.to_string(),
            public_key: None,
        }
    }
}

impl ConverterConfig {
    /// Load from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version_root.is_empty() || self.version_root.contains(PATH_DELIMITER) {
            return Err(ConfigError::Invalid(format!(
                "version_root must be a single non-empty segment, got {:?}",
                self.version_root
            )));
        }
        if self.linkage_column.trim().is_empty() {
            return Err(ConfigError::Invalid("linkage_column must not be empty".to_string()));
        }
        if SHRINE_ONTOLOGY_COLUMNS
            .iter()
            .any(|c| c.eq_ignore_ascii_case(self.linkage_column.trim()))
        {
            return Err(ConfigError::Invalid(format!(
                "linkage_column {:?} collides with a schema column",
                self.linkage_column
            )));
        }
        if self.input_path == self.output_path {
            return Err(ConfigError::Invalid(format!(
                "output_path must differ from input_path ({})",
                self.input_path.display()
            )));
        }
        Ok(())
    }

    /// Build the sensitive-path set from the inline list and the optional file.
    pub fn load_sensitive_paths(&self) -> Result<SensitivePathSet, ConfigError> {
        let mut set = SensitivePathSet::from_paths(self.sensitive_paths.iter().cloned());
        if let Some(path) = &self.sensitive_paths_file {
            let from_file = SensitivePathSet::from_file(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            set.extend(from_file);
        }
        if set.is_empty() {
            tracing::warn!("no sensitive paths configured; every row will be public");
        }
        Ok(set)
    }

    /// The version-marker rule for this run.
    pub fn version_rule(&self) -> VersionMarkerRule {
        VersionMarkerRule::new(self.version_root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = ConverterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.emission_policy, EmissionPolicy::SensitiveOnly);
        assert_eq!(config.error_policy, ErrorPolicy::Abort);
        assert_eq!(config.link_depth, LinkDepth::Transitive);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ConverterConfig = serde_json::from_str(
            r#"{"sensitive_paths": ["\\A\\"], "emission_policy": "all", "error_policy": "skip_row"}"#,
        )
        .unwrap();
        assert_eq!(config.sensitive_paths, vec![r"\A\".to_string()]);
        assert_eq!(config.emission_policy, EmissionPolicy::All);
        assert_eq!(config.error_policy, ErrorPolicy::SkipRow);
        assert_eq!(config.version_root, "SHRINE");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ConverterConfig::default();
        config.version_root = r"SHRINE\X".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ConverterConfig::default();
        config.linkage_column = "C_FULLNAME".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ConverterConfig::default();
        config.output_path = config.input_path.clone();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_sensitive_paths_merge_inline_and_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# modifiers").unwrap();
        writeln!(file, r"\Admit Diagnosis\").unwrap();

        let config = ConverterConfig {
            sensitive_paths: vec![r"\SHRINE\Diagnoses\".to_string()],
            sensitive_paths_file: Some(file.path().to_path_buf()),
            ..ConverterConfig::default()
        };
        let set = config.load_sensitive_paths().unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(r"\Admit Diagnosis\"));
    }

    #[test]
    fn test_missing_sensitive_file_names_path() {
        let config = ConverterConfig {
            sensitive_paths_file: Some(PathBuf::from("/nonexistent/sensitive.txt")),
            ..ConverterConfig::default()
        };
        let err = config.load_sensitive_paths().unwrap_err();
        assert_eq!(err.path(), Some(Path::new("/nonexistent/sensitive.txt")));
    }

    #[test]
    fn test_from_json_file_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = ConverterConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
