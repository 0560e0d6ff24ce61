//! Serialization of the classified, relinked index.
//!
//! ## Output layout
//!
//! ```text
//! "c_hlevel","c_fullname",...,"m_exclusion_cd","surrogate_node"
//! "2","\SHRINE\Diagnoses\",...,"","{""id"":0,""children"":[1,2]}"
//! ```
//!
//! Every field is quoted. The linkage column is empty for public rows.
//! Rows are written public first (if the policy asks for them), then
//! concepts in surrogate-ID order, then modifier buckets in surrogate-ID
//! order with their rows in arrival order.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::index::OntologyIndex;
use crate::manifest::MissingComponent;
use crate::types::{Header, OntologyNode, DEFAULT_LINKAGE_COLUMN};

/// Segment marking the ontology-version subtree.
pub const VERSION_MARKER_SEGMENT: &str = "ONTOLOGYVERSION";

/// Suffix appended to the version label of a converted ontology.
pub const CONVERTED_SUFFIX: &str = "_Converted";

/// Default root segment of the version marker.
pub const DEFAULT_VERSION_ROOT: &str = "SHRINE";

/// Which partitions are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionPolicy {
    /// Only sensitive concepts and modifiers. Public rows are renamed but not
    /// written, which is what existing converted datasets contain.
    #[default]
    SensitiveOnly,
    /// Public rows followed by the sensitive partitions.
    All,
}

/// Matches `\<root>\ONTOLOGYVERSION\<label>\` exactly one level below the marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMarkerRule {
    root: String,
}

impl VersionMarkerRule {
    /// Rule for the given root segment.
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// The root segment.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The version label if `node` is a version node.
    pub fn label<'a>(&self, node: &'a OntologyNode) -> Option<&'a str> {
        match node.path.segments().as_slice() {
            [root, marker, label]
                if *root == self.root && *marker == VERSION_MARKER_SEGMENT && !label.is_empty() =>
            {
                Some(node.path.label())
            }
            _ => None,
        }
    }

    /// Rename a version node in place; returns false for any other node.
    ///
    /// `path`, `name`, `dim_code` and `tooltip` all take the renamed path.
    pub fn apply(&self, node: &mut OntologyNode) -> bool {
        let Some(label) = self.label(node) else {
            return false;
        };
        let renamed = node.path.with_label(&format!("{label}{CONVERTED_SUFFIX}"));
        tracing::debug!(from = %node.path, to = %renamed, "renaming ontology version node");
        node.name = renamed.to_string();
        node.dim_code = renamed.to_string();
        node.tooltip = renamed.to_string();
        node.path = renamed;
        true
    }
}

impl Default for VersionMarkerRule {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION_ROOT)
    }
}

/// Errors while writing output.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// Destination could not be created or flushed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// CSV encoding or write failure.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    /// Linkage payload could not be encoded.
    #[error("linkage encoding error: {0}")]
    Linkage(#[from] serde_json::Error),
    /// Run manifest could not be assembled.
    #[error("manifest error: {0}")]
    Manifest(#[from] MissingComponent),
}

/// Row counts and fingerprint of one emission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitReport {
    /// Public rows written.
    pub public_rows: usize,
    /// Sensitive concept rows written.
    pub concept_rows: usize,
    /// Sensitive modifier rows written.
    pub modifier_rows: usize,
    /// Hash of the header and all emitted rows.
    pub output_fingerprint: String,
}

impl EmitReport {
    /// Total data rows written (header excluded).
    pub fn rows_written(&self) -> usize {
        self.public_rows + self.concept_rows + self.modifier_rows
    }
}

/// Writes an [`OntologyIndex`] as quoted CSV.
#[derive(Debug, Clone)]
pub struct Emitter {
    policy: EmissionPolicy,
    version_rule: VersionMarkerRule,
    linkage_column: String,
}

impl Emitter {
    /// Create an emitter.
    pub fn new(policy: EmissionPolicy, version_rule: VersionMarkerRule) -> Self {
        Self {
            policy,
            version_rule,
            linkage_column: DEFAULT_LINKAGE_COLUMN.to_string(),
        }
    }

    /// Override the linkage column name.
    pub fn with_linkage_column(mut self, name: impl Into<String>) -> Self {
        self.linkage_column = name.into();
        self
    }

    /// The emission policy.
    pub fn policy(&self) -> EmissionPolicy {
        self.policy
    }

    /// Rename version-marker nodes in the public partition.
    ///
    /// Runs regardless of the emission policy. Returns the number renamed.
    pub fn rename_version_markers(&self, index: &mut OntologyIndex) -> usize {
        let mut renamed = 0;
        index.rekey_public(|mut node| {
            if self.version_rule.apply(&mut node) {
                renamed += 1;
            }
            node
        });
        if renamed > 0 {
            tracing::info!(root = %self.version_rule.root(), renamed, "ontology version renamed");
        } else {
            tracing::warn!(root = %self.version_rule.root(), "no ontology version node found");
        }
        renamed
    }

    /// Emitted rows, header excluded, in output order.
    pub fn rows(&self, index: &OntologyIndex) -> Result<Vec<Vec<String>>, EmitError> {
        let public = match self.policy {
            EmissionPolicy::All => Some(index.public_nodes()),
            EmissionPolicy::SensitiveOnly => None,
        };
        public
            .into_iter()
            .flatten()
            .chain(index.concept_nodes())
            .chain(index.modifier_rows())
            .map(|node| self.render(node))
            .collect()
    }

    fn render(&self, node: &OntologyNode) -> Result<Vec<String>, EmitError> {
        let mut fields = node.to_fields();
        let linkage = match node.linkage() {
            Some(linkage) => serde_json::to_string(&linkage)?,
            None => String::new(),
        };
        fields.push(linkage);
        Ok(fields)
    }

    /// Write the header and rows to `out`.
    pub fn emit<W: Write>(&self, header: &Header, index: &OntologyIndex, out: W) -> Result<EmitReport, EmitError> {
        let header = header.with_linkage_column(&self.linkage_column);
        let rows = self.rows(index)?;

        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(out);
        writer.write_record(header.columns())?;
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        let report = EmitReport {
            public_rows: match self.policy {
                EmissionPolicy::All => index.num_public(),
                EmissionPolicy::SensitiveOnly => 0,
            },
            concept_rows: index.num_concepts(),
            modifier_rows: index.num_modifier_rows(),
            output_fingerprint: canonical_hash_hex(&(header.columns(), &rows)),
        };
        tracing::info!(
            policy = ?self.policy,
            public_rows = report.public_rows,
            concept_rows = report.concept_rows,
            modifier_rows = report.modifier_rows,
            "ontology emitted"
        );
        Ok(report)
    }

    /// Create `path` and write to it.
    pub fn emit_to_path(&self, header: &Header, index: &OntologyIndex, path: &Path) -> Result<EmitReport, EmitError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.emit(header, index, BufWriter::new(file))
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(EmissionPolicy::default(), VersionMarkerRule::default())
    }
}
