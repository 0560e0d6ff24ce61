//! Run manifest for provenance.
//!
//! A `ConversionManifest` ties one output file to the exact input table and
//! sensitive-path set it was produced from. Its `manifest_id` is derived from
//! the fingerprints and settings only, so re-running the same conversion
//! yields the same ID; `converted_at` is the only varying field.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::emitter::EmissionPolicy;
use crate::linker::LinkDepth;

/// Manifest schema version. Increment on breaking changes.
pub const MANIFEST_SCHEMA_VERSION: &str = "shrine_conversion_v1";

/// Counts gathered over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Data records read (header excluded).
    pub rows_read: usize,
    /// Distinct public paths.
    pub public_nodes: usize,
    /// Distinct sensitive concept paths.
    pub concept_nodes: usize,
    /// Distinct sensitive modifier paths.
    pub modifier_paths: usize,
    /// Sensitive modifier rows.
    pub modifier_rows: usize,
    /// Rows skipped under the skip policy.
    pub rejected_rows: usize,
    /// Repeated sensitive concept paths (last row kept).
    pub duplicate_concepts: usize,
    /// Repeated public paths (last row kept).
    pub duplicate_public: usize,
    /// Child links added between concepts.
    pub concept_links: usize,
    /// Child links added between modifier paths.
    pub modifier_links: usize,
    /// Version-marker nodes renamed.
    pub version_nodes_renamed: usize,
    /// Data rows written.
    pub rows_emitted: usize,
}

/// The manifest written next to a converted ontology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionManifest {
    /// Deterministic run identifier.
    pub manifest_id: String,
    /// Schema version.
    pub version: String,
    /// Fingerprint of the header and every record read.
    pub input_fingerprint: String,
    /// Fingerprint of the sorted sensitive-path set.
    pub sensitive_set_fingerprint: String,
    /// Fingerprint of the emitted header and rows.
    pub output_fingerprint: String,
    /// Emission policy used.
    pub emission_policy: EmissionPolicy,
    /// Link depth used.
    pub link_depth: LinkDepth,
    /// Run statistics.
    pub stats: ConversionStats,
    /// When the run finished.
    pub converted_at: DateTime<Utc>,
}

impl ConversionManifest {
    /// Write as pretty JSON.
    pub fn write_to_path(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, json)
    }
}

/// A required manifest component was not set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("manifest component missing: {0}")]
pub struct MissingComponent(pub &'static str);

/// Builder for [`ConversionManifest`].
#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    input_fingerprint: Option<String>,
    sensitive_set_fingerprint: Option<String>,
    output_fingerprint: Option<String>,
    emission_policy: EmissionPolicy,
    link_depth: LinkDepth,
    stats: ConversionStats,
}

impl ManifestBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input fingerprint.
    pub fn input_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.input_fingerprint = Some(fingerprint.into());
        self
    }

    /// Set the sensitive-set fingerprint.
    pub fn sensitive_set_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.sensitive_set_fingerprint = Some(fingerprint.into());
        self
    }

    /// Set the output fingerprint.
    pub fn output_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.output_fingerprint = Some(fingerprint.into());
        self
    }

    /// Set the emission policy.
    pub fn emission_policy(mut self, policy: EmissionPolicy) -> Self {
        self.emission_policy = policy;
        self
    }

    /// Set the link depth.
    pub fn link_depth(mut self, depth: LinkDepth) -> Self {
        self.link_depth = depth;
        self
    }

    /// Set the run statistics.
    pub fn stats(mut self, stats: ConversionStats) -> Self {
        self.stats = stats;
        self
    }

    /// Build the manifest.
    pub fn build(self) -> Result<ConversionManifest, MissingComponent> {
        let input_fingerprint = self.input_fingerprint.ok_or(MissingComponent("input_fingerprint"))?;
        let sensitive_set_fingerprint = self
            .sensitive_set_fingerprint
            .ok_or(MissingComponent("sensitive_set_fingerprint"))?;
        let output_fingerprint = self.output_fingerprint.ok_or(MissingComponent("output_fingerprint"))?;

        let manifest_id = canonical_hash_hex(&ManifestIdInput {
            version: MANIFEST_SCHEMA_VERSION,
            input_fingerprint: &input_fingerprint,
            sensitive_set_fingerprint: &sensitive_set_fingerprint,
            output_fingerprint: &output_fingerprint,
            emission_policy: self.emission_policy,
            link_depth: self.link_depth,
        });

        Ok(ConversionManifest {
            manifest_id,
            version: MANIFEST_SCHEMA_VERSION.to_string(),
            input_fingerprint,
            sensitive_set_fingerprint,
            output_fingerprint,
            emission_policy: self.emission_policy,
            link_depth: self.link_depth,
            stats: self.stats,
            converted_at: Utc::now(),
        })
    }
}

/// Internal struct for computing manifest_id.
#[derive(Serialize)]
struct ManifestIdInput<'a> {
    version: &'a str,
    input_fingerprint: &'a str,
    sensitive_set_fingerprint: &'a str,
    output_fingerprint: &'a str,
    emission_policy: EmissionPolicy,
    link_depth: LinkDepth,
}
