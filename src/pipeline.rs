//! Conversion driver.
//!
//! One run is strictly sequential:
//!
//! ```text
//! TableReader → parse → classify → OntologyIndex::insert   (per record)
//!                                        ↓
//!                     AncestorLinker::link (whole index)
//!                                        ↓
//!          Emitter::rename_version_markers → Emitter::emit → manifest
//! ```
//!
//! The index is created, mutated and consumed inside a single call, so no
//! classification state survives between runs.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canonical::Fingerprinter;
use crate::classifier::{classify, Classification, SensitivePathSet};
use crate::config::ConverterConfig;
use crate::emitter::{EmitError, EmitReport, Emitter};
use crate::error::{ConversionError, Stage};
use crate::index::{InsertOutcome, OntologyIndex};
use crate::linker::AncestorLinker;
use crate::manifest::{ConversionManifest, ConversionStats, ManifestBuilder};
use crate::source::{RawRecord, SourceError, TableReader};
use crate::types::{Header, OntologyNode};

/// What to do when a single row fails to parse or classify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop the run at the first bad row.
    #[default]
    Abort,
    /// Record the row as rejected and continue.
    SkipRow,
}

/// A row skipped under [`ErrorPolicy::SkipRow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRejection {
    /// 1-based line of the row.
    pub line: u64,
    /// Stage that rejected it.
    pub stage: Stage,
    /// Error message.
    pub reason: String,
}

/// Index and bookkeeping after the read/classify pass.
#[derive(Debug, Clone)]
pub struct IndexBuild {
    /// Header as read.
    pub header: Header,
    /// Classified nodes.
    pub index: OntologyIndex,
    /// Counts so far.
    pub stats: ConversionStats,
    /// Skipped rows.
    pub rejections: Vec<RowRejection>,
    /// Fingerprint of the header and all records read.
    pub input_fingerprint: String,
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// The linked, renamed index that was emitted.
    pub index: OntologyIndex,
    /// Run statistics.
    pub stats: ConversionStats,
    /// Skipped rows.
    pub rejections: Vec<RowRejection>,
    /// Provenance manifest.
    pub manifest: ConversionManifest,
}

/// Drives one ontology conversion.
pub struct OntologyConverter {
    config: ConverterConfig,
    sensitive: SensitivePathSet,
    linker: AncestorLinker,
    emitter: Emitter,
}

impl OntologyConverter {
    /// Validate `config` and load its sensitive-path set.
    pub fn new(config: ConverterConfig) -> Result<Self, ConversionError> {
        config.validate()?;
        let sensitive = config.load_sensitive_paths()?;
        Ok(Self::assemble(config, sensitive))
    }

    /// Validate `config` and use an already built sensitive-path set;
    /// `config.sensitive_paths*` are ignored.
    pub fn with_sensitive_paths(config: ConverterConfig, sensitive: SensitivePathSet) -> Result<Self, ConversionError> {
        config.validate()?;
        Ok(Self::assemble(config, sensitive))
    }

    fn assemble(config: ConverterConfig, sensitive: SensitivePathSet) -> Self {
        if config.public_key.is_some() {
            tracing::debug!("public key supplied; no field-level encryption is applied");
        }
        let linker = AncestorLinker::new(config.link_depth);
        let emitter = Emitter::new(config.emission_policy, config.version_rule())
            .with_linkage_column(config.linkage_column.clone());
        Self {
            config,
            sensitive,
            linker,
            emitter,
        }
    }

    /// The run configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// The sensitive-path set.
    pub fn sensitive_paths(&self) -> &SensitivePathSet {
        &self.sensitive
    }

    /// Convert `config.input_path` into `config.output_path`, writing the
    /// manifest if `config.manifest_path` is set.
    pub fn run(&self) -> Result<ConversionOutcome, ConversionError> {
        let input = self.config.input_path.clone();
        let output = self.config.output_path.clone();
        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            sensitive_paths = self.sensitive.len(),
            "starting shrine ontology conversion"
        );

        let reader = TableReader::open(&input).map_err(|source| ConversionError::SourceRead {
            path: input.clone(),
            source,
        })?;
        let build = self.build_index(reader, &input)?;
        let outcome = self.finish(build, &output, |emitter, header, index| {
            emitter.emit_to_path(header, index, &output)
        })?;

        if let Some(manifest_path) = &self.config.manifest_path {
            outcome
                .manifest
                .write_to_path(manifest_path)
                .map_err(|e| ConversionError::SinkWrite {
                    path: manifest_path.clone(),
                    source: EmitError::Io(e),
                })?;
            tracing::info!(path = %manifest_path.display(), "manifest written");
        }
        Ok(outcome)
    }

    /// Convert from any reader into any writer.
    ///
    /// `source` and `sink` only label errors and logs.
    pub fn convert<R: Read, W: Write>(
        &self,
        input: R,
        source: &Path,
        output: W,
        sink: &Path,
    ) -> Result<ConversionOutcome, ConversionError> {
        let reader = TableReader::from_reader(input).map_err(|e| ConversionError::SourceRead {
            path: source.to_path_buf(),
            source: e,
        })?;
        let build = self.build_index(reader, source)?;
        self.finish(build, sink, |emitter, header, index| emitter.emit(header, index, output))
    }

    /// Read, parse and classify every record into a fresh index.
    pub fn build_index<R: Read>(&self, mut reader: TableReader<R>, source: &Path) -> Result<IndexBuild, ConversionError> {
        let header = reader.header().clone();
        header.validate().map_err(|e| ConversionError::MalformedRow {
            path: source.to_path_buf(),
            line: 1,
            reason: format!("header does not match the shrine ontology schema: {e}"),
        })?;

        let mut fingerprint = Fingerprinter::new();
        fingerprint.update(&header.columns());

        let mut index = OntologyIndex::new();
        let mut stats = ConversionStats::default();
        let mut rejections = Vec::new();

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(SourceError::Record { line, message }) => {
                    stats.rows_read += 1;
                    let err = ConversionError::MalformedRow {
                        path: source.to_path_buf(),
                        line,
                        reason: message,
                    };
                    self.reject(err, &mut rejections)?;
                    continue;
                }
                Err(e) => {
                    return Err(ConversionError::SourceRead {
                        path: source.to_path_buf(),
                        source: e,
                    })
                }
            };
            stats.rows_read += 1;
            fingerprint.update(&record.fields);

            match self.classify_record(&record, source) {
                Ok((node, class)) => match index.insert(node, class) {
                    InsertOutcome::Public { replaced: true } => stats.duplicate_public += 1,
                    InsertOutcome::DuplicateConcept(_) => stats.duplicate_concepts += 1,
                    _ => {}
                },
                Err(err) => self.reject(err, &mut rejections)?,
            }
        }

        stats.public_nodes = index.num_public();
        stats.concept_nodes = index.num_concepts();
        stats.modifier_paths = index.num_modifier_paths();
        stats.modifier_rows = index.num_modifier_rows();
        stats.rejected_rows = rejections.len();

        tracing::info!(
            source = %source.display(),
            rows_read = stats.rows_read,
            public = stats.public_nodes,
            concepts = stats.concept_nodes,
            modifier_paths = stats.modifier_paths,
            modifier_rows = stats.modifier_rows,
            rejected = stats.rejected_rows,
            "classification complete"
        );

        Ok(IndexBuild {
            header,
            index,
            stats,
            rejections,
            input_fingerprint: fingerprint.finish_hex(),
        })
    }

    /// Parse and classify one record without touching any index.
    fn classify_record(
        &self,
        record: &RawRecord,
        source: &Path,
    ) -> Result<(OntologyNode, Classification), ConversionError> {
        let node = OntologyNode::from_fields(&record.fields).map_err(|e| ConversionError::MalformedRow {
            path: source.to_path_buf(),
            line: record.line,
            reason: e.to_string(),
        })?;
        let class = classify(&node, &self.sensitive).map_err(|e| ConversionError::UnknownNodeKind {
            path: source.to_path_buf(),
            line: record.line,
            source: e,
        })?;
        Ok((node, class))
    }

    fn reject(&self, err: ConversionError, rejections: &mut Vec<RowRejection>) -> Result<(), ConversionError> {
        match self.config.error_policy {
            ErrorPolicy::Abort => Err(err),
            ErrorPolicy::SkipRow => {
                tracing::warn!(stage = %err.stage(), error = %err, "skipping row");
                rejections.push(RowRejection {
                    line: err.line().unwrap_or(0),
                    stage: err.stage(),
                    reason: err.to_string(),
                });
                Ok(())
            }
        }
    }

    fn finish<F>(&self, build: IndexBuild, sink: &Path, emit: F) -> Result<ConversionOutcome, ConversionError>
    where
        F: FnOnce(&Emitter, &Header, &OntologyIndex) -> Result<EmitReport, EmitError>,
    {
        let IndexBuild {
            header,
            mut index,
            mut stats,
            rejections,
            input_fingerprint,
        } = build;

        let links = self.linker.link(&mut index);
        stats.concept_links = links.concept_links;
        stats.modifier_links = links.modifier_links;
        stats.version_nodes_renamed = self.emitter.rename_version_markers(&mut index);

        let report = emit(&self.emitter, &header, &index).map_err(|source| ConversionError::SinkWrite {
            path: sink.to_path_buf(),
            source,
        })?;
        stats.rows_emitted = report.rows_written();

        let manifest = ManifestBuilder::new()
            .input_fingerprint(input_fingerprint)
            .sensitive_set_fingerprint(self.sensitive.fingerprint())
            .output_fingerprint(report.output_fingerprint)
            .emission_policy(self.config.emission_policy)
            .link_depth(self.config.link_depth)
            .stats(stats.clone())
            .build()
            .map_err(|e| ConversionError::SinkWrite {
                path: sink.to_path_buf(),
                source: EmitError::Manifest(e),
            })?;

        tracing::info!(
            manifest_id = %manifest.manifest_id,
            rows_emitted = stats.rows_emitted,
            "conversion complete"
        );

        Ok(ConversionOutcome {
            index,
            stats,
            rejections,
            manifest,
        })
    }
}
