//! # shrine-anonymizer
//!
//! Redacts a path-encoded SHRINE ontology so it can be shared without
//! revealing which terms are sensitive, while keeping enough structure for
//! a downstream system to rebuild the sensitive sub-hierarchy.
//!
//! ## Core Contract
//!
//! 1. Classify every row as public or sensitive (concept or modifier) by exact path match
//! 2. Give each sensitive path a dense surrogate ID, per kind, in first-seen order
//! 3. Link every sensitive node to the surrogate IDs of its sensitive descendants
//! 4. Rename the ontology-version marker and write the table back out with a linkage column
//!
//! ## Architecture
//!
//! ```text
//! TableReader → classify → OntologyIndex (+ SurrogateIdAllocator)
//!                                 ↓
//!                          AncestorLinker
//!                                 ↓
//!                 Emitter → converted table + ConversionManifest
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same input + same sensitive set + same settings → identical output bytes
//! - Surrogate IDs follow input order, per kind, without gaps
//! - Child lists are ascending and free of duplicates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod classifier;
pub mod allocator;
pub mod index;
pub mod linker;
pub mod emitter;
pub mod source;
pub mod pipeline;
pub mod error;
pub mod config;
pub mod manifest;
pub mod canonical;

// Re-exports
pub use types::{
    Header, NodeKind, OntologyNode, OntologyPath, PathError, RowError, SchemaMismatch,
    SurrogateId, SurrogateLinkage, DEFAULT_LINKAGE_COLUMN, PATH_DELIMITER,
    SHRINE_ONTOLOGY_COLUMNS, SHRINE_ONTOLOGY_WIDTH,
};
pub use classifier::{classify, Classification, ClassifyError, SensitivePathSet};
pub use allocator::SurrogateIdAllocator;
pub use index::{InsertOutcome, ModifierBucket, OntologyIndex};
pub use linker::{AncestorLinker, LinkDepth, LinkReport};
pub use emitter::{
    EmissionPolicy, EmitError, EmitReport, Emitter, VersionMarkerRule,
    CONVERTED_SUFFIX, DEFAULT_VERSION_ROOT, VERSION_MARKER_SEGMENT,
};
pub use source::{RawRecord, SourceError, TableReader};
pub use pipeline::{ConversionOutcome, ErrorPolicy, IndexBuild, OntologyConverter, RowRejection};
pub use error::{ConversionError, Stage};
pub use config::{ConfigError, ConverterConfig};
pub use manifest::{
    ConversionManifest, ConversionStats, ManifestBuilder, MissingComponent,
    MANIFEST_SCHEMA_VERSION,
};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes, Fingerprinter};
