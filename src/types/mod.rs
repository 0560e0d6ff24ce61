//! Core types for the ontology anonymizer.

pub mod path;
pub mod node;
pub mod schema;

pub use path::{OntologyPath, PathError, PATH_DELIMITER};
pub use node::{NodeKind, OntologyNode, RowError, SurrogateId, SurrogateLinkage};
pub use schema::{
    Header, SchemaMismatch, DEFAULT_LINKAGE_COLUMN, SHRINE_ONTOLOGY_COLUMNS, SHRINE_ONTOLOGY_WIDTH,
};
