//! The shrine-ontology table schema.

use serde::{Deserialize, Serialize};

/// Column names of the shrine-ontology table, in file order.
pub const SHRINE_ONTOLOGY_COLUMNS: [&str; 23] = [
    "c_hlevel",
    "c_fullname",
    "c_name",
    "c_synonym_cd",
    "c_visualattributes",
    "c_totalnum",
    "c_basecode",
    "c_metadataxml",
    "c_facttablecolumn",
    "c_tablename",
    "c_columnname",
    "c_columndatatype",
    "c_operator",
    "c_dimcode",
    "c_comment",
    "c_tooltip",
    "update_date",
    "download_date",
    "import_date",
    "sourcesystem_cd",
    "valuetype_cd",
    "m_applied_path",
    "m_exclusion_cd",
];

/// Number of schema columns.
pub const SHRINE_ONTOLOGY_WIDTH: usize = SHRINE_ONTOLOGY_COLUMNS.len();

/// Default name of the linkage column appended to emitted rows.
pub const DEFAULT_LINKAGE_COLUMN: &str = "surrogate_node";

/// Header row of an ontology table, kept as read so output mirrors input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    /// Header with the canonical schema column names.
    pub fn canonical() -> Self {
        Self::from_columns(SHRINE_ONTOLOGY_COLUMNS.iter().map(|c| c.to_string()))
    }

    /// Build from column names as read.
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the header has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check the header against the schema (trimmed, case-insensitive, same order).
    ///
    /// Returns the first offending position on mismatch.
    pub fn validate(&self) -> Result<(), SchemaMismatch> {
        if self.columns.len() != SHRINE_ONTOLOGY_WIDTH {
            return Err(SchemaMismatch::Width {
                expected: SHRINE_ONTOLOGY_WIDTH,
                found: self.columns.len(),
            });
        }
        for (position, (found, expected)) in self
            .columns
            .iter()
            .zip(SHRINE_ONTOLOGY_COLUMNS.iter())
            .enumerate()
        {
            if !found.trim().eq_ignore_ascii_case(expected) {
                return Err(SchemaMismatch::Column {
                    position,
                    expected: expected.to_string(),
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }

    /// Header for emitted rows: the input columns followed by the linkage column.
    pub fn with_linkage_column(&self, linkage_column: &str) -> Self {
        let mut columns = self.columns.clone();
        columns.push(linkage_column.to_string());
        Self { columns }
    }

    /// Render as one quoted, comma-joined line without a trailing separator.
    pub fn render_line(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Header does not match the shrine-ontology schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaMismatch {
    /// Wrong number of columns.
    #[error("expected {expected} columns, found {found}")]
    Width {
        /// Schema width.
        expected: usize,
        /// Columns present.
        found: usize,
    },
    /// Column name differs from the schema.
    #[error("column {position}: expected {expected:?}, found {found:?}")]
    Column {
        /// Zero-based column position.
        position: usize,
        /// Schema name.
        expected: String,
        /// Name present in the file.
        found: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_header_validates() {
        assert!(Header::canonical().validate().is_ok());
    }

    #[test]
    fn test_validate_is_case_insensitive_and_trims() {
        let header = Header::from_columns(
            SHRINE_ONTOLOGY_COLUMNS.iter().map(|c| format!(" {} ", c.to_uppercase())),
        );
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_position() {
        let mut columns: Vec<String> = SHRINE_ONTOLOGY_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.swap(1, 2);
        let err = Header::from_columns(columns).validate().unwrap_err();
        assert!(matches!(err, SchemaMismatch::Column { position: 1, .. }));

        let short = Header::from_columns(["c_hlevel"]);
        assert!(matches!(short.validate(), Err(SchemaMismatch::Width { found: 1, .. })));
    }

    #[test]
    fn test_render_line_has_no_trailing_separator() {
        let header = Header::from_columns(["a", "b", "c"]);
        assert_eq!(header.render_line(), r#""a","b","c""#);
    }

    #[test]
    fn test_linkage_column_appended_last() {
        let header = Header::canonical().with_linkage_column(DEFAULT_LINKAGE_COLUMN);
        assert_eq!(header.len(), SHRINE_ONTOLOGY_WIDTH + 1);
        assert_eq!(header.columns().last().unwrap(), DEFAULT_LINKAGE_COLUMN);
        assert_eq!(&header.columns()[..SHRINE_ONTOLOGY_WIDTH], Header::canonical().columns());
    }
}
