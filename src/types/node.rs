//! Ontology node types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::path::{OntologyPath, PathError};
use super::schema::SHRINE_ONTOLOGY_WIDTH;

/// Kind of an ontology node, derived from `c_facttablecolumn`.
///
/// Concepts and modifiers are two parallel taxonomies, each with its own
/// surrogate-ID space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// `concept_cd` rows.
    Concept,
    /// `modifier_cd` rows.
    Modifier,
}

impl NodeKind {
    /// Parse the fact-table column marker (case-insensitive).
    pub fn from_fact_table_column(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "concept_cd" => Some(Self::Concept),
            "modifier_cd" => Some(Self::Modifier),
            _ => None,
        }
    }

    /// The canonical fact-table column marker.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Concept => "concept_cd",
            Self::Modifier => "modifier_cd",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concept => write!(f, "concept"),
            Self::Modifier => write!(f, "modifier"),
        }
    }
}

/// Opaque identifier standing in for a sensitive node in redacted output.
///
/// Dense and zero-based within one [`NodeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurrogateId(u64);

impl SurrogateId {
    /// Wrap a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurrogateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SurrogateId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Linkage payload emitted for a sensitive node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurrogateLinkage {
    /// The node's surrogate ID.
    pub id: SurrogateId,
    /// Surrogate IDs of all sensitive descendants of the same kind.
    pub children: Vec<SurrogateId>,
}

/// One row of the shrine ontology.
///
/// Text columns are kept verbatim. `c_hlevel` and `c_totalnum` are parsed,
/// so re-emission writes them in canonical form (`01` becomes `1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyNode {
    /// `c_hlevel`.
    pub hlevel: i32,
    /// `c_fullname`, the natural key.
    pub path: OntologyPath,
    /// `c_name`.
    pub name: String,
    /// `c_synonym_cd`.
    pub synonym_cd: String,
    /// `c_visualattributes`.
    pub visual_attributes: String,
    /// `c_totalnum`, empty in most exports.
    pub total_num: Option<i64>,
    /// `c_basecode`.
    pub base_code: String,
    /// `c_metadataxml`.
    pub metadata_xml: String,
    /// `c_facttablecolumn`, raw marker text.
    pub fact_table_column: String,
    /// `c_tablename`.
    pub table_name: String,
    /// `c_columnname`.
    pub column_name: String,
    /// `c_columndatatype`.
    pub column_data_type: String,
    /// `c_operator`.
    pub operator: String,
    /// `c_dimcode`.
    pub dim_code: String,
    /// `c_comment`.
    pub comment: String,
    /// `c_tooltip`.
    pub tooltip: String,
    /// `update_date`.
    pub update_date: String,
    /// `download_date`.
    pub download_date: String,
    /// `import_date`.
    pub import_date: String,
    /// `sourcesystem_cd`.
    pub sourcesystem_cd: String,
    /// `valuetype_cd`.
    pub valuetype_cd: String,
    /// `m_applied_path`.
    pub applied_path: String,
    /// `m_exclusion_cd`.
    pub exclusion_cd: String,
    /// Set once when the node is registered as sensitive.
    pub surrogate_id: Option<SurrogateId>,
    /// Filled by the ancestor linker; sensitive nodes only.
    pub child_surrogate_ids: Vec<SurrogateId>,
}

impl OntologyNode {
    /// Parse a record in schema column order.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, RowError> {
        if fields.len() != SHRINE_ONTOLOGY_WIDTH {
            return Err(RowError::ColumnCount {
                expected: SHRINE_ONTOLOGY_WIDTH,
                found: fields.len(),
            });
        }
        let f = |i: usize| fields[i].as_ref().to_string();

        let hlevel = parse_int("c_hlevel", fields[0].as_ref())?;
        let total_num = match fields[5].as_ref().trim() {
            "" => None,
            raw => Some(parse_int("c_totalnum", raw)?),
        };

        Ok(Self {
            hlevel,
            path: OntologyPath::parse(f(1))?,
            name: f(2),
            synonym_cd: f(3),
            visual_attributes: f(4),
            total_num,
            base_code: f(6),
            metadata_xml: f(7),
            fact_table_column: f(8),
            table_name: f(9),
            column_name: f(10),
            column_data_type: f(11),
            operator: f(12),
            dim_code: f(13),
            comment: f(14),
            tooltip: f(15),
            update_date: f(16),
            download_date: f(17),
            import_date: f(18),
            sourcesystem_cd: f(19),
            valuetype_cd: f(20),
            applied_path: f(21),
            exclusion_cd: f(22),
            surrogate_id: None,
            child_surrogate_ids: Vec::new(),
        })
    }

    /// Fields in schema column order.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.hlevel.to_string(),
            self.path.to_string(),
            self.name.clone(),
            self.synonym_cd.clone(),
            self.visual_attributes.clone(),
            self.total_num.map(|n| n.to_string()).unwrap_or_default(),
            self.base_code.clone(),
            self.metadata_xml.clone(),
            self.fact_table_column.clone(),
            self.table_name.clone(),
            self.column_name.clone(),
            self.column_data_type.clone(),
            self.operator.clone(),
            self.dim_code.clone(),
            self.comment.clone(),
            self.tooltip.clone(),
            self.update_date.clone(),
            self.download_date.clone(),
            self.import_date.clone(),
            self.sourcesystem_cd.clone(),
            self.valuetype_cd.clone(),
            self.applied_path.clone(),
            self.exclusion_cd.clone(),
        ]
    }

    /// Node kind, if the fact-table column holds a known marker.
    pub fn node_kind(&self) -> Option<NodeKind> {
        NodeKind::from_fact_table_column(&self.fact_table_column)
    }

    /// Whether a surrogate ID has been assigned.
    pub fn is_sensitive(&self) -> bool {
        self.surrogate_id.is_some()
    }

    /// Linkage payload; `None` for public nodes.
    pub fn linkage(&self) -> Option<SurrogateLinkage> {
        self.surrogate_id.map(|id| SurrogateLinkage {
            id,
            children: self.child_surrogate_ids.clone(),
        })
    }
}

fn parse_int<T: std::str::FromStr>(column: &'static str, raw: &str) -> Result<T, RowError> {
    raw.trim().parse().map_err(|_| RowError::InvalidNumber {
        column,
        value: raw.to_string(),
    })
}

/// A record that cannot become an [`OntologyNode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    /// Field count differs from the schema.
    #[error("expected {expected} fields, found {found}")]
    ColumnCount {
        /// Schema width.
        expected: usize,
        /// Fields present.
        found: usize,
    },
    /// A numeric column does not parse.
    #[error("unparseable {column}: {value:?}")]
    InvalidNumber {
        /// Column name.
        column: &'static str,
        /// Raw text.
        value: String,
    },
    /// `c_fullname` is not delimiter-wrapped.
    #[error(transparent)]
    InvalidPath(#[from] PathError),
}


#[cfg(test)]
mod tests {
    use super::fixtures::{node, record};
    use super::*;

    #[test]
    fn test_node_kind_parsing() {
        assert_eq!(NodeKind::from_fact_table_column("concept_cd"), Some(NodeKind::Concept));
        assert_eq!(NodeKind::from_fact_table_column("MODIFIER_CD"), Some(NodeKind::Modifier));
        assert_eq!(NodeKind::from_fact_table_column("Concept_Cd"), Some(NodeKind::Concept));
        assert_eq!(NodeKind::from_fact_table_column("patient_num"), None);
        assert_eq!(NodeKind::from_fact_table_column(""), None);
    }

    #[test]
    fn test_fields_round_trip() {
        let fields = record(r"\SHRINE\Diagnoses\", "concept_cd");
        let node = OntologyNode::from_fields(&fields).unwrap();
        assert_eq!(node.to_fields(), fields);
        assert_eq!(node.hlevel, 2);
        assert_eq!(node.total_num, None);
        assert!(!node.is_sensitive());
    }

    #[test]
    fn test_total_num_parsed_when_present() {
        let mut fields = record(r"\A\", "concept_cd");
        fields[5] = "42".to_string();
        let node = OntologyNode::from_fields(&fields).unwrap();
        assert_eq!(node.total_num, Some(42));
        assert_eq!(node.to_fields()[5], "42");
    }

    #[test]
    fn test_wrong_column_count() {
        let mut fields = record(r"\A\", "concept_cd");
        fields.pop();
        assert_eq!(
            OntologyNode::from_fields(&fields),
            Err(RowError::ColumnCount { expected: 23, found: 22 })
        );
    }

    #[test]
    fn test_unparseable_numeric() {
        let mut fields = record(r"\A\", "concept_cd");
        fields[0] = "two".to_string();
        assert!(matches!(
            OntologyNode::from_fields(&fields),
            Err(RowError::InvalidNumber { column: "c_hlevel", .. })
        ));

        let mut fields = record(r"\A\", "concept_cd");
        fields[5] = "n/a".to_string();
        assert!(matches!(
            OntologyNode::from_fields(&fields),
            Err(RowError::InvalidNumber { column: "c_totalnum", .. })
        ));
    }

    #[test]
    fn test_undelimited_path_rejected() {
        let mut fields = record(r"\A\", "concept_cd");
        fields[1] = "A".to_string();
        assert!(matches!(OntologyNode::from_fields(&fields), Err(RowError::InvalidPath(_))));
    }

    #[test]
    fn test_linkage_only_for_sensitive() {
        let mut n = node(r"\A\", "concept_cd");
        assert!(n.linkage().is_none());
        n.surrogate_id = Some(SurrogateId::new(3));
        n.child_surrogate_ids = vec![SurrogateId::new(4), SurrogateId::new(7)];
        let json = serde_json::to_string(&n.linkage().unwrap()).unwrap();
        assert_eq!(json, r#"{"id":3,"children":[4,7]}"#);
    }
}
