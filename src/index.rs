//! Partitioned in-memory ontology index.

use indexmap::IndexMap;
use serde::Serialize;

use crate::allocator::SurrogateIdAllocator;
use crate::classifier::Classification;
use crate::types::{NodeKind, OntologyNode, OntologyPath, SurrogateId};

/// All rows sharing one sensitive modifier path.
///
/// Every row in the bucket carries the bucket's surrogate ID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifierBucket {
    surrogate_id: SurrogateId,
    rows: Vec<OntologyNode>,
}

impl ModifierBucket {
    /// The shared surrogate ID.
    pub fn surrogate_id(&self) -> SurrogateId {
        self.surrogate_id
    }

    /// Rows in arrival order.
    pub fn rows(&self) -> &[OntologyNode] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the bucket holds no row.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a child ID to every row of the bucket.
    pub(crate) fn push_child(&mut self, child: SurrogateId) {
        for row in &mut self.rows {
            row.child_surrogate_ids.push(child);
        }
    }
}

/// What [`OntologyIndex::insert`] did with a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored in the public partition; `replaced` if the path was already there.
    Public {
        /// A previous row with the same path was overwritten.
        replaced: bool,
    },
    /// First row for a sensitive concept path.
    NewConcept(SurrogateId),
    /// Repeated concept path; row content replaced, ID kept.
    DuplicateConcept(SurrogateId),
    /// First row for a sensitive modifier path; opened a bucket.
    NewModifier(SurrogateId),
    /// Further row appended to an existing modifier bucket.
    ModifierRow(SurrogateId),
}

impl InsertOutcome {
    /// Surrogate ID stamped on the node, if sensitive.
    pub fn surrogate_id(&self) -> Option<SurrogateId> {
        match self {
            Self::Public { .. } => None,
            Self::NewConcept(id)
            | Self::DuplicateConcept(id)
            | Self::NewModifier(id)
            | Self::ModifierRow(id) => Some(*id),
        }
    }
}

/// Classified ontology nodes, owned by one conversion run.
///
/// Partitions are keyed by path and iterate in first-seen order, so sensitive
/// partitions iterate in surrogate-ID order.
#[derive(Debug, Clone, Default)]
pub struct OntologyIndex {
    public: IndexMap<OntologyPath, OntologyNode>,
    concepts: IndexMap<OntologyPath, OntologyNode>,
    modifiers: IndexMap<OntologyPath, ModifierBucket>,
    allocator: SurrogateIdAllocator,
}

impl OntologyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a classified node, stamping a surrogate ID on sensitive ones.
    pub fn insert(&mut self, mut node: OntologyNode, class: Classification) -> InsertOutcome {
        match class {
            Classification::Public => {
                node.surrogate_id = None;
                node.child_surrogate_ids.clear();
                let replaced = self.public.insert(node.path.clone(), node).is_some();
                InsertOutcome::Public { replaced }
            }
            Classification::Sensitive(NodeKind::Concept) => {
                node.child_surrogate_ids.clear();
                // Concepts are never removed, so a path's position is its surrogate ID.
                match self.concepts.get_full_mut(node.path.as_str()) {
                    Some((position, _, existing)) => {
                        let id = SurrogateId::new(position as u64);
                        tracing::warn!(
                            path = %node.path,
                            surrogate_id = %id,
                            "duplicate sensitive concept path, keeping the last row"
                        );
                        node.surrogate_id = Some(id);
                        *existing = node;
                        InsertOutcome::DuplicateConcept(id)
                    }
                    None => {
                        let id = self.allocator.allocate(NodeKind::Concept);
                        node.surrogate_id = Some(id);
                        self.concepts.insert(node.path.clone(), node);
                        InsertOutcome::NewConcept(id)
                    }
                }
            }
            Classification::Sensitive(NodeKind::Modifier) => {
                node.child_surrogate_ids.clear();
                match self.modifiers.get_mut(node.path.as_str()) {
                    Some(bucket) => {
                        let id = bucket.surrogate_id;
                        node.surrogate_id = Some(id);
                        bucket.rows.push(node);
                        InsertOutcome::ModifierRow(id)
                    }
                    None => {
                        let id = self.allocator.allocate(NodeKind::Modifier);
                        node.surrogate_id = Some(id);
                        self.modifiers.insert(
                            node.path.clone(),
                            ModifierBucket { surrogate_id: id, rows: vec![node] },
                        );
                        InsertOutcome::NewModifier(id)
                    }
                }
            }
        }
    }

    /// Public node by path.
    pub fn public(&self, path: &str) -> Option<&OntologyNode> {
        self.public.get(path)
    }

    /// Sensitive concept by path.
    pub fn concept(&self, path: &str) -> Option<&OntologyNode> {
        self.concepts.get(path)
    }

    /// Sensitive modifier bucket by path.
    pub fn modifier_bucket(&self, path: &str) -> Option<&ModifierBucket> {
        self.modifiers.get(path)
    }

    /// Public nodes in first-seen order.
    pub fn public_nodes(&self) -> impl Iterator<Item = &OntologyNode> {
        self.public.values()
    }

    /// Sensitive concepts in surrogate-ID order.
    pub fn concept_nodes(&self) -> impl Iterator<Item = &OntologyNode> {
        self.concepts.values()
    }

    /// Modifier buckets in surrogate-ID order.
    pub fn modifier_buckets(&self) -> impl Iterator<Item = (&OntologyPath, &ModifierBucket)> {
        self.modifiers.iter()
    }

    /// All modifier rows, buckets flattened.
    pub fn modifier_rows(&self) -> impl Iterator<Item = &OntologyNode> {
        self.modifiers.values().flat_map(|b| b.rows.iter())
    }

    /// Number of public paths.
    pub fn num_public(&self) -> usize {
        self.public.len()
    }

    /// Number of sensitive concept paths.
    pub fn num_concepts(&self) -> usize {
        self.concepts.len()
    }

    /// Number of distinct sensitive modifier paths.
    pub fn num_modifier_paths(&self) -> usize {
        self.modifiers.len()
    }

    /// Number of sensitive modifier rows.
    pub fn num_modifier_rows(&self) -> usize {
        self.modifiers.values().map(ModifierBucket::len).sum()
    }

    /// The allocator state (IDs handed out so far).
    pub fn allocator(&self) -> &SurrogateIdAllocator {
        &self.allocator
    }

    pub(crate) fn concepts_mut(&mut self) -> &mut IndexMap<OntologyPath, OntologyNode> {
        &mut self.concepts
    }

    pub(crate) fn modifiers_mut(&mut self) -> &mut IndexMap<OntologyPath, ModifierBucket> {
        &mut self.modifiers
    }

    /// Rebuild the public partition through `f`, re-keying by the returned path.
    ///
    /// Order is preserved. Used by the version-marker rename.
    pub(crate) fn rekey_public<F>(&mut self, mut f: F)
    where
        F: FnMut(OntologyNode) -> OntologyNode,
    {
        let public = std::mem::take(&mut self.public);
        self.public = public
            .into_iter()
            .map(|(_, node)| {
                let node = f(node);
                (node.path.clone(), node)
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::node::fixtures::node;
    use proptest::prelude::*;

    const CONCEPT: Classification = Classification::Sensitive(NodeKind::Concept);
    const MODIFIER: Classification = Classification::Sensitive(NodeKind::Modifier);

    #[test]
    fn test_public_nodes_carry_no_surrogate() {
        let mut index = OntologyIndex::new();
        let outcome = index.insert(node(r"\P\", "concept_cd"), Classification::Public);
        assert_eq!(outcome, InsertOutcome::Public { replaced: false });
        assert!(index.public(r"\P\").unwrap().surrogate_id.is_none());
        assert_eq!(index.allocator().allocated(NodeKind::Concept), 0);
    }

    #[test]
    fn test_concepts_get_dense_ids_in_first_seen_order() {
        let mut index = OntologyIndex::new();
        assert_eq!(index.insert(node(r"\A\", "concept_cd"), CONCEPT), InsertOutcome::NewConcept(SurrogateId::new(0)));
        assert_eq!(index.insert(node(r"\A\B\", "concept_cd"), CONCEPT), InsertOutcome::NewConcept(SurrogateId::new(1)));
        assert_eq!(index.concept(r"\A\").unwrap().surrogate_id, Some(SurrogateId::new(0)));
        assert_eq!(index.concept(r"\A\B\").unwrap().surrogate_id, Some(SurrogateId::new(1)));
    }

    #[test]
    fn test_duplicate_concept_keeps_id_and_last_row() {
        let mut index = OntologyIndex::new();
        index.insert(node(r"\A\", "concept_cd"), CONCEPT);
        index.insert(node(r"\B\", "concept_cd"), CONCEPT);

        let mut second = node(r"\A\", "concept_cd");
        second.name = "renamed".to_string();
        assert_eq!(index.insert(second, CONCEPT), InsertOutcome::DuplicateConcept(SurrogateId::new(0)));

        assert_eq!(index.num_concepts(), 2);
        assert_eq!(index.concept(r"\A\").unwrap().name, "renamed");
        assert_eq!(index.allocator().allocated(NodeKind::Concept), 2);

        // Position is kept, so iteration stays in ID order.
        let ids: Vec<_> = index.concept_nodes().map(|n| n.surrogate_id.unwrap().value()).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_modifier_rows_share_bucket_and_id() {
        let mut index = OntologyIndex::new();
        assert_eq!(index.insert(node(r"\M\", "modifier_cd"), MODIFIER), InsertOutcome::NewModifier(SurrogateId::new(0)));
        assert_eq!(index.insert(node(r"\M\", "modifier_cd"), MODIFIER), InsertOutcome::ModifierRow(SurrogateId::new(0)));

        let bucket = index.modifier_bucket(r"\M\").unwrap();
        assert_eq!(bucket.len(), 2);
        assert!(bucket.rows().iter().all(|r| r.surrogate_id == Some(SurrogateId::new(0))));
        assert_eq!(index.num_modifier_paths(), 1);
        assert_eq!(index.num_modifier_rows(), 2);
    }

    #[test]
    fn test_kinds_have_separate_id_spaces() {
        let mut index = OntologyIndex::new();
        index.insert(node(r"\A\", "concept_cd"), CONCEPT);
        index.insert(node(r"\B\", "concept_cd"), CONCEPT);
        let outcome = index.insert(node(r"\M\", "modifier_cd"), MODIFIER);
        assert_eq!(outcome.surrogate_id(), Some(SurrogateId::new(0)));
    }

    #[test]
    fn test_public_duplicate_replaces() {
        let mut index = OntologyIndex::new();
        index.insert(node(r"\P\", "concept_cd"), Classification::Public);
        let outcome = index.insert(node(r"\P\", "concept_cd"), Classification::Public);
        assert_eq!(outcome, InsertOutcome::Public { replaced: true });
        assert_eq!(index.num_public(), 1);
    }

    #[test]
    fn test_rekey_public_preserves_order() {
        let mut index = OntologyIndex::new();
        index.insert(node(r"\X\", "concept_cd"), Classification::Public);
        index.insert(node(r"\Y\", "concept_cd"), Classification::Public);
        index.rekey_public(|mut n| {
            if n.path.as_str() == r"\X\" {
                n.path = OntologyPath::parse(r"\X2\").unwrap();
            }
            n
        });
        let paths: Vec<_> = index.public_nodes().map(|n| n.path.to_string()).collect();
        assert_eq!(paths, vec![r"\X2\".to_string(), r"\Y\".to_string()]);
        assert!(index.public(r"\X\").is_none());
    }

    proptest! {
        #[test]
        fn prop_ids_are_dense_per_kind(rows in prop::collection::vec((0u8..12, any::<bool>()), 0..60)) {
            let mut index = OntologyIndex::new();
            for (n, is_modifier) in &rows {
                let (path, class, fact) = if *is_modifier {
                    (format!(r"\M{n}\"), MODIFIER, "modifier_cd")
                } else {
                    (format!(r"\C{n}\"), CONCEPT, "concept_cd")
                };
                index.insert(node(&path, fact), class);
            }

            let concept_ids: Vec<u64> = index.concept_nodes().map(|n| n.surrogate_id.unwrap().value()).collect();
            let modifier_ids: Vec<u64> = index.modifier_buckets().map(|(_, b)| b.surrogate_id().value()).collect();
            prop_assert_eq!(concept_ids, (0..index.num_concepts() as u64).collect::<Vec<_>>());
            prop_assert_eq!(modifier_ids, (0..index.num_modifier_paths() as u64).collect::<Vec<_>>());
            prop_assert_eq!(index.num_modifier_rows(), rows.iter().filter(|(_, m)| *m).count());
        }
    }

    #[test]
    fn test_interleaved_duplicates_keep_first_ids() {
        let mut index = OntologyIndex::new();
        for path in [r"\A\", r"\B\", r"\A\", r"\C\", r"\B\", r"\A\"] {
            index.insert(node(path, "concept_cd"), CONCEPT);
        }
        assert_eq!(index.concept(r"\A\").unwrap().surrogate_id, Some(SurrogateId::new(0)));
        assert_eq!(index.concept(r"\B\").unwrap().surrogate_id, Some(SurrogateId::new(1)));
        assert_eq!(index.concept(r"\C\").unwrap().surrogate_id, Some(SurrogateId::new(2)));
        assert_eq!(index.allocator().allocated(NodeKind::Concept), 3);
    }
}
