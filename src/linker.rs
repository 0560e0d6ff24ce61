//! Ancestor relinking for the sensitive partitions.
//!
//! Once human-readable paths are stripped from the published copy, the
//! access-controlled copy keeps hierarchy only through child-ID lists. The
//! linker rebuilds those lists from path prefixes.

use serde::{Deserialize, Serialize};

use crate::index::OntologyIndex;
use crate::types::{OntologyPath, SurrogateId};

/// How far up the path a descendant is linked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDepth {
    /// Link to every sensitive ancestor on the path (transitive closure).
    #[default]
    Transitive,
    /// Link only to the nearest sensitive ancestor.
    Nearest,
}

/// Link counts produced by one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    /// Child IDs appended to concept nodes.
    pub concept_links: usize,
    /// Child IDs appended to modifier buckets (once per bucket, not per row).
    pub modifier_links: usize,
}

/// Rebuilds `child_surrogate_ids` within each sensitive partition.
///
/// ## Algorithm
///
/// For every sensitive node N, in surrogate-ID order:
/// 1. Enumerate the strict ancestors of N's path, nearest first
/// 2. For each ancestor registered as a sensitive node of the same kind,
///    append N's surrogate ID to its child list
/// 3. With [`LinkDepth::Nearest`], stop after the first match
///
/// Concepts and modifiers never link across kinds. Modifier rows sharing a
/// path are linked once per path, so a descendant appears at most once in
/// each ancestor's list. Child lists come out ascending.
#[derive(Debug, Clone, Copy, Default)]
pub struct AncestorLinker {
    depth: LinkDepth,
}

impl AncestorLinker {
    /// Create a linker.
    pub fn new(depth: LinkDepth) -> Self {
        Self { depth }
    }

    /// The configured depth.
    pub fn depth(&self) -> LinkDepth {
        self.depth
    }

    /// Link both sensitive partitions in place.
    ///
    /// Must run after classification has finished: a descendant seen before
    /// its ancestor is registered would otherwise be missed.
    pub fn link(&self, index: &mut OntologyIndex) -> LinkReport {
        let report = LinkReport {
            concept_links: self.link_concepts(index),
            modifier_links: self.link_modifiers(index),
        };
        tracing::info!(
            depth = ?self.depth,
            concept_links = report.concept_links,
            modifier_links = report.modifier_links,
            "ancestor linking complete"
        );
        report
    }

    fn link_concepts(&self, index: &mut OntologyIndex) -> usize {
        let concepts = index.concepts_mut();
        let descendants: Vec<(OntologyPath, SurrogateId)> = concepts
            .values()
            .filter_map(|n| n.surrogate_id.map(|id| (n.path.clone(), id)))
            .collect();

        let mut links = 0;
        for (path, id) in descendants {
            for ancestor in path.ancestors() {
                if let Some(parent) = concepts.get_mut(ancestor.as_str()) {
                    parent.child_surrogate_ids.push(id);
                    links += 1;
                    tracing::debug!(ancestor = %ancestor, child = %id, "linked concept");
                    if self.depth == LinkDepth::Nearest {
                        break;
                    }
                }
            }
        }
        links
    }

    fn link_modifiers(&self, index: &mut OntologyIndex) -> usize {
        let modifiers = index.modifiers_mut();
        let descendants: Vec<(OntologyPath, SurrogateId)> = modifiers
            .iter()
            .map(|(path, bucket)| (path.clone(), bucket.surrogate_id()))
            .collect();

        let mut links = 0;
        for (path, id) in descendants {
            for ancestor in path.ancestors() {
                if let Some(bucket) = modifiers.get_mut(ancestor.as_str()) {
                    bucket.push_child(id);
                    links += 1;
                    tracing::debug!(ancestor = %ancestor, child = %id, "linked modifier");
                    if self.depth == LinkDepth::Nearest {
                        break;
                    }
                }
            }
        }
        links
    }
}
