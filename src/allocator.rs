//! Surrogate ID allocation.

use serde::{Deserialize, Serialize};

use crate::types::{NodeKind, SurrogateId};

/// Hands out dense, zero-based surrogate IDs with one counter per node kind.
///
/// The allocator only counts; deciding whether a path is new is the index's
/// job. Each call to [`allocate`](Self::allocate) consumes exactly one ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurrogateIdAllocator {
    next_concept: u64,
    next_modifier: u64,
}

impl SurrogateIdAllocator {
    /// Both counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next ID for `kind`.
    pub fn allocate(&mut self, kind: NodeKind) -> SurrogateId {
        let counter = match kind {
            NodeKind::Concept => &mut self.next_concept,
            NodeKind::Modifier => &mut self.next_modifier,
        };
        let id = SurrogateId::new(*counter);
        *counter += 1;
        id
    }

    /// Number of IDs handed out for `kind`.
    pub fn allocated(&self, kind: NodeKind) -> u64 {
        match kind {
            NodeKind::Concept => self.next_concept,
            NodeKind::Modifier => self.next_modifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let mut alloc = SurrogateIdAllocator::new();
        assert_eq!(alloc.allocate(NodeKind::Concept), SurrogateId::new(0));
        assert_eq!(alloc.allocate(NodeKind::Modifier), SurrogateId::new(0));
    }

    #[test]
    fn test_counters_are_independent() {
        let mut alloc = SurrogateIdAllocator::new();
        alloc.allocate(NodeKind::Concept);
        alloc.allocate(NodeKind::Concept);
        assert_eq!(alloc.allocate(NodeKind::Modifier), SurrogateId::new(0));
        assert_eq!(alloc.allocate(NodeKind::Concept), SurrogateId::new(2));
        assert_eq!(alloc.allocated(NodeKind::Concept), 3);
        assert_eq!(alloc.allocated(NodeKind::Modifier), 1);
    }
}
