//! Ancestor closure cache.
//!
//! [`AncestorGraph`] stores parent → child edges between concepts and answers
//! transitive ancestor queries without going back to the reasoning engine. It
//! is fed from direct-supertype facts that were already computed elsewhere and
//! is never the source of truth for subsumption.
//!
//! No cycle detection is performed. Queries still terminate on cyclic input,
//! but the returned set is then unspecified.

use std::collections::{BTreeSet, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;

use crate::concept::ConceptId;

/// Directed parent → child graph over concept identifiers.
#[derive(Debug, Clone, Default)]
pub struct AncestorGraph {
    graph: DiGraphMap<ConceptId, ()>,
}

impl AncestorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `parent` is a direct parent of `child`.
    ///
    /// Both concepts become known nodes. Adding an existing edge is a no-op.
    pub fn add_edge(&mut self, child: ConceptId, parent: ConceptId) {
        self.graph.add_edge(parent, child, ());
    }

    /// All transitive ancestors of `concept`, excluding itself unless a cycle
    /// leads back to it. Unknown concepts have no ancestors.
    pub fn ancestors(&self, concept: ConceptId) -> BTreeSet<ConceptId> {
        let mut ancestors = BTreeSet::new();
        if !self.graph.contains_node(concept) {
            return ancestors;
        }

        let mut visited: HashSet<ConceptId> = HashSet::from([concept]);
        let mut queue: VecDeque<ConceptId> = VecDeque::from([concept]);

        while let Some(node) = queue.pop_front() {
            for parent in self.graph.neighbors_directed(node, Direction::Incoming) {
                ancestors.insert(parent);
                if visited.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        ancestors
    }

    /// Direct parents of `concept`.
    pub fn parents(&self, concept: ConceptId) -> BTreeSet<ConceptId> {
        if !self.graph.contains_node(concept) {
            return BTreeSet::new();
        }
        self.graph
            .neighbors_directed(concept, Direction::Incoming)
            .collect()
    }

    /// Whether `concept` appears in any edge.
    pub fn contains(&self, concept: ConceptId) -> bool {
        self.graph.contains_node(concept)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Extend from `(child, parent)` pairs.
impl Extend<(ConceptId, ConceptId)> for AncestorGraph {
    fn extend<I: IntoIterator<Item = (ConceptId, ConceptId)>>(&mut self, edges: I) {
        for (child, parent) in edges {
            self.add_edge(child, parent);
        }
    }
}
