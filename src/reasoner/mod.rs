//! Reasoning engine seam.
//!
//! Classification itself is delegated to a [`ReasoningEngine`]: something that
//! owns a logical model, buffers changes to it, precomputes the class hierarchy
//! on request, and answers direct-supertype queries. The session drives the
//! engine; it never computes subsumption itself.
//!
//! [`structural::StructuralReasoner`] is the engine bundled with the crate.

pub mod structural;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::axiom::Axiom;
use crate::concept::ConceptId;
use crate::error::EngineResult;

/// Outcome of an add or remove on the engine's model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeApplied {
    /// Every axiom in the batch changed the model.
    Successfully,
    /// Some axioms changed the model; others were already present (add) or
    /// absent (remove).
    Partially,
    /// Nothing changed.
    NoOperation,
    /// The engine refused the change.
    Unsuccessfully,
}

impl std::fmt::Display for ChangeApplied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeApplied::Successfully => write!(f, "successfully"),
            ChangeApplied::Partially => write!(f, "partially"),
            ChangeApplied::NoOperation => write!(f, "no operation"),
            ChangeApplied::Unsuccessfully => write!(f, "unsuccessfully"),
        }
    }
}

/// Which model change an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeOperation {
    Add,
    Remove,
}

impl std::fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeOperation::Add => write!(f, "add"),
            ChangeOperation::Remove => write!(f, "remove"),
        }
    }
}

/// A description-logic reasoning capability over a mutable model.
///
/// All calls are blocking. Implementations may parallelise internally, but a
/// single engine instance serves one session at a time.
pub trait ReasoningEngine {
    /// Add a batch of axioms to the model in one change.
    fn add_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied>;

    /// Remove a batch of axioms from the model in one change.
    fn remove_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied>;

    /// Make pending model changes visible to the next precompute.
    fn flush(&mut self) -> EngineResult<()>;

    /// Compute the class hierarchy of the flushed model.
    fn precompute_class_hierarchy(&mut self) -> EngineResult<()>;

    /// Direct inferred supertypes of `concept`: the transitive reduction of its
    /// ancestors, excluding the concept itself and its equivalents.
    fn direct_super_types(&self, concept: ConceptId) -> EngineResult<BTreeSet<ConceptId>>;

    /// Number of axioms currently in the model, flushed or not.
    fn axiom_count(&self) -> usize;
}

impl<E: ReasoningEngine + ?Sized> ReasoningEngine for Box<E> {
    fn add_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
        (**self).add_axioms(axioms)
    }

    fn remove_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
        (**self).remove_axioms(axioms)
    }

    fn flush(&mut self) -> EngineResult<()> {
        (**self).flush()
    }

    fn precompute_class_hierarchy(&mut self) -> EngineResult<()> {
        (**self).precompute_class_hierarchy()
    }

    fn direct_super_types(&self, concept: ConceptId) -> EngineResult<BTreeSet<ConceptId>> {
        (**self).direct_super_types(concept)
    }

    fn axiom_count(&self) -> usize {
        (**self).axiom_count()
    }
}
