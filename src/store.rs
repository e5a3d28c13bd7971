//! Axiom store: the base model plus transient trial axioms.
//!
//! The base set is loaded once and mirrored into the reasoning engine with a
//! single bulk add. Trials inject candidate axioms through a [`TrialGuard`],
//! which removes them from the engine on every exit path: explicitly via
//! [`TrialGuard::release`], or on drop if the trial bails out early.

use std::collections::{BTreeSet, HashSet};

use crate::axiom::Axiom;
use crate::concept::ConceptId;
use crate::error::{StoreError, StoreResult};
use crate::reasoner::{ChangeApplied, ChangeOperation, ReasoningEngine};

/// Base axioms plus bookkeeping for the axioms of the trial in flight.
#[derive(Debug, Default)]
pub struct AxiomStore {
    base: HashSet<Axiom>,
    /// Candidates added by the current trial that were not already in `base`.
    transient: Vec<Axiom>,
}

impl AxiomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the base axiom set with `engine` in one batch.
    ///
    /// Fails if a base set was already loaded, or if the engine did not apply
    /// the whole batch.
    pub fn load_base<E: ReasoningEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        axioms: HashSet<Axiom>,
    ) -> StoreResult<usize> {
        if !self.base.is_empty() {
            return Err(StoreError::BaseAlreadyLoaded {
                count: self.base.len(),
            });
        }
        let batch: Vec<Axiom> = axioms.iter().cloned().collect();
        let outcome = engine.add_axioms(&batch)?;
        // An empty batch is a no-op, not a failure.
        if outcome != ChangeApplied::Successfully && !batch.is_empty() {
            return Err(StoreError::TransactionFailed {
                operation: ChangeOperation::Add,
                outcome,
                count: batch.len(),
            });
        }
        self.base = axioms;
        Ok(self.base.len())
    }

    /// The immutable base set.
    pub fn base(&self) -> &HashSet<Axiom> {
        &self.base
    }

    /// Axioms injected by the trial in flight; empty between trials.
    pub fn transient(&self) -> &[Axiom] {
        &self.transient
    }

    /// Number of axioms in base ∪ transient.
    pub fn len(&self) -> usize {
        self.base.len() + self.transient.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every named class occurring in a base class axiom.
    pub fn class_signature(&self) -> BTreeSet<ConceptId> {
        self.base
            .iter()
            .flat_map(Axiom::class_signature)
            .collect()
    }

    /// Start a trial by adding `axioms` to the engine's model in one batch.
    ///
    /// The returned guard owns the rollback. If the engine reports anything but
    /// a full application the guard is dropped here, which removes whatever
    /// did get added, and `TransactionFailed` is returned. An engine error on
    /// the add leaves nothing to roll back.
    ///
    /// The guard borrows the store mutably, so at most one trial is in flight.
    pub fn begin_trial<'a, E: ReasoningEngine + ?Sized>(
        &'a mut self,
        engine: &'a mut E,
        axioms: Vec<Axiom>,
    ) -> StoreResult<TrialGuard<'a, E>> {
        // Only axioms absent from the base are ours to remove later.
        self.transient = axioms
            .iter()
            .filter(|ax| !self.base.contains(*ax))
            .cloned()
            .collect();

        let outcome = match engine.add_axioms(&axioms) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.transient.clear();
                return Err(e.into());
            }
        };

        let guard = TrialGuard {
            store: self,
            engine,
            released: false,
        };
        if outcome != ChangeApplied::Successfully {
            return Err(StoreError::TransactionFailed {
                operation: ChangeOperation::Add,
                outcome,
                count: axioms.len(),
            });
        }
        tracing::debug!(axioms = axioms.len(), "trial axioms injected");
        Ok(guard)
    }
}

/// Scoped ownership of a trial's transient axioms.
///
/// Dropping the guard without calling [`release`](TrialGuard::release) still
/// removes the transient axioms; a failure to do so is logged because `Drop`
/// cannot return it.
pub struct TrialGuard<'a, E: ReasoningEngine + ?Sized> {
    store: &'a mut AxiomStore,
    engine: &'a mut E,
    released: bool,
}

impl<E: ReasoningEngine + ?Sized> TrialGuard<'_, E> {
    /// The engine, for flushing, precomputing, and querying during the trial.
    pub fn engine(&mut self) -> &mut E {
        self.engine
    }

    /// Axioms this trial will remove on release.
    pub fn injected(&self) -> &[Axiom] {
        &self.store.transient
    }

    /// Remove the trial's axioms and report whether the engine applied the removal.
    ///
    /// The engine is flushed afterwards, so the trial's hierarchy is discarded
    /// and queries need a fresh precompute of the base model.
    pub fn release(mut self) -> StoreResult<()> {
        self.released = true;
        self.rollback()
    }

    fn rollback(&mut self) -> StoreResult<()> {
        let axioms = std::mem::take(&mut self.store.transient);
        if axioms.is_empty() {
            return Ok(());
        }
        let outcome = self.engine.remove_axioms(&axioms)?;
        self.engine.flush()?;
        tracing::debug!(axioms = axioms.len(), %outcome, "trial axioms removed");
        if outcome != ChangeApplied::Successfully {
            return Err(StoreError::TransactionFailed {
                operation: ChangeOperation::Remove,
                outcome,
                count: axioms.len(),
            });
        }
        Ok(())
    }
}

impl<E: ReasoningEngine + ?Sized> Drop for TrialGuard<'_, E> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.rollback() {
            tracing::error!(error = %e, "failed to roll back trial axioms");
        }
    }
}

impl<E: ReasoningEngine + ?Sized> std::fmt::Debug for TrialGuard<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialGuard")
            .field("transient", &self.store.transient.len())
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axiom::syntax::{AxiomDeserialiser, FunctionalSyntaxDeserialiser};
    use crate::error::{EngineError, EngineResult};
    use crate::reasoner::structural::StructuralReasoner;

    fn ax(text: &str) -> Axiom {
        FunctionalSyntaxDeserialiser::new()
            .deserialise(text, "t")
            .unwrap()
    }

    fn loaded() -> (AxiomStore, StructuralReasoner) {
        let mut store = AxiomStore::new();
        let mut engine = StructuralReasoner::new();
        let base: HashSet<Axiom> = [ax("SubClassOf(:2 :1)"), ax("SubClassOf(:3 :1)")]
            .into_iter()
            .collect();
        store.load_base(&mut engine, base).unwrap();
        (store, engine)
    }

    #[test]
    fn base_load_registers_every_axiom() {
        let (store, engine) = loaded();
        assert_eq!(store.base().len(), 2);
        assert_eq!(engine.axiom_count(), 2);
        assert!(store.transient().is_empty());
        let sig: Vec<u64> = store.class_signature().into_iter().map(ConceptId::get).collect();
        assert_eq!(sig, vec![1, 2, 3]);
    }

    #[test]
    fn base_loads_once() {
        let (mut store, mut engine) = loaded();
        let again: HashSet<Axiom> = [ax("SubClassOf(:4 :1)")].into_iter().collect();
        assert!(matches!(
            store.load_base(&mut engine, again),
            Err(StoreError::BaseAlreadyLoaded { count: 2 })
        ));
    }

    #[test]
    fn release_restores_base() {
        let (mut store, mut engine) = loaded();
        let before = engine.model().clone();
        let guard = store
            .begin_trial(&mut engine, vec![ax("SubClassOf(:9 :2)")])
            .unwrap();
        assert_eq!(guard.injected().len(), 1);
        guard.release().unwrap();
        assert_eq!(engine.model(), &before);
        assert!(store.transient().is_empty());
    }

    #[test]
    fn release_discards_trial_hierarchy() {
        let (mut store, mut engine) = loaded();
        engine.flush().unwrap();
        engine.precompute_class_hierarchy().unwrap();

        let mut guard = store
            .begin_trial(&mut engine, vec![ax("SubClassOf(:9 :2)")])
            .unwrap();
        guard.engine().flush().unwrap();
        guard.engine().precompute_class_hierarchy().unwrap();
        assert_eq!(
            guard.engine().direct_super_types(ConceptId::new(9).unwrap()).unwrap(),
            BTreeSet::from([ConceptId::new(2).unwrap()])
        );
        guard.release().unwrap();

        assert!(!engine.is_precomputed());
        assert!(matches!(
            engine.direct_super_types(ConceptId::new(9).unwrap()),
            Err(EngineError::NotPrecomputed)
        ));
        engine.precompute_class_hierarchy().unwrap();
        assert!(matches!(
            engine.direct_super_types(ConceptId::new(9).unwrap()),
            Err(EngineError::UnknownConcept { concept: 9 })
        ));
    }

    #[test]
    fn drop_restores_base() {
        let (mut store, mut engine) = loaded();
        let before = engine.model().clone();
        {
            let mut guard = store
                .begin_trial(&mut engine, vec![ax("SubClassOf(:9 :2)")])
                .unwrap();
            assert_eq!(guard.engine().axiom_count(), 3);
        }
        assert_eq!(engine.model(), &before);
        assert!(store.transient().is_empty());
    }

    #[test]
    fn duplicate_of_base_fails_without_removing_base_axiom() {
        let (mut store, mut engine) = loaded();
        let before = engine.model().clone();
        let err = store
            .begin_trial(
                &mut engine,
                vec![ax("SubClassOf(:2 :1)"), ax("SubClassOf(:9 :1)")],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::TransactionFailed {
                operation: ChangeOperation::Add,
                outcome: ChangeApplied::Partially,
                count: 2
            }
        ));
        assert_eq!(engine.model(), &before);
        assert!(store.transient().is_empty());
    }

    /// Structural engine with scripted add and remove failures.
    #[derive(Default)]
    struct Scripted {
        inner: StructuralReasoner,
        fail_add: bool,
        short_remove: bool,
        removals: usize,
    }

    impl ReasoningEngine for Scripted {
        fn add_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
            if self.fail_add {
                return Err(EngineError::Failure {
                    message: "model locked".into(),
                });
            }
            self.inner.add_axioms(axioms)
        }
        fn remove_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
            self.removals += 1;
            let outcome = self.inner.remove_axioms(axioms)?;
            Ok(if self.short_remove {
                ChangeApplied::Partially
            } else {
                outcome
            })
        }
        fn flush(&mut self) -> EngineResult<()> {
            self.inner.flush()
        }
        fn precompute_class_hierarchy(&mut self) -> EngineResult<()> {
            self.inner.precompute_class_hierarchy()
        }
        fn direct_super_types(&self, concept: ConceptId) -> EngineResult<BTreeSet<ConceptId>> {
            self.inner.direct_super_types(concept)
        }
        fn axiom_count(&self) -> usize {
            self.inner.axiom_count()
        }
    }

    #[test]
    fn incomplete_removal_is_reported_on_release() {
        let mut store = AxiomStore::new();
        let mut engine = Scripted {
            short_remove: true,
            ..Scripted::default()
        };
        let guard = store
            .begin_trial(&mut engine, vec![ax("SubClassOf(:9 :2)")])
            .unwrap();
        let err = guard.release().unwrap_err();
        assert!(matches!(
            err,
            StoreError::TransactionFailed {
                operation: ChangeOperation::Remove,
                outcome: ChangeApplied::Partially,
                count: 1
            }
        ));
        assert!(store.transient().is_empty());
        assert_eq!(engine.removals, 1);
    }

    #[test]
    fn incomplete_removal_on_drop_is_logged_not_raised() {
        let mut store = AxiomStore::new();
        let mut engine = Scripted {
            short_remove: true,
            ..Scripted::default()
        };
        {
            let _guard = store
                .begin_trial(&mut engine, vec![ax("SubClassOf(:9 :2)")])
                .unwrap();
        }
        assert!(store.transient().is_empty());
        assert_eq!(engine.removals, 1);
        assert_eq!(engine.axiom_count(), 0);
    }

    #[test]
    fn failed_add_has_nothing_to_roll_back() {
        let mut store = AxiomStore::new();
        let mut engine = Scripted {
            fail_add: true,
            ..Scripted::default()
        };
        let err = store
            .begin_trial(&mut engine, vec![ax("SubClassOf(:9 :2)")])
            .unwrap_err();
        assert!(matches!(err, StoreError::Engine(EngineError::Failure { .. })));
        assert!(store.transient().is_empty());
        assert_eq!(engine.removals, 0);
    }
}
