//! Transactional what-if classification.
//!
//! A [`ClassificationSession`] owns the axiom store and the reasoning engine.
//! Each call to [`classify`](ClassificationSession::classify) is one trial:
//!
//! 1. strip `|term|` annotations and parse every candidate (no mutation yet)
//! 2. inject all candidate axioms in one batch
//! 3. flush and precompute the class hierarchy once for the whole batch
//! 4. read the direct inferred supertypes of each candidate's principal concept
//! 5. remove the injected axioms, on success and on failure alike
//!
//! Either every candidate in the batch gets a result or the trial fails as a whole.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::axiom::syntax::{AxiomDeserialiser, FunctionalSyntaxDeserialiser};
use crate::axiom::{Axiom, strip_annotations};
use crate::concept::ConceptId;
use crate::config::ClassifierConfig;
use crate::error::{LoadResult, SessionError, SessionResult};
use crate::hierarchy::AncestorGraph;
use crate::loader::{BaseModelLoader, LoadStats};
use crate::reasoner::ReasoningEngine;
use crate::store::AxiomStore;
use crate::timer::Stopwatch;

/// A candidate expression and the label it is reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Functional-syntax axiom text, annotations allowed.
    pub expression: String,
    /// Identifier used for provenance and reporting.
    pub label: String,
}

impl Candidate {
    pub fn new(expression: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            label: label.into(),
        }
    }

    /// Parse a candidates document: blocks separated by blank lines, each
    /// optionally headed by a `# <label>` line. The remaining lines of a block
    /// are joined into one expression. Unlabelled blocks are numbered from 1.
    pub fn parse_batch(text: &str) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let mut label: Option<String> = None;
        let mut expression = String::new();

        let mut flush = |label: &mut Option<String>, expression: &mut String| {
            if !expression.is_empty() {
                let n = candidates.len() + 1;
                candidates.push(Candidate::new(
                    std::mem::take(expression),
                    label.take().unwrap_or_else(|| n.to_string()),
                ));
            }
            *label = None;
        };

        for line in text.lines() {
            let line = line.trim();
            let header = expression.is_empty() && label.is_none();
            if line.is_empty() {
                flush(&mut label, &mut expression);
            } else if let (true, Some(rest)) = (header, line.strip_prefix('#')) {
                label = Some(rest.trim().to_string());
            } else {
                if !expression.is_empty() {
                    expression.push(' ');
                }
                expression.push_str(line);
            }
        }
        flush(&mut label, &mut expression);
        candidates
    }

    /// Pair expressions with labels by position. With no labels at all the
    /// candidates are numbered from 1; otherwise the counts must match.
    pub fn labelled(expressions: Vec<String>, labels: Vec<String>) -> SessionResult<Vec<Candidate>> {
        if labels.is_empty() {
            return Ok(expressions
                .into_iter()
                .enumerate()
                .map(|(i, expr)| Candidate::new(expr, (i + 1).to_string()))
                .collect());
        }
        if labels.len() != expressions.len() {
            return Err(SessionError::LabelCountMismatch {
                expressions: expressions.len(),
                labels: labels.len(),
            });
        }
        Ok(expressions
            .into_iter()
            .zip(labels)
            .map(|(expr, label)| Candidate::new(expr, label))
            .collect())
    }
}

/// Inferred placement of one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedCandidate {
    /// The candidate's label.
    pub label: String,
    /// The concept the candidate axiom defines.
    pub concept: ConceptId,
    /// Direct inferred supertypes, in ascending id order.
    pub supertypes: BTreeSet<ConceptId>,
}

/// Outcome of one trial, in candidate submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    entries: Vec<ClassifiedCandidate>,
}

impl ClassificationResult {
    /// Entries in submission order.
    pub fn entries(&self) -> &[ClassifiedCandidate] {
        &self.entries
    }

    /// Direct supertypes inferred for `concept`, if it was a candidate.
    pub fn supertypes_of(&self, concept: ConceptId) -> Option<&BTreeSet<ConceptId>> {
        self.entries
            .iter()
            .find(|e| e.concept == concept)
            .map(|e| &e.supertypes)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every (candidate, direct supertype) pair, ready to feed an [`AncestorGraph`].
    pub fn edges(&self) -> impl Iterator<Item = (ConceptId, ConceptId)> + '_ {
        self.entries
            .iter()
            .flat_map(|e| e.supertypes.iter().map(move |&parent| (e.concept, parent)))
    }
}

/// A parsed candidate, ready to inject.
struct Prepared {
    label: String,
    concept: ConceptId,
    axiom: Axiom,
}

/// Single-writer session over one store and one engine model.
pub struct ClassificationSession<
    E: ReasoningEngine,
    D: AxiomDeserialiser = FunctionalSyntaxDeserialiser,
> {
    store: AxiomStore,
    engine: E,
    deserialiser: D,
    config: ClassifierConfig,
}

impl<E: ReasoningEngine, D: AxiomDeserialiser> ClassificationSession<E, D> {
    /// Wrap an already loaded store and its engine.
    pub fn new(store: AxiomStore, engine: E, deserialiser: D, config: ClassifierConfig) -> Self {
        Self {
            store,
            engine,
            deserialiser,
            config,
        }
    }

    /// Load the base model from a release file and classify it once, so the
    /// base hierarchy can be queried before any trial runs.
    pub fn from_release(
        path: &Path,
        mut engine: E,
        deserialiser: D,
        config: ClassifierConfig,
    ) -> LoadResult<(Self, LoadStats)> {
        let mut timer = Stopwatch::start("base model");
        let mut store = AxiomStore::new();
        let stats = BaseModelLoader::with_config(&deserialiser, &config)
            .load_path(path, &mut store, &mut engine)?;
        timer.checkpoint("create model");

        engine.flush().map_err(crate::error::StoreError::from)?;
        engine
            .precompute_class_hierarchy()
            .map_err(crate::error::StoreError::from)?;
        timer.checkpoint("classify model");
        timer.finish();

        Ok((Self::new(store, engine, deserialiser, config), stats))
    }

    /// Classify a batch of candidates in one trial.
    ///
    /// An empty batch returns an empty result without touching the engine.
    pub fn classify(&mut self, candidates: &[Candidate]) -> SessionResult<ClassificationResult> {
        if candidates.is_empty() {
            tracing::debug!("empty candidate batch, nothing to classify");
            return Ok(ClassificationResult::default());
        }

        let prepared = self.prepare(candidates)?;
        let mut timer = Stopwatch::start("classify candidates");

        let axioms: Vec<Axiom> = prepared.iter().map(|p| p.axiom.clone()).collect();
        let mut trial = self.store.begin_trial(&mut self.engine, axioms)?;

        let engine = trial.engine();
        engine.flush()?;
        engine.precompute_class_hierarchy()?;
        timer.checkpoint("precompute");

        let mut entries = Vec::with_capacity(prepared.len());
        for p in prepared {
            let supertypes = engine.direct_super_types(p.concept)?;
            tracing::debug!(
                label = %p.label,
                concept = %p.concept,
                supertypes = supertypes.len(),
                "candidate classified"
            );
            entries.push(ClassifiedCandidate {
                label: p.label,
                concept: p.concept,
                supertypes,
            });
        }

        trial.release()?;
        timer.finish();
        Ok(ClassificationResult { entries })
    }

    /// Strip, parse, and validate every candidate before any model change.
    fn prepare(&self, candidates: &[Candidate]) -> SessionResult<Vec<Prepared>> {
        let mut seen = HashSet::new();
        let mut prepared = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let text = if self.config.strip_annotations {
                strip_annotations(&candidate.expression)
            } else {
                candidate.expression.as_str().into()
            };
            let axiom = self
                .deserialiser
                .deserialise(&text, &candidate.label)
                .map_err(|source| SessionError::Parse {
                    label: candidate.label.clone(),
                    source,
                })?;
            if !axiom.is_class_axiom() {
                return Err(SessionError::NotAClassAxiom {
                    label: candidate.label.clone(),
                });
            }
            let concept =
                axiom
                    .principal_concept()
                    .ok_or_else(|| SessionError::NoPrincipalConcept {
                        label: candidate.label.clone(),
                    })?;
            if !seen.insert(concept) {
                return Err(SessionError::DuplicateCandidate {
                    concept: concept.get(),
                });
            }
            prepared.push(Prepared {
                label: candidate.label.clone(),
                concept,
                axiom,
            });
        }
        Ok(prepared)
    }

    /// The axiom store.
    pub fn store(&self) -> &AxiomStore {
        &self.store
    }

    /// The reasoning engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable engine access. A released trial leaves the engine flushed, so
    /// precompute again before querying the base hierarchy.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Feed the direct supertypes of every base concept into `graph`.
    ///
    /// Precomputes the base hierarchy first if a trial discarded it. Returns
    /// the number of edges added.
    pub fn populate_ancestors(&mut self, graph: &mut AncestorGraph) -> SessionResult<usize> {
        self.engine.flush()?;
        self.engine.precompute_class_hierarchy()?;

        let before = graph.edge_count();
        for concept in self.store.class_signature() {
            for parent in self.engine.direct_super_types(concept)? {
                graph.add_edge(concept, parent);
            }
        }
        let added = graph.edge_count() - before;
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            added,
            "ancestor graph populated"
        );
        Ok(added)
    }

    /// The session configuration.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Take the store and engine back.
    pub fn into_parts(self) -> (AxiomStore, E) {
        (self.store, self.engine)
    }
}

impl<E: ReasoningEngine, D: AxiomDeserialiser> std::fmt::Debug for ClassificationSession<E, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationSession")
            .field("base_axioms", &self.store.base().len())
            .field("engine_axioms", &self.engine.axiom_count())
            .finish()
    }
}
