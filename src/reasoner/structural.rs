//! Structural subsumption engine.
//!
//! A lightweight [`ReasoningEngine`] for the EL fragment used by the release:
//!
//! 1. **Told subsumption**: named conjuncts of `SubClassOf` / `EquivalentClasses`
//!    become child → parent edges in a `petgraph` graph.
//! 2. **Structural subsumption**: every non-atomic left-hand side (a class
//!    definition or a general concept inclusion) becomes a rule. A class that
//!    satisfies the rule's conjunction, with existentials matched through the
//!    property hierarchy and transitive properties, gains the rule's named
//!    right-hand side as a parent.
//! 3. Steps are iterated to a fixpoint; closures are computed in parallel with
//!    `rayon`.
//!
//! The engine is sound for the constructs it understands but not complete:
//! property chains, reflexivity, and existentials on the right-hand side of a
//! general concept inclusion are kept in the model and ignored when classifying.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use rayon::prelude::*;

use crate::axiom::{Axiom, AxiomKind, ClassExpression, Literal};
use crate::concept::ConceptId;
use crate::error::{EngineError, EngineResult};

use super::{ChangeApplied, ReasoningEngine};

/// Recursion bound for filler matching through transitive properties.
const MAX_FILLER_DEPTH: usize = 32;

/// A class expression flattened into named conjuncts, existentials, and data values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Conjunction {
    names: BTreeSet<ConceptId>,
    exists: Vec<(ConceptId, Conjunction)>,
    values: Vec<(ConceptId, Literal)>,
}

impl Conjunction {
    fn from_expression(expr: &ClassExpression) -> Self {
        let mut conj = Conjunction::default();
        conj.absorb(expr);
        conj
    }

    fn absorb(&mut self, expr: &ClassExpression) {
        match expr {
            ClassExpression::Thing => {}
            ClassExpression::Named(id) => {
                self.names.insert(*id);
            }
            ClassExpression::Intersection(operands) => {
                for op in operands {
                    self.absorb(op);
                }
            }
            ClassExpression::SomeValuesFrom { property, filler } => {
                self.exists
                    .push((*property, Conjunction::from_expression(filler)));
            }
            ClassExpression::HasValue { property, value } => {
                self.values.push((*property, value.clone()));
            }
        }
    }
}

/// A general inclusion: anything satisfying `lhs` is subsumed by every name in `rhs`.
#[derive(Debug, Clone)]
struct Rule {
    lhs: Conjunction,
    rhs: BTreeSet<ConceptId>,
}

/// Reflexive-transitive property hierarchy.
#[derive(Debug, Default)]
struct PropertyHierarchy {
    supers: HashMap<ConceptId, HashSet<ConceptId>>,
    transitive: HashSet<ConceptId>,
}

impl PropertyHierarchy {
    fn build(edges: &[(ConceptId, ConceptId)], transitive: HashSet<ConceptId>) -> Self {
        let mut graph: DiGraphMap<ConceptId, ()> = DiGraphMap::new();
        for &(sub, sup) in edges {
            graph.add_edge(sub, sup, ());
        }
        let supers = graph
            .nodes()
            .map(|p| (p, reachable(&graph, p)))
            .collect();
        Self { supers, transitive }
    }

    /// `sub ⊑ sup`, reflexively.
    fn is_sub(&self, sub: ConceptId, sup: ConceptId) -> bool {
        sub == sup || self.supers.get(&sub).is_some_and(|s| s.contains(&sup))
    }

    fn is_transitive(&self, property: ConceptId) -> bool {
        self.transitive.contains(&property)
    }
}

/// The model compiled into reasoning structures.
#[derive(Debug, Default)]
struct Compiled {
    classes: Vec<ConceptId>,
    told: HashMap<ConceptId, Vec<Conjunction>>,
    rules: Vec<Rule>,
    /// Rules keyed by one of their named conjuncts; only descendants of the key can fire them.
    keyed_rules: HashMap<ConceptId, Vec<usize>>,
    unkeyed_rules: Vec<usize>,
    properties: PropertyHierarchy,
}

impl Compiled {
    fn from_model(model: &HashSet<Axiom>) -> Self {
        let mut classes = BTreeSet::new();
        let mut told: HashMap<ConceptId, Vec<Conjunction>> = HashMap::new();
        let mut rules = Vec::new();
        let mut property_edges = Vec::new();
        let mut transitive = HashSet::new();

        let mut inclusion = |sub: &ClassExpression, sup: &ClassExpression| {
            let sup_conj = Conjunction::from_expression(sup);
            match sub {
                ClassExpression::Named(id) => told.entry(*id).or_default().push(sup_conj),
                other => {
                    if !sup_conj.names.is_empty() {
                        rules.push(Rule {
                            lhs: Conjunction::from_expression(other),
                            rhs: sup_conj.names,
                        });
                    }
                }
            }
        };

        for axiom in model {
            classes.extend(axiom.class_signature());
            match axiom.kind() {
                AxiomKind::SubClassOf { sub, sup } => inclusion(sub, sup),
                AxiomKind::EquivalentClasses(operands) => {
                    for (i, x) in operands.iter().enumerate() {
                        for (j, y) in operands.iter().enumerate() {
                            if i != j {
                                inclusion(x, y);
                            }
                        }
                    }
                }
                AxiomKind::SubObjectPropertyOf { sub, sup } => {
                    if let [single] = sub.as_slice() {
                        property_edges.push((*single, *sup));
                    }
                }
                AxiomKind::SubDataPropertyOf { sub, sup } => property_edges.push((*sub, *sup)),
                AxiomKind::TransitiveObjectProperty(p) => {
                    transitive.insert(*p);
                }
                AxiomKind::ReflexiveObjectProperty(_) => {}
            }
        }

        let mut keyed_rules: HashMap<ConceptId, Vec<usize>> = HashMap::new();
        let mut unkeyed_rules = Vec::new();
        for (idx, rule) in rules.iter().enumerate() {
            match rule.lhs.names.iter().next() {
                Some(key) => keyed_rules.entry(*key).or_default().push(idx),
                None => unkeyed_rules.push(idx),
            }
        }

        Self {
            classes: classes.into_iter().collect(),
            told,
            rules,
            keyed_rules,
            unkeyed_rules,
            properties: PropertyHierarchy::build(&property_edges, transitive),
        }
    }
}

/// Everything known about a class or an anonymous filler.
struct Description<'a> {
    names: HashSet<ConceptId>,
    exists: Vec<&'a (ConceptId, Conjunction)>,
    values: Vec<&'a (ConceptId, Literal)>,
}

/// Result of a precompute: strict ancestor sets per class.
#[derive(Debug, Default)]
struct Taxonomy {
    ancestors: HashMap<ConceptId, HashSet<ConceptId>>,
}

impl Taxonomy {
    fn is_ancestor(&self, ancestor: ConceptId, of: ConceptId) -> bool {
        self.ancestors
            .get(&of)
            .is_some_and(|set| set.contains(&ancestor))
    }

    fn direct_super_types(&self, concept: ConceptId) -> Option<BTreeSet<ConceptId>> {
        let ancestors = self.ancestors.get(&concept)?;
        // Drop equivalents: ancestors that are also descendants.
        let strict: Vec<ConceptId> = ancestors
            .iter()
            .copied()
            .filter(|&a| a != concept && !self.is_ancestor(concept, a))
            .collect();
        let direct = strict
            .iter()
            .copied()
            .filter(|&s| {
                !strict.iter().any(|&t| {
                    t != s && self.is_ancestor(s, t) && !self.is_ancestor(t, s)
                })
            })
            .collect();
        Some(direct)
    }
}

/// Nodes reachable from `start`, excluding `start` unless it lies on a cycle.
fn reachable(graph: &DiGraphMap<ConceptId, ()>, start: ConceptId) -> HashSet<ConceptId> {
    let mut out = HashSet::new();
    let mut dfs = Dfs::new(graph, start);
    while let Some(node) = dfs.next(graph) {
        if node != start {
            out.insert(node);
        }
    }
    if graph
        .neighbors_directed(start, petgraph::Direction::Incoming)
        .any(|pred| out.contains(&pred))
    {
        out.insert(start);
    }
    out
}

/// In-memory EL engine with buffered changes.
///
/// Adds and removes touch the model immediately but only become visible to
/// classification after [`flush`](ReasoningEngine::flush). Queries answer from
/// the last precomputed hierarchy.
#[derive(Debug, Default)]
pub struct StructuralReasoner {
    model: HashSet<Axiom>,
    dirty: bool,
    taxonomy: Option<Taxonomy>,
}

impl StructuralReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current model, including unflushed changes.
    pub fn model(&self) -> &HashSet<Axiom> {
        &self.model
    }

    /// Whether a hierarchy is available for queries.
    pub fn is_precomputed(&self) -> bool {
        self.taxonomy.is_some()
    }

    fn saturate(compiled: &Compiled) -> (Taxonomy, usize) {
        let mut graph: DiGraphMap<ConceptId, ()> = DiGraphMap::new();
        for &class in &compiled.classes {
            graph.add_node(class);
        }
        for (&class, conjunctions) in &compiled.told {
            for conj in conjunctions {
                for &parent in &conj.names {
                    if parent != class {
                        graph.add_edge(class, parent, ());
                    }
                }
            }
        }

        let mut iterations = 0;
        loop {
            iterations += 1;
            let taxonomy = Taxonomy {
                ancestors: compiled
                    .classes
                    .par_iter()
                    .map(|&class| (class, reachable(&graph, class)))
                    .collect(),
            };

            let inferred: Vec<(ConceptId, ConceptId)> = compiled
                .classes
                .par_iter()
                .flat_map_iter(|&class| Self::fire_rules(compiled, &taxonomy, class))
                .collect();

            let mut changed = false;
            for (child, parent) in inferred {
                if !graph.contains_edge(child, parent) {
                    graph.add_edge(child, parent, ());
                    changed = true;
                }
            }
            if !changed {
                return (taxonomy, iterations);
            }
        }
    }

    /// New (class, parent) edges from rules whose left-hand side the class satisfies.
    fn fire_rules(
        compiled: &Compiled,
        taxonomy: &Taxonomy,
        class: ConceptId,
    ) -> Vec<(ConceptId, ConceptId)> {
        let empty = HashSet::new();
        let ancestors = taxonomy.ancestors.get(&class).unwrap_or(&empty);

        let mut candidates: BTreeSet<usize> = compiled.unkeyed_rules.iter().copied().collect();
        for key in std::iter::once(&class).chain(ancestors.iter()) {
            if let Some(idxs) = compiled.keyed_rules.get(key) {
                candidates.extend(idxs.iter().copied());
            }
        }
        if candidates.is_empty() {
            return Vec::new();
        }

        let description = describe_named(compiled, taxonomy, class);
        let mut out = Vec::new();
        for idx in candidates {
            let rule = &compiled.rules[idx];
            let fresh: Vec<ConceptId> = rule
                .rhs
                .iter()
                .copied()
                .filter(|&p| p != class && !ancestors.contains(&p))
                .collect();
            if fresh.is_empty() {
                continue;
            }
            if subsumed_by(compiled, taxonomy, &description, &rule.lhs, 0) {
                out.extend(fresh.into_iter().map(|p| (class, p)));
            }
        }
        out
    }
}

fn describe_named<'a>(
    compiled: &'a Compiled,
    taxonomy: &Taxonomy,
    class: ConceptId,
) -> Description<'a> {
    let mut names: HashSet<ConceptId> = HashSet::new();
    names.insert(class);
    if let Some(ancestors) = taxonomy.ancestors.get(&class) {
        names.extend(ancestors.iter().copied());
    }
    collect_told(compiled, names, Vec::new(), Vec::new())
}

fn describe_conjunction<'a>(
    compiled: &'a Compiled,
    taxonomy: &Taxonomy,
    conj: &'a Conjunction,
) -> Description<'a> {
    let mut names = HashSet::new();
    for &name in &conj.names {
        names.insert(name);
        if let Some(ancestors) = taxonomy.ancestors.get(&name) {
            names.extend(ancestors.iter().copied());
        }
    }
    collect_told(
        compiled,
        names,
        conj.exists.iter().collect(),
        conj.values.iter().collect(),
    )
}

fn collect_told<'a>(
    compiled: &'a Compiled,
    names: HashSet<ConceptId>,
    mut exists: Vec<&'a (ConceptId, Conjunction)>,
    mut values: Vec<&'a (ConceptId, Literal)>,
) -> Description<'a> {
    for name in &names {
        for conj in compiled.told.get(name).into_iter().flatten() {
            exists.extend(conj.exists.iter());
            values.extend(conj.values.iter());
        }
    }
    Description {
        names,
        exists,
        values,
    }
}

/// Whether `description` satisfies every conjunct of `required`.
fn subsumed_by(
    compiled: &Compiled,
    taxonomy: &Taxonomy,
    description: &Description<'_>,
    required: &Conjunction,
    depth: usize,
) -> bool {
    let props = &compiled.properties;
    required.names.iter().all(|n| description.names.contains(n))
        && required.values.iter().all(|(p, v)| {
            description
                .values
                .iter()
                .any(|(q, w)| w == v && props.is_sub(*q, *p))
        })
        && required.exists.iter().all(|(p, f)| {
            description.exists.iter().any(|(q, g)| {
                props.is_sub(*q, *p) && filler_subsumed(compiled, taxonomy, g, f, *p, depth + 1)
            })
        })
}

/// Whether filler `actual` is subsumed by `required` under property `property`.
fn filler_subsumed(
    compiled: &Compiled,
    taxonomy: &Taxonomy,
    actual: &Conjunction,
    required: &Conjunction,
    property: ConceptId,
    depth: usize,
) -> bool {
    if depth > MAX_FILLER_DEPTH {
        return false;
    }
    let description = describe_conjunction(compiled, taxonomy, actual);
    if subsumed_by(compiled, taxonomy, &description, required, depth) {
        return true;
    }
    // ∃p.∃p.C ⊑ ∃p.C for transitive p.
    compiled.properties.is_transitive(property)
        && description.exists.iter().any(|(r, h)| {
            compiled.properties.is_sub(*r, property)
                && filler_subsumed(compiled, taxonomy, h, required, property, depth + 1)
        })
}

impl ReasoningEngine for StructuralReasoner {
    fn add_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
        let added = axioms
            .iter()
            .filter(|ax| self.model.insert((*ax).clone()))
            .count();
        self.dirty |= added > 0;
        Ok(outcome(added, axioms.len()))
    }

    fn remove_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
        let removed = axioms.iter().filter(|ax| self.model.remove(*ax)).count();
        self.dirty |= removed > 0;
        Ok(outcome(removed, axioms.len()))
    }

    fn flush(&mut self) -> EngineResult<()> {
        if self.dirty {
            self.taxonomy = None;
            self.dirty = false;
        }
        Ok(())
    }

    fn precompute_class_hierarchy(&mut self) -> EngineResult<()> {
        if self.dirty {
            return Err(EngineError::PendingChanges);
        }
        if self.taxonomy.is_some() {
            return Ok(());
        }
        let start = Instant::now();
        let compiled = Compiled::from_model(&self.model);
        let (taxonomy, iterations) = Self::saturate(&compiled);
        tracing::info!(
            axioms = self.model.len(),
            classes = compiled.classes.len(),
            rules = compiled.rules.len(),
            iterations,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "class hierarchy precomputed"
        );
        self.taxonomy = Some(taxonomy);
        Ok(())
    }

    fn direct_super_types(&self, concept: ConceptId) -> EngineResult<BTreeSet<ConceptId>> {
        let taxonomy = self.taxonomy.as_ref().ok_or(EngineError::NotPrecomputed)?;
        taxonomy
            .direct_super_types(concept)
            .ok_or(EngineError::UnknownConcept {
                concept: concept.get(),
            })
    }

    fn axiom_count(&self) -> usize {
        self.model.len()
    }
}

fn outcome(changed: usize, requested: usize) -> ChangeApplied {
    if changed == requested {
        ChangeApplied::Successfully
    } else if changed == 0 {
        ChangeApplied::NoOperation
    } else {
        ChangeApplied::Partially
    }
}
