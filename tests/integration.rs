//! End-to-end tests for the taxon-trial pipeline.
//!
//! Each test writes a small release file into a temporary directory, loads it
//! through the session, runs one or more trials, and checks that the engine's
//! model is back to the base set afterwards.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use taxon_trial::axiom::Axiom;
use taxon_trial::axiom::syntax::FunctionalSyntaxDeserialiser;
use taxon_trial::concept::ConceptId;
use taxon_trial::concept::well_known::{CLINICAL_FINDING, OWL_AXIOM_REFSET};
use taxon_trial::config::ClassifierConfig;
use taxon_trial::error::{EngineError, EngineResult, LoadError, SessionError, StoreError};
use taxon_trial::hierarchy::AncestorGraph;
use taxon_trial::loader::{EXPECTED_HEADER, format_row};
use taxon_trial::reasoner::structural::StructuralReasoner;
use taxon_trial::reasoner::{ChangeApplied, ChangeOperation, ReasoningEngine};
use taxon_trial::report::ResultReporter;
use taxon_trial::session::{Candidate, ClassificationSession};

type Session = ClassificationSession<StructuralReasoner, FunctionalSyntaxDeserialiser>;

fn c(id: u64) -> ConceptId {
    ConceptId::new(id).unwrap()
}

const SNOMED_ROOT: u64 = 138875005;
const BODY_STRUCTURE: u64 = 123037004;
const ABNORMAL_MORPHOLOGY: u64 = 49755003;
const INFLAMMATION: u64 = 23583003;
const FINDING_SITE: u64 = 363698007;
const ASSOCIATED_MORPHOLOGY: u64 = 116676008;
const ROLE_GROUP: u64 = 609096000;
const LUNG: u64 = 39607008;
const LUNG_DISORDER: u64 = 19829001;
const PNEUMONITIS: u64 = 205237003;

/// A small slice of a clinical taxonomy.
fn base_rows() -> Vec<String> {
    let refset = OWL_AXIOM_REFSET;
    let mut rows = vec![
        format!("SubClassOf(:{CLINICAL_FINDING} :{SNOMED_ROOT})"),
        format!("SubClassOf(:{BODY_STRUCTURE} :{SNOMED_ROOT})"),
        format!("SubClassOf(:{ABNORMAL_MORPHOLOGY} :{BODY_STRUCTURE})"),
        format!("SubClassOf(:{INFLAMMATION} :{ABNORMAL_MORPHOLOGY})"),
        format!("SubClassOf(:{LUNG} :{BODY_STRUCTURE})"),
        format!("SubClassOf(:50960005 :{ABNORMAL_MORPHOLOGY})"),
        format!(
            "EquivalentClasses(:{LUNG_DISORDER} ObjectIntersectionOf(:{CLINICAL_FINDING} \
             ObjectSomeValuesFrom(:{ROLE_GROUP} ObjectSomeValuesFrom(:{FINDING_SITE} :{LUNG}))))"
        ),
        format!(
            "EquivalentClasses(:{PNEUMONITIS} ObjectIntersectionOf(:{CLINICAL_FINDING} \
             ObjectSomeValuesFrom(:{ROLE_GROUP} ObjectIntersectionOf(\
             ObjectSomeValuesFrom(:{ASSOCIATED_MORPHOLOGY} :{INFLAMMATION}) \
             ObjectSomeValuesFrom(:{FINDING_SITE} :{LUNG})))))"
        ),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, expr)| format_row(&format!("ax-{i}"), true, refset, c(1), &expr))
    .collect::<Vec<_>>();

    // Rows that must not reach the model.
    rows.push(format_row(
        "retired",
        false,
        refset,
        c(2),
        &format!("SubClassOf(:{CLINICAL_FINDING} :{LUNG})"),
    ));
    rows.push(format_row(
        "other",
        true,
        c(900000000000509007),
        c(3),
        &format!("SubClassOf(:{LUNG} :{CLINICAL_FINDING})"),
    ));
    rows
}

fn write_release(dir: &Path, rows: &[String]) -> PathBuf {
    let path = dir.join("sct2_sRefset_OWLExpressionSnapshot.txt");
    let mut text = String::from(EXPECTED_HEADER);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    std::fs::write(&path, text).unwrap();
    path
}

fn open(dir: &Path) -> Session {
    let path = write_release(dir, &base_rows());
    let (session, stats) = ClassificationSession::from_release(
        &path,
        StructuralReasoner::new(),
        FunctionalSyntaxDeserialiser::new(),
        ClassifierConfig::default(),
    )
    .unwrap();
    assert_eq!(stats.axioms, 8);
    assert_eq!(stats.inactive, 1);
    assert_eq!(stats.other_refset, 1);
    session
}

#[test]
fn end_to_end_candidate_under_clinical_finding() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut session = open(dir.path());
    let before = session.engine().model().clone();

    let result = session
        .classify(&[Candidate::new(
            "SubClassOf(:999 |new concept| ObjectIntersectionOf(:404684003 |Clinical finding (finding)| \
             ObjectSomeValuesFrom(:609096000 |Role group (attribute)| \
             ObjectSomeValuesFrom(:116676008 |Associated morphology (attribute)| \
             :50960005 |Hemorrhage (morphologic abnormality)|))))",
            "999",
        )])
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(
        result.supertypes_of(c(999)),
        Some(&BTreeSet::from([CLINICAL_FINDING]))
    );
    assert_eq!(
        ResultReporter::render_text(&result),
        "Inferred superclasses for 999 :999:\n- :404684003\n"
    );
    assert_eq!(session.engine().model(), &before);
    assert!(session.store().transient().is_empty());

    // A follow-up empty batch changes nothing.
    let empty = session.classify(&[]).unwrap();
    assert!(empty.is_empty());
    assert_eq!(session.engine().axiom_count(), before.len());
}

#[test]
fn batch_of_five_candidates() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut session = open(dir.path());
    let before = session.engine().model().clone();

    let batch = vec![
        Candidate::new(format!("SubClassOf(:1001 :{CLINICAL_FINDING})"), "plain"),
        Candidate::new(
            format!(
                "SubClassOf(:1002 ObjectIntersectionOf(:{CLINICAL_FINDING} \
                 ObjectSomeValuesFrom(:{ROLE_GROUP} ObjectSomeValuesFrom(:{FINDING_SITE} :{LUNG}))))"
            ),
            "lung finding",
        ),
        Candidate::new(
            format!(
                "SubClassOf(:1003 ObjectIntersectionOf(:{CLINICAL_FINDING} \
                 ObjectSomeValuesFrom(:{ROLE_GROUP} ObjectIntersectionOf(\
                 ObjectSomeValuesFrom(:{ASSOCIATED_MORPHOLOGY} :{INFLAMMATION}) \
                 ObjectSomeValuesFrom(:{FINDING_SITE} :{LUNG})))))"
            ),
            "inflamed lung",
        ),
        Candidate::new(format!("SubClassOf(:1004 :{INFLAMMATION})"), "morphology"),
        Candidate::new("SubClassOf(:1005 :1003)", "child of candidate"),
    ];
    let result = session.classify(&batch).unwrap();

    assert_eq!(result.len(), 5);
    let expect = [
        (1001, vec![CLINICAL_FINDING.get()]),
        (1002, vec![LUNG_DISORDER]),
        (1003, vec![PNEUMONITIS]),
        (1004, vec![INFLAMMATION]),
        (1005, vec![1003]),
    ];
    for (concept, parents) in expect {
        let got: Vec<u64> = result
            .supertypes_of(c(concept))
            .unwrap()
            .iter()
            .map(|p| p.get())
            .collect();
        assert_eq!(got, parents, "supertypes of {concept}");
    }
    assert_eq!(session.engine().model(), &before);
}

#[test]
fn repeated_trials_are_independent() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut session = open(dir.path());
    let before = session.engine().model().clone();

    let first = session
        .classify(&[Candidate::new(format!("SubClassOf(:2001 :{LUNG})"), "a")])
        .unwrap();
    // 2001's axiom is gone; it is now only a bare named parent.
    let second = session
        .classify(&[Candidate::new("SubClassOf(:2002 :2001)", "b")])
        .unwrap();
    let third = session
        .classify(&[Candidate::new(format!("SubClassOf(:2001 :{LUNG})"), "a")])
        .unwrap();

    assert_eq!(first, third);
    assert_eq!(second.supertypes_of(c(2002)), Some(&BTreeSet::from([c(2001)])));
    assert_eq!(session.engine().model(), &before);
}

#[test]
fn parse_failure_leaves_model_untouched() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut session = open(dir.path());
    let before = session.engine().model().clone();

    let err = session
        .classify(&[
            Candidate::new(format!("SubClassOf(:3001 :{LUNG})"), "good"),
            Candidate::new("SubClassOf(:3002 ObjectUnionOf(:1 :2))", "bad"),
        ])
        .unwrap_err();
    assert!(matches!(err, SessionError::Parse { ref label, .. } if label == "bad"));
    assert_eq!(session.engine().model(), &before);
}

#[test]
fn candidate_duplicating_base_axiom_fails_without_damage() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut session = open(dir.path());
    let before = session.engine().model().clone();

    let err = session
        .classify(&[
            Candidate::new(format!("SubClassOf(:{LUNG} :{BODY_STRUCTURE})"), "dup"),
            Candidate::new(format!("SubClassOf(:3003 :{LUNG})"), "new"),
        ])
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Store(StoreError::TransactionFailed {
            outcome: ChangeApplied::Partially,
            ..
        })
    ));
    assert_eq!(session.engine().model(), &before);
    assert!(session.store().transient().is_empty());

    // The session is still usable.
    let ok = session
        .classify(&[Candidate::new(format!("SubClassOf(:3003 :{LUNG})"), "new")])
        .unwrap();
    assert_eq!(ok.supertypes_of(c(3003)), Some(&BTreeSet::from([c(LUNG)])));
}

#[test]
fn ancestor_graph_from_base_and_trials() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut session = open(dir.path());

    let mut graph = AncestorGraph::new();
    session.populate_ancestors(&mut graph).unwrap();

    assert_eq!(
        graph.ancestors(c(PNEUMONITIS)),
        BTreeSet::from([c(LUNG_DISORDER), CLINICAL_FINDING, c(SNOMED_ROOT)])
    );
    assert!(graph.ancestors(c(4242)).is_empty());

    let result = session
        .classify(&[Candidate::new(format!("SubClassOf(:4001 :{PNEUMONITIS})"), "x")])
        .unwrap();
    graph.extend(result.edges());
    assert_eq!(
        graph.ancestors(c(4001)),
        BTreeSet::from([
            c(PNEUMONITIS),
            c(LUNG_DISORDER),
            CLINICAL_FINDING,
            c(SNOMED_ROOT)
        ])
    );
}

#[test]
fn configured_refset_selects_rows() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write_release(dir.path(), &base_rows());
    let config = ClassifierConfig::from_toml_str("owl_axiom_refset = 900000000000509007").unwrap();

    let (session, stats) = ClassificationSession::from_release(
        &path,
        StructuralReasoner::new(),
        FunctionalSyntaxDeserialiser::new(),
        config,
    )
    .unwrap();
    assert_eq!(stats.axioms, 1);
    assert_eq!(session.engine().axiom_count(), 1);
}

#[test]
fn malformed_release_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("broken.txt");
    std::fs::write(&path, "id\tactive\n1\t1\n").unwrap();

    let err = ClassificationSession::from_release(
        &path,
        StructuralReasoner::new(),
        FunctionalSyntaxDeserialiser::new(),
        ClassifierConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::MalformedHeader { .. }));
}

/// Delegates to the structural engine but fails every supertype query.
struct BrokenQueries(StructuralReasoner);

impl ReasoningEngine for BrokenQueries {
    fn add_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
        self.0.add_axioms(axioms)
    }
    fn remove_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
        self.0.remove_axioms(axioms)
    }
    fn flush(&mut self) -> EngineResult<()> {
        self.0.flush()
    }
    fn precompute_class_hierarchy(&mut self) -> EngineResult<()> {
        self.0.precompute_class_hierarchy()
    }
    fn direct_super_types(&self, _concept: ConceptId) -> EngineResult<BTreeSet<ConceptId>> {
        Err(EngineError::Failure {
            message: "query backend unavailable".into(),
        })
    }
    fn axiom_count(&self) -> usize {
        self.0.axiom_count()
    }
}

#[test]
fn engine_failure_mid_trial_rolls_back_boxed_engine() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write_release(dir.path(), &base_rows());
    let engine: Box<dyn ReasoningEngine> = Box::new(BrokenQueries(StructuralReasoner::new()));

    let (mut session, _) = ClassificationSession::from_release(
        &path,
        engine,
        FunctionalSyntaxDeserialiser::new(),
        ClassifierConfig::default(),
    )
    .unwrap();
    let before = session.engine().axiom_count();

    let err = session
        .classify(&[
            Candidate::new(format!("SubClassOf(:5001 :{LUNG})"), "a"),
            Candidate::new(format!("SubClassOf(:5002 :{LUNG})"), "b"),
        ])
        .unwrap_err();
    assert!(matches!(err, SessionError::Engine(EngineError::Failure { .. })));
    assert_eq!(session.engine().axiom_count(), before);
    assert!(session.store().transient().is_empty());
}

/// Removes axioms like the structural engine but always reports a partial removal.
struct ShortRemoval(StructuralReasoner);

impl ReasoningEngine for ShortRemoval {
    fn add_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
        self.0.add_axioms(axioms)
    }
    fn remove_axioms(&mut self, axioms: &[Axiom]) -> EngineResult<ChangeApplied> {
        self.0.remove_axioms(axioms)?;
        Ok(ChangeApplied::Partially)
    }
    fn flush(&mut self) -> EngineResult<()> {
        self.0.flush()
    }
    fn precompute_class_hierarchy(&mut self) -> EngineResult<()> {
        self.0.precompute_class_hierarchy()
    }
    fn direct_super_types(&self, concept: ConceptId) -> EngineResult<BTreeSet<ConceptId>> {
        self.0.direct_super_types(concept)
    }
    fn axiom_count(&self) -> usize {
        self.0.axiom_count()
    }
}

#[test]
fn incomplete_removal_fails_the_trial() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write_release(dir.path(), &base_rows());
    let (mut session, _) = ClassificationSession::from_release(
        &path,
        ShortRemoval(StructuralReasoner::new()),
        FunctionalSyntaxDeserialiser::new(),
        ClassifierConfig::default(),
    )
    .unwrap();
    let before = session.engine().axiom_count();

    let err = session
        .classify(&[Candidate::new(format!("SubClassOf(:6001 :{LUNG})"), "a")])
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Store(StoreError::TransactionFailed {
            operation: ChangeOperation::Remove,
            outcome: ChangeApplied::Partially,
            count: 1
        })
    ));
    assert!(session.store().transient().is_empty());
    assert_eq!(session.engine().axiom_count(), before);
}
