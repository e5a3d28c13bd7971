//! Logical axioms over concepts.
//!
//! The axiom model covers the OWL 2 EL fragment that appears in the OWL axiom
//! reference set of a release:
//!
//! - **Class axioms**: `SubClassOf` (directional) and `EquivalentClasses` (symmetric)
//! - **Property axioms**: sub-property (including chains), transitivity, reflexivity
//!
//! [`Axiom`] equality and hashing consider only the logical content; the source
//! identifier is carried for provenance and logging.

pub mod syntax;

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::concept::ConceptId;

/// A typed literal, e.g. `"20"^^xsd:integer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    /// Lexical form without quotes.
    pub lexical: String,
    /// Datatype in prefixed form, if any.
    pub datatype: Option<String>,
}

/// A class expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassExpression {
    /// `owl:Thing`.
    Thing,
    /// A named concept.
    Named(ConceptId),
    /// `ObjectIntersectionOf(C1 … Cn)`.
    Intersection(Vec<ClassExpression>),
    /// `ObjectSomeValuesFrom(P C)`.
    SomeValuesFrom {
        property: ConceptId,
        filler: Box<ClassExpression>,
    },
    /// `DataHasValue(P "v"^^dt)`.
    HasValue { property: ConceptId, value: Literal },
}

impl ClassExpression {
    /// The concept id if this is a named class.
    pub fn as_named(&self) -> Option<ConceptId> {
        match self {
            ClassExpression::Named(id) => Some(*id),
            _ => None,
        }
    }

    /// Collect every named class occurring in class position.
    pub fn collect_classes(&self, out: &mut BTreeSet<ConceptId>) {
        match self {
            ClassExpression::Thing | ClassExpression::HasValue { .. } => {}
            ClassExpression::Named(id) => {
                out.insert(*id);
            }
            ClassExpression::Intersection(operands) => {
                for op in operands {
                    op.collect_classes(out);
                }
            }
            ClassExpression::SomeValuesFrom { filler, .. } => filler.collect_classes(out),
        }
    }
}

/// The logical content of an axiom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AxiomKind {
    /// `SubClassOf(sub sup)`.
    SubClassOf {
        sub: ClassExpression,
        sup: ClassExpression,
    },
    /// `EquivalentClasses(C1 … Cn)`.
    EquivalentClasses(Vec<ClassExpression>),
    /// `SubObjectPropertyOf(P Q)`, or with a chain on the left when `sub` has
    /// more than one element.
    SubObjectPropertyOf {
        sub: Vec<ConceptId>,
        sup: ConceptId,
    },
    /// `SubDataPropertyOf(P Q)`.
    SubDataPropertyOf { sub: ConceptId, sup: ConceptId },
    /// `TransitiveObjectProperty(P)`.
    TransitiveObjectProperty(ConceptId),
    /// `ReflexiveObjectProperty(P)`.
    ReflexiveObjectProperty(ConceptId),
}

/// A logical axiom with an opaque provenance identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axiom {
    kind: AxiomKind,
    source: Option<String>,
}

impl Axiom {
    /// Create an axiom without provenance.
    pub fn new(kind: AxiomKind) -> Self {
        Self { kind, source: None }
    }

    /// Attach the identifier of the row or candidate this axiom came from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Logical content.
    pub fn kind(&self) -> &AxiomKind {
        &self.kind
    }

    /// Provenance identifier, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Whether this is a `SubClassOf` or `EquivalentClasses` axiom.
    pub fn is_class_axiom(&self) -> bool {
        matches!(
            self.kind,
            AxiomKind::SubClassOf { .. } | AxiomKind::EquivalentClasses(_)
        )
    }

    /// The concept this axiom defines.
    ///
    /// For `SubClassOf` this is the named subclass; for `EquivalentClasses` the
    /// first named operand. Property axioms and general concept inclusions have
    /// none.
    pub fn principal_concept(&self) -> Option<ConceptId> {
        match &self.kind {
            AxiomKind::SubClassOf { sub, .. } => sub.as_named(),
            AxiomKind::EquivalentClasses(operands) => {
                operands.iter().find_map(ClassExpression::as_named)
            }
            _ => None,
        }
    }

    /// Named classes occurring in class position.
    pub fn class_signature(&self) -> BTreeSet<ConceptId> {
        let mut out = BTreeSet::new();
        match &self.kind {
            AxiomKind::SubClassOf { sub, sup } => {
                sub.collect_classes(&mut out);
                sup.collect_classes(&mut out);
            }
            AxiomKind::EquivalentClasses(operands) => {
                for op in operands {
                    op.collect_classes(&mut out);
                }
            }
            _ => {}
        }
        out
    }
}

impl PartialEq for Axiom {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Axiom {}

impl Hash for Axiom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl From<AxiomKind> for Axiom {
    fn from(kind: AxiomKind) -> Self {
        Axiom::new(kind)
    }
}

// ---------------------------------------------------------------------------
// Functional-syntax rendering
// ---------------------------------------------------------------------------

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.lexical)?;
        if let Some(dt) = &self.datatype {
            write!(f, "^^{dt}")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ClassExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassExpression::Thing => write!(f, "owl:Thing"),
            ClassExpression::Named(id) => write!(f, ":{id}"),
            ClassExpression::Intersection(operands) => {
                write!(f, "ObjectIntersectionOf(")?;
                write_joined(f, operands)?;
                write!(f, ")")
            }
            ClassExpression::SomeValuesFrom { property, filler } => {
                write!(f, "ObjectSomeValuesFrom(:{property} {filler})")
            }
            ClassExpression::HasValue { property, value } => {
                write!(f, "DataHasValue(:{property} {value})")
            }
        }
    }
}

impl std::fmt::Display for AxiomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxiomKind::SubClassOf { sub, sup } => write!(f, "SubClassOf({sub} {sup})"),
            AxiomKind::EquivalentClasses(operands) => {
                write!(f, "EquivalentClasses(")?;
                write_joined(f, operands)?;
                write!(f, ")")
            }
            AxiomKind::SubObjectPropertyOf { sub, sup } => {
                write!(f, "SubObjectPropertyOf(")?;
                if let [single] = sub.as_slice() {
                    write!(f, ":{single}")?;
                } else {
                    write!(f, "ObjectPropertyChain(")?;
                    let chain: Vec<String> = sub.iter().map(|p| format!(":{p}")).collect();
                    write!(f, "{})", chain.join(" "))?;
                }
                write!(f, " :{sup})")
            }
            AxiomKind::SubDataPropertyOf { sub, sup } => {
                write!(f, "SubDataPropertyOf(:{sub} :{sup})")
            }
            AxiomKind::TransitiveObjectProperty(p) => write!(f, "TransitiveObjectProperty(:{p})"),
            AxiomKind::ReflexiveObjectProperty(p) => write!(f, "ReflexiveObjectProperty(:{p})"),
        }
    }
}

impl std::fmt::Display for Axiom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.kind, f)
    }
}

fn write_joined(f: &mut std::fmt::Formatter<'_>, items: &[ClassExpression]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Annotation stripping
// ---------------------------------------------------------------------------

/// Matches a human-readable term between a pair of vertical bars.
static RE_TERM_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|[^|]*\|").expect("static regex"));

/// Remove every `|term|` span from an expression, leaving all other characters
/// untouched.
///
/// An odd trailing `|` without a partner is left as is.
pub fn strip_annotations(text: &str) -> Cow<'_, str> {
    RE_TERM_ANNOTATION.replace_all(text, "")
}
