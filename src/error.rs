//! Rich diagnostic error types for taxon-trial.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::reasoner::{ChangeApplied, ChangeOperation};

/// Top-level error type for taxon-trial.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum TaxonError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Axiom syntax errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SyntaxError {
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    #[diagnostic(
        code(taxon::syntax::unexpected_token),
        help("Check the expression for balanced parentheses and the operand order of the construct.")
    )]
    UnexpectedToken {
        found: String,
        expected: String,
        offset: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    #[diagnostic(
        code(taxon::syntax::unexpected_end),
        help("The expression stops early. A closing parenthesis or an operand is missing.")
    )]
    UnexpectedEnd { expected: String },

    #[error("unsupported construct `{name}` at offset {offset}")]
    #[diagnostic(
        code(taxon::syntax::unknown_construct),
        help(
            "Only SubClassOf, EquivalentClasses, SubObjectPropertyOf, SubDataPropertyOf, \
             TransitiveObjectProperty, ReflexiveObjectProperty, ObjectIntersectionOf, \
             ObjectSomeValuesFrom, ObjectPropertyChain and DataHasValue are understood."
        )
    )]
    UnknownConstruct { name: String, offset: usize },

    #[error("invalid concept reference `{text}` at offset {offset}")]
    #[diagnostic(
        code(taxon::syntax::invalid_concept),
        help("Concept references are written `:123456` or `<http://snomed.info/id/123456>`.")
    )]
    InvalidConcept { text: String, offset: usize },

    #[error("unterminated {what} starting at offset {offset}")]
    #[diagnostic(
        code(taxon::syntax::unterminated),
        help("Close the IRI with `>` or the literal with `\"`.")
    )]
    Unterminated { what: &'static str, offset: usize },

    #[error("trailing input at offset {offset}")]
    #[diagnostic(
        code(taxon::syntax::trailing_input),
        help("An expression holds exactly one axiom. Remove everything after its closing parenthesis.")
    )]
    TrailingInput { offset: usize },
}

// ---------------------------------------------------------------------------
// Release loading errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("I/O error reading release file: {source}")]
    #[diagnostic(
        code(taxon::load::io),
        help("Check that the release file exists and is readable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("malformed header: {found:?}")]
    #[diagnostic(
        code(taxon::load::header),
        help(
            "The file does not have the expected header for an OWL axiom reference set. \
             The first line must be exactly: \
             id<TAB>effectiveTime<TAB>active<TAB>moduleId<TAB>refsetId<TAB>referencedComponentId<TAB>owlExpression"
        )
    )]
    MalformedHeader { found: Option<String> },

    #[error("malformed row at line {line}: expected {expected} tab-separated fields, found {found}")]
    #[diagnostic(
        code(taxon::load::row),
        help("The release file is damaged or truncated. Re-extract it from the release package.")
    )]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("axiom {axiom_id} at line {line} could not be parsed")]
    #[diagnostic(
        code(taxon::load::axiom),
        help("A base axiom in the release is not valid functional syntax; the whole load is aborted.")
    )]
    Axiom {
        line: usize,
        axiom_id: String,
        #[source]
        source: SyntaxError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

impl From<std::io::Error> for LoadError {
    fn from(source: std::io::Error) -> Self {
        LoadError::Io { source }
    }
}

// ---------------------------------------------------------------------------
// Axiom store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("reasoning engine did not fully apply {operation} of {count} axiom(s): {outcome}")]
    #[diagnostic(
        code(taxon::store::transaction_failed),
        help(
            "The engine model rejected part of the change. For an add this usually means \
             a candidate axiom is already asserted in the base model."
        )
    )]
    TransactionFailed {
        operation: ChangeOperation,
        outcome: ChangeApplied,
        count: usize,
    },

    #[error("base model already loaded with {count} axiom(s)")]
    #[diagnostic(
        code(taxon::store::base_loaded),
        help("The base axiom set is loaded once per store. Create a fresh store to load another release.")
    )]
    BaseAlreadyLoaded { count: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Reasoning engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum EngineError {
    #[error("class hierarchy has not been precomputed")]
    #[diagnostic(
        code(taxon::engine::not_precomputed),
        help("Call `flush()` then `precompute_class_hierarchy()` before querying supertypes.")
    )]
    NotPrecomputed,

    #[error("model has unflushed changes")]
    #[diagnostic(
        code(taxon::engine::pending_changes),
        help("Call `flush()` before `precompute_class_hierarchy()`.")
    )]
    PendingChanges,

    #[error("concept {concept} is not in the classified signature")]
    #[diagnostic(
        code(taxon::engine::unknown_concept),
        help("The concept does not occur in any class axiom of the model.")
    )]
    UnknownConcept { concept: u64 },

    #[error("reasoning engine failure: {message}")]
    #[diagnostic(code(taxon::engine::failure))]
    Failure { message: String },
}

// ---------------------------------------------------------------------------
// Classification session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("candidate `{label}` could not be parsed")]
    #[diagnostic(
        code(taxon::session::parse),
        help("Fix the candidate expression; the base model was not touched.")
    )]
    Parse {
        label: String,
        #[source]
        source: SyntaxError,
    },

    #[error("candidate `{label}` is not a class axiom")]
    #[diagnostic(
        code(taxon::session::not_class_axiom),
        help("Only SubClassOf and EquivalentClasses axioms can be classified.")
    )]
    NotAClassAxiom { label: String },

    #[error("candidate `{label}` has no named class to classify")]
    #[diagnostic(
        code(taxon::session::no_principal_concept),
        help(
            "The left-hand side of SubClassOf, or one operand of EquivalentClasses, \
             must be a named concept."
        )
    )]
    NoPrincipalConcept { label: String },

    #[error("concept {concept} is defined by more than one candidate in the batch")]
    #[diagnostic(
        code(taxon::session::duplicate_candidate),
        help("Submit each candidate concept once per batch, or split the batch into separate trials.")
    )]
    DuplicateCandidate { concept: u64 },

    #[error("{labels} label(s) given for {expressions} candidate expression(s)")]
    #[diagnostic(
        code(taxon::session::label_count),
        help("Give one --label per --expression, or none to number the candidates.")
    )]
    LabelCountMismatch { expressions: usize, labels: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    #[diagnostic(
        code(taxon::config::io),
        help("Check that the configuration file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(taxon::config::parse),
        help("The configuration must be TOML. Unknown keys are rejected; missing keys use defaults.")
    )]
    Parse { message: String },
}

/// Result type for axiom parsing.
pub type SyntaxResult<T> = std::result::Result<T, SyntaxError>;

/// Result type for release loading.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Result type for axiom store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for reasoning engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type for classification trials.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Convenience alias for functions returning taxon-trial results.
pub type TaxonResult<T> = std::result::Result<T, TaxonError>;
