// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # taxon-trial
//!
//! Transient "what-if" classification of candidate OWL axioms against a large
//! concept taxonomy.
//!
//! ## Architecture
//!
//! - **Loading** (`loader`): reads the active rows of an RF2 OWL axiom
//!   reference set into a base axiom set
//! - **Store** (`store`): the base set plus the trial's transient axioms,
//!   with guard-scoped rollback
//! - **Reasoning** (`reasoner`): the engine seam and a bundled structural
//!   EL reasoner
//! - **Trials** (`session`): inject → precompute → read direct supertypes → remove
//! - **Ancestor cache** (`hierarchy`): transitive ancestor lookups without the engine
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//! use taxon_trial::axiom::syntax::FunctionalSyntaxDeserialiser;
//! use taxon_trial::config::ClassifierConfig;
//! use taxon_trial::reasoner::structural::StructuralReasoner;
//! use taxon_trial::session::{Candidate, ClassificationSession};
//!
//! let (mut session, _stats) = ClassificationSession::from_release(
//!     Path::new("sct2_OWLExpressionRefset_Snapshot.txt"),
//!     StructuralReasoner::new(),
//!     FunctionalSyntaxDeserialiser::new(),
//!     ClassifierConfig::default(),
//! )
//! .unwrap();
//! let result = session
//!     .classify(&[Candidate::new("SubClassOf(:999 :404684003)", "999")])
//!     .unwrap();
//! println!("{:?}", result.entries());
//! ```

pub mod axiom;
pub mod concept;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod loader;
pub mod reasoner;
pub mod report;
pub mod session;
pub mod store;
pub mod timer;
