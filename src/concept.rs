//! Concept identifiers.
//!
//! Every class and property in the taxonomy is named by a stable numeric
//! identifier. [`ConceptId`] wraps it in a `NonZeroU64` so that
//! `Option<ConceptId>` costs nothing extra; release identifiers are never zero.

use std::num::NonZeroU64;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique, niche-optimized identifier for a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
#[repr(transparent)]
pub struct ConceptId(NonZeroU64);

impl ConceptId {
    /// Create a `ConceptId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ConceptId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Full IRI of this concept under the given namespace.
    pub fn iri(self, namespace: &str) -> String {
        format!("{namespace}{}", self.0)
    }

    /// Compile-time constructor for well-known identifiers.
    const fn known(raw: u64) -> Self {
        match NonZeroU64::new(raw) {
            Some(v) => ConceptId(v),
            None => panic!("well-known concept id must be non-zero"),
        }
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string is not a valid concept identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid concept identifier: {0:?}")]
pub struct InvalidConceptId(pub String);

impl FromStr for ConceptId {
    type Err = InvalidConceptId;

    /// Accepts `123`, `:123`, and `<…/123>` forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = if let Some(rest) = trimmed.strip_prefix(':') {
            rest
        } else if trimmed.starts_with('<') && trimmed.ends_with('>') {
            let inner = &trimmed[1..trimmed.len() - 1];
            inner.rsplit('/').next().unwrap_or(inner)
        } else {
            trimmed
        };
        digits
            .parse::<u64>()
            .ok()
            .and_then(ConceptId::new)
            .ok_or_else(|| InvalidConceptId(s.to_string()))
    }
}

impl TryFrom<u64> for ConceptId {
    type Error = InvalidConceptId;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        ConceptId::new(raw).ok_or_else(|| InvalidConceptId(raw.to_string()))
    }
}

impl From<ConceptId> for u64 {
    fn from(id: ConceptId) -> u64 {
        id.get()
    }
}

/// Well-known concepts referenced by the loader and the bundled reasoner.
pub mod well_known {
    use super::ConceptId;

    /// The OWL axiom reference set.
    pub const OWL_AXIOM_REFSET: ConceptId = ConceptId::known(733073007);
    /// Root of the clinical finding hierarchy.
    pub const CLINICAL_FINDING: ConceptId = ConceptId::known(404684003);
}
