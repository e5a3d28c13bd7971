//! Base model loading from an RF2 OWL axiom reference set.
//!
//! The release file is tab-separated with a fixed seven-column header:
//!
//! ```text
//! id  effectiveTime  active  moduleId  refsetId  referencedComponentId  owlExpression
//! ```
//!
//! Only active rows of the OWL axiom reference set contribute axioms; every
//! other row is skipped. A wrong header, a row with the wrong field count, or
//! an unparseable expression aborts the whole load.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use serde::Serialize;

use crate::axiom::Axiom;
use crate::axiom::syntax::AxiomDeserialiser;
use crate::concept::ConceptId;
use crate::config::ClassifierConfig;
use crate::error::{LoadError, LoadResult};
use crate::reasoner::ReasoningEngine;
use crate::store::AxiomStore;

/// The literal header of an OWL axiom reference set file.
pub const EXPECTED_HEADER: &str =
    "id\teffectiveTime\tactive\tmoduleId\trefsetId\treferencedComponentId\towlExpression";

/// Number of tab-separated fields in every row.
pub const FIELD_COUNT: usize = 7;

const COL_ID: usize = 0;
const COL_ACTIVE: usize = 2;
const COL_REFSET: usize = 4;
const COL_EXPRESSION: usize = 6;

/// Row counts from a completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Data rows read (header excluded).
    pub rows: usize,
    /// Distinct axioms produced.
    pub axioms: usize,
    /// Rows skipped because `active` was not `1`.
    pub inactive: usize,
    /// Active rows belonging to another reference set.
    pub other_refset: usize,
    /// Qualifying rows whose axiom was already present.
    pub duplicates: usize,
}

/// Reads a release file into a set of base axioms.
#[derive(Debug)]
pub struct BaseModelLoader<'d, D: AxiomDeserialiser + ?Sized> {
    deserialiser: &'d D,
    refset: String,
    header: String,
}

impl<'d, D: AxiomDeserialiser + ?Sized> BaseModelLoader<'d, D> {
    /// Loader for the default OWL axiom reference set and header.
    pub fn new(deserialiser: &'d D) -> Self {
        Self::with_config(deserialiser, &ClassifierConfig::default())
    }

    /// Loader using the reference set and header from `config`.
    pub fn with_config(deserialiser: &'d D, config: &ClassifierConfig) -> Self {
        Self {
            deserialiser,
            refset: config.owl_axiom_refset.to_string(),
            header: config.expected_header.clone(),
        }
    }

    /// The reference set whose rows are loaded.
    pub fn refset(&self) -> &str {
        &self.refset
    }

    /// Parse every qualifying row of `reader` into an axiom set.
    pub fn read<R: BufRead>(&self, reader: R) -> LoadResult<(HashSet<Axiom>, LoadStats)> {
        let mut lines = reader.lines();

        let header = lines.next().transpose()?;
        let header = header.as_deref().map(|h| h.trim_end_matches('\r'));
        if header != Some(self.header.as_str()) {
            return Err(LoadError::MalformedHeader {
                found: header.map(str::to_string),
            });
        }

        let mut axioms = HashSet::new();
        let mut stats = LoadStats::default();

        for (idx, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            // Line numbers are 1-based and count the header.
            let line_no = idx + 2;
            if line.is_empty() {
                continue;
            }
            stats.rows += 1;

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != FIELD_COUNT {
                return Err(LoadError::MalformedRow {
                    line: line_no,
                    expected: FIELD_COUNT,
                    found: fields.len(),
                });
            }

            if fields[COL_ACTIVE] != "1" {
                stats.inactive += 1;
                continue;
            }
            if fields[COL_REFSET] != self.refset {
                stats.other_refset += 1;
                continue;
            }

            let axiom = self
                .deserialiser
                .deserialise(fields[COL_EXPRESSION], fields[COL_ID])
                .map_err(|source| LoadError::Axiom {
                    line: line_no,
                    axiom_id: fields[COL_ID].to_string(),
                    source,
                })?;
            if !axioms.insert(axiom) {
                stats.duplicates += 1;
            }
        }

        stats.axioms = axioms.len();
        Ok((axioms, stats))
    }

    /// Read `reader` and register the result with `store` and `engine` in one batch.
    pub fn load_into<R: BufRead, E: ReasoningEngine + ?Sized>(
        &self,
        reader: R,
        store: &mut AxiomStore,
        engine: &mut E,
    ) -> LoadResult<LoadStats> {
        let (axioms, stats) = self.read(reader)?;
        store.load_base(engine, axioms)?;
        tracing::info!(
            rows = stats.rows,
            axioms = stats.axioms,
            inactive = stats.inactive,
            other_refset = stats.other_refset,
            duplicates = stats.duplicates,
            "base model loaded"
        );
        Ok(stats)
    }

    /// [`load_into`](Self::load_into) from a file path.
    pub fn load_path<E: ReasoningEngine + ?Sized>(
        &self,
        path: &Path,
        store: &mut AxiomStore,
        engine: &mut E,
    ) -> LoadResult<LoadStats> {
        let file = std::fs::File::open(path)?;
        tracing::debug!(path = %path.display(), refset = %self.refset, "reading release file");
        self.load_into(std::io::BufReader::new(file), store, engine)
    }
}

/// Build a release row; mainly useful for fixtures.
pub fn format_row(
    id: &str,
    active: bool,
    refset: ConceptId,
    referenced: ConceptId,
    expression: &str,
) -> String {
    format!(
        "{id}\t20200731\t{}\t900000000000207008\t{refset}\t{referenced}\t{expression}",
        if active { "1" } else { "0" }
    )
}
