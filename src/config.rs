//! Classifier configuration.
//!
//! All settings have defaults matching the international release, so an empty
//! TOML file (or none at all) is a valid configuration:
//!
//! ```toml
//! owl_axiom_refset = 733073007
//! namespace = "http://snomed.info/id/"
//! strip_annotations = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::concept::ConceptId;
use crate::concept::well_known::OWL_AXIOM_REFSET;
use crate::error::ConfigError;
use crate::loader::EXPECTED_HEADER;

/// Configuration for loading and classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Reference set whose active rows form the base model.
    pub owl_axiom_refset: ConceptId,
    /// IRI namespace used when rendering concept IRIs.
    pub namespace: String,
    /// Required first line of the release file.
    pub expected_header: String,
    /// Remove `|term|` annotations from candidate expressions before parsing.
    pub strip_annotations: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            owl_axiom_refset: OWL_AXIOM_REFSET,
            namespace: "http://snomed.info/id/".into(),
            expected_header: EXPECTED_HEADER.into(),
            strip_annotations: true,
        }
    }
}

impl ClassifierConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
