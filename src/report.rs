//! Rendering of classification results.
//!
//! Text output lists each candidate followed by its direct inferred
//! supertypes in ascending id order:
//!
//! ```text
//! Inferred superclasses for 999 :999:
//! - :404684003
//! ```
//!
//! JSON output is an array of `{label, concept, supertypes}` objects in
//! submission order.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::session::ClassificationResult;

/// Output format for a [`ResultReporter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Renders a [`ClassificationResult`] as text or JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultReporter {
    format: ReportFormat,
}

impl ResultReporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Render in the configured format.
    pub fn render(&self, result: &ClassificationResult) -> Result<String, serde_json::Error> {
        match self.format {
            ReportFormat::Text => Ok(Self::render_text(result)),
            ReportFormat::Json => Self::render_json(result),
        }
    }

    /// Human-readable listing; an empty result renders as an empty string.
    pub fn render_text(result: &ClassificationResult) -> String {
        let mut out = String::new();
        for entry in result.entries() {
            let _ = writeln!(
                out,
                "Inferred superclasses for {} :{}:",
                entry.label, entry.concept
            );
            for parent in &entry.supertypes {
                let _ = writeln!(out, "- :{parent}");
            }
        }
        out
    }

    /// Pretty-printed JSON array.
    pub fn render_json(result: &ClassificationResult) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(result.entries())
    }
}
