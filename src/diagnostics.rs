//! Structured diagnostics for data inconsistencies.
//!
//! Ambiguous mappings, unexpected tie-breaks and missing resources do not
//! abort a run. Each one is recorded here and emitted as a `tracing`
//! warning; callers decide whether to log, inspect, or fail (see
//! [`Diagnostics::into_strict`]).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AssemblyError;

/// The kind of inconsistency found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// More than one periplasmic candidate matched an old metabolite.
    AmbiguousPeriplasmicAssignment,
    /// An old metabolite maps to several new ones without periplasmic context.
    AmbiguousMapping,
    /// Direction reconciliation found neither one nor two majority groups.
    UnexpectedDirectionTie,
    /// A source has no gene translation table.
    MissingTranslationTable,
    /// Several old reactions of one source map to one merged reaction but differ in participants.
    DivergentReactionInstances,
    /// A gene rule could not be parsed, or its normal form is too large.
    MalformedGeneRule,
    /// A converted entity has no row in the reference table.
    MissingReference,
}

impl DiagnosticKind {
    /// True for conflicts between the inputs themselves.
    ///
    /// Missing resources (a translation table, a reference row) are notices:
    /// the run falls back to original ids or empty names.
    #[must_use]
    pub const fn is_data_inconsistency(self) -> bool {
        !matches!(self, Self::MissingTranslationTable | Self::MissingReference)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AmbiguousPeriplasmicAssignment => "ambiguous_periplasmic_assignment",
            Self::AmbiguousMapping => "ambiguous_mapping",
            Self::UnexpectedDirectionTie => "unexpected_direction_tie",
            Self::MissingTranslationTable => "missing_translation_table",
            Self::DivergentReactionInstances => "divergent_reaction_instances",
            Self::MalformedGeneRule => "malformed_gene_rule",
            Self::MissingReference => "missing_reference",
        };
        f.write_str(name)
    }
}

/// One recorded inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// Merged (or original) id the diagnostic is about.
    pub entity_id: String,
    /// Source the diagnostic concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Human-readable detail.
    pub detail: String,
}

impl Diagnostic {
    /// Creates a diagnostic without a source.
    #[must_use]
    pub fn new(kind: DiagnosticKind, entity_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            source: None,
            detail: detail.into(),
        }
    }

    /// Attaches the source name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "[{}] {} ({source}): {}", self.kind, self.entity_id, self.detail),
            None => write!(f, "[{}] {}: {}", self.kind, self.entity_id, self.detail),
        }
    }
}

/// Ordered collection of diagnostics from one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic and emits it as a warning event.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = %diagnostic.kind,
            entity = %diagnostic.entity_id,
            source = diagnostic.source.as_deref().unwrap_or("-"),
            "{}",
            diagnostic.detail
        );
        self.entries.push(diagnostic);
    }

    /// Appends diagnostics already emitted elsewhere, without logging them again.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Number of recorded diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostics in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.entries.iter()
    }

    /// Diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    /// Recorded diagnostics in order.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// Fails if any data inconsistency was recorded; notices pass through.
    ///
    /// # Errors
    /// [`AssemblyError::StrictDiagnostics`] with the number of
    /// inconsistencies and the first one.
    pub fn into_strict(self) -> Result<Self, AssemblyError> {
        let mut inconsistencies = self.entries.iter().filter(|d| d.kind.is_data_inconsistency());
        match inconsistencies.next() {
            None => Ok(self),
            Some(first) => Err(AssemblyError::StrictDiagnostics {
                count: 1 + inconsistencies.count(),
                first: first.to_string(),
            }),
        }
    }
}
