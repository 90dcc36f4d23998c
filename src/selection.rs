//! Identity selections produced upstream of the assembler.
//!
//! For every source, each original (old) id is assigned a new id and the
//! compartments it lives in. Selections accepted into the canonical
//! vocabulary are "selected"; the rest are "not selected" and keep their
//! original identity.

use indexmap::{IndexMap, IndexSet};

/// One accepted identity for an old id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Accepted new id.
    pub new_id: String,
    /// Compartments of the new id.
    pub compartments: Vec<String>,
}

impl Selection {
    /// Creates a selection.
    #[must_use]
    pub fn new(new_id: impl Into<String>, compartments: &[&str]) -> Self {
        Self {
            new_id: new_id.into(),
            compartments: compartments.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

/// Selections keyed by source name, then by old id. Insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    by_source: IndexMap<String, IndexMap<String, Selection>>,
}

impl SelectionSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `old_id → selection` for a source. A repeated old id replaces the earlier selection.
    pub fn insert(&mut self, source: impl Into<String>, old_id: impl Into<String>, selection: Selection) {
        self.by_source
            .entry(source.into())
            .or_default()
            .insert(old_id.into(), selection);
    }

    /// Builder-style [`SelectionSet::insert`].
    #[must_use]
    pub fn with(
        mut self,
        source: impl Into<String>,
        old_id: impl Into<String>,
        new_id: impl Into<String>,
        compartments: &[&str],
    ) -> Self {
        self.insert(source, old_id, Selection::new(new_id, compartments));
        self
    }

    /// Selections of one source, in insertion order.
    #[must_use]
    pub fn source(&self, source: &str) -> Option<&IndexMap<String, Selection>> {
        self.by_source.get(source)
    }

    /// Returns true if the source has the old id.
    #[must_use]
    pub fn contains(&self, source: &str, old_id: &str) -> bool {
        self.by_source
            .get(source)
            .is_some_and(|m| m.contains_key(old_id))
    }

    /// Source names in insertion order.
    pub fn sources(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_source.keys().map(String::as_str)
    }

    /// Returns true if no selection was inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_source.values().all(IndexMap::is_empty)
    }
}

/// Per-source record of reactions split across the periplasmic boundary.
///
/// For each split reaction, the set holds the old metabolite ids whose
/// periplasmic duplicate was used in that reaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriplasmicSplits {
    by_source: IndexMap<String, IndexMap<String, IndexSet<String>>>,
}

impl PeriplasmicSplits {
    /// No split reactions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a source as having periplasmic changes, even with no split reaction.
    pub fn register_source(&mut self, source: impl Into<String>) {
        self.by_source.entry(source.into()).or_default();
    }

    /// Records that `reaction` of `source` uses the periplasmic duplicate of each metabolite.
    pub fn insert(&mut self, source: impl Into<String>, reaction: impl Into<String>, metabolites: &[&str]) {
        let entry = self
            .by_source
            .entry(source.into())
            .or_default()
            .entry(reaction.into())
            .or_default();
        entry.extend(metabolites.iter().map(|m| (*m).to_string()));
    }

    /// Builder-style [`PeriplasmicSplits::insert`].
    #[must_use]
    pub fn with(mut self, source: impl Into<String>, reaction: impl Into<String>, metabolites: &[&str]) -> Self {
        self.insert(source, reaction, metabolites);
        self
    }

    /// Split reactions of one source.
    #[must_use]
    pub fn source(&self, source: &str) -> Option<&IndexMap<String, IndexSet<String>>> {
        self.by_source.get(source)
    }

    /// Source names with periplasmic changes.
    pub fn sources(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_source.keys().map(String::as_str)
    }
}
