//! Reference vocabulary lookups (display names, formulas, equations).
//!
//! Keys are normalized: metabolite ids lose their compartment suffix
//! (`_c`, `_e`, `_p`) and reaction ids have a `sink_` prefix rewritten to
//! `DM_` before lookup.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Name and chemical formula (metabolites) or equation string (reactions).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceRecord {
    /// Display name.
    pub name: Option<String>,
    /// Chemical formula or equation string.
    pub formula: Option<String>,
}

/// Read-only key → record table.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    records: HashMap<String, ReferenceRecord>,
}

fn compartment_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new("_([cep])$").expect("static regex"))
}

/// Strips the compartment suffix from a metabolite id.
#[must_use]
pub fn metabolite_key(id: &str) -> String {
    compartment_suffix().replace(id, "").into_owned()
}

/// Rewrites a `sink_` reaction id to its `DM_` reference spelling.
#[must_use]
pub fn reaction_key(id: &str) -> String {
    id.replace("sink_", "DM_")
}

impl ReferenceTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record under an already-normalized key.
    pub fn insert(&mut self, key: impl Into<String>, name: Option<&str>, formula: Option<&str>) {
        self.records.insert(
            key.into(),
            ReferenceRecord {
                name: name.map(str::to_string),
                formula: formula.map(str::to_string),
            },
        );
    }

    /// Builder-style [`ReferenceTable::insert`] with a name only.
    #[must_use]
    pub fn with_name(mut self, key: impl Into<String>, name: &str) -> Self {
        self.insert(key, Some(name), None);
        self
    }

    /// Record for a metabolite new id.
    #[must_use]
    pub fn metabolite(&self, new_id: &str) -> Option<&ReferenceRecord> {
        self.records.get(&metabolite_key(new_id))
    }

    /// Record for a reaction new id.
    #[must_use]
    pub fn reaction(&self, new_id: &str) -> Option<&ReferenceRecord> {
        self.records.get(&reaction_key(new_id))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ReferenceRecord)> for ReferenceTable {
    fn from_iter<I: IntoIterator<Item = (K, ReferenceRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
