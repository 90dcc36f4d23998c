//! Source identity and per-source tables.
//!
//! Every fact in the assembly is keyed by the source it came from. Sources
//! are registered once, in input order, and referenced by a compact
//! [`SourceId`] everywhere else; per-source attributes live in a
//! fixed-shape [`PerSource`] table with one slot per source plus the
//! consensus `assembly` slot.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Compact identifier of a registered source model.
///
/// The value is the source's position in its [`SourceRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(u16);

impl SourceId {
    /// Returns the registry position of this source.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u16)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Ordered set of source names.
///
/// # Examples
///
/// ```
/// use supermodel::SourceRegistry;
///
/// let sources = SourceRegistry::new(["carveme", "gapseq"]).unwrap();
/// let gapseq = sources.id("gapseq").unwrap();
/// assert_eq!(sources.name(gapseq), "gapseq");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRegistry {
    names: Vec<String>,
}

impl SourceRegistry {
    /// Registers sources in the given order.
    ///
    /// # Errors
    /// Rejects an empty list, duplicate names, or more than `u16::MAX` sources.
    pub fn new<I, S>(names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registered: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if registered.contains(&name) {
                return Err(ValidationError::DuplicateSource { name });
            }
            registered.push(name);
        }
        if registered.is_empty() {
            return Err(ValidationError::EmptySourceList);
        }
        if registered.len() > usize::from(u16::MAX) {
            return Err(ValidationError::TooManySources {
                count: registered.len(),
                max: usize::from(u16::MAX),
            });
        }
        Ok(Self { names: registered })
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Looks up a source by name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<SourceId> {
        self.names.iter().position(|n| n == name).map(SourceId::from_index)
    }

    /// Returns the name of a registered source.
    ///
    /// # Panics
    /// Panics if `id` was not issued by this registry.
    #[must_use]
    pub fn name(&self, id: SourceId) -> &str {
        &self.names[id.index()]
    }

    /// All source ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        (0..self.names.len()).map(SourceId::from_index)
    }

    /// `(id, name)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (SourceId::from_index(i), n.as_str()))
    }

    /// Source names in registration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Resolves names to ids, collecting every unknown name into one error.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<SourceId>, ValidationError> {
        let mut ids = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();
        for name in names {
            match self.id(name.as_ref()) {
                Some(id) => ids.push(id),
                None => unknown.push(name.as_ref().to_string()),
            }
        }
        if unknown.is_empty() {
            Ok(ids)
        } else {
            Err(ValidationError::UnknownSources { names: unknown })
        }
    }
}

/// One value per source plus the consensus `assembly` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerSource<T> {
    by_source: Vec<T>,
    /// Cross-source consensus value.
    pub assembly: T,
}

impl<T: Default> PerSource<T> {
    /// Creates a table with default values for `source_count` sources.
    #[must_use]
    pub fn new(source_count: usize) -> Self {
        Self {
            by_source: (0..source_count).map(|_| T::default()).collect(),
            assembly: T::default(),
        }
    }
}

impl<T> PerSource<T> {
    /// Returns the value for `source`, if the source is in range.
    #[must_use]
    pub fn get(&self, source: SourceId) -> Option<&T> {
        self.by_source.get(source.index())
    }

    /// `(source, value)` pairs in registry order, excluding the assembly slot.
    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &T)> + '_ {
        self.by_source
            .iter()
            .enumerate()
            .map(|(i, v)| (SourceId::from_index(i), v))
    }

    /// Number of per-source slots.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.by_source.len()
    }
}

impl<T> Index<SourceId> for PerSource<T> {
    type Output = T;

    fn index(&self, source: SourceId) -> &T {
        &self.by_source[source.index()]
    }
}

impl<T> IndexMut<SourceId> for PerSource<T> {
    fn index_mut(&mut self, source: SourceId) -> &mut T {
        &mut self.by_source[source.index()]
    }
}

/// Which sources touch an entity, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InModels {
    /// Number of distinct sources.
    pub models_amount: usize,
    /// Distinct sources, first-seen order.
    pub models_list: Vec<SourceId>,
}

impl InModels {
    /// Starts the list with a single source.
    #[must_use]
    pub fn single(source: SourceId) -> Self {
        Self {
            models_amount: 1,
            models_list: vec![source],
        }
    }

    /// Records `source`; returns true if it was not seen before.
    pub fn record(&mut self, source: SourceId) -> bool {
        if self.models_list.contains(&source) {
            return false;
        }
        self.models_list.push(source);
        self.models_amount += 1;
        true
    }

    /// Returns true if `source` is listed.
    #[must_use]
    pub fn contains(&self, source: SourceId) -> bool {
        self.models_list.contains(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_and_lookup() {
        let reg = SourceRegistry::new(["b", "a", "c"]).unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.id("a").unwrap().index(), 1);
        assert_eq!(reg.name(SourceId::from_index(2)), "c");
        let names: Vec<&str> = reg.iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let err = SourceRegistry::new(["a", "a"]).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateSource { .. }));
    }

    #[test]
    fn test_registry_rejects_empty() {
        let err = SourceRegistry::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, ValidationError::EmptySourceList));
    }

    #[test]
    fn test_resolve_all_reports_every_unknown() {
        let reg = SourceRegistry::new(["a", "b"]).unwrap();
        let err = reg.resolve_all(&["a", "x", "y"]).unwrap_err();
        match err {
            ValidationError::UnknownSources { names } => assert_eq!(names, vec!["x", "y"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_per_source_indexing() {
        let mut table: PerSource<Vec<u32>> = PerSource::new(2);
        let second = SourceId::from_index(1);
        table[second].push(7);
        table.assembly.push(1);
        assert_eq!(table[second], vec![7]);
        assert!(table[SourceId::from_index(0)].is_empty());
        assert!(table.get(SourceId::from_index(5)).is_none());
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn test_in_models_records_once() {
        let a = SourceId::from_index(0);
        let b = SourceId::from_index(1);
        let mut in_models = InModels::single(a);
        assert!(!in_models.record(a));
        assert!(in_models.record(b));
        assert_eq!(in_models.models_amount, 2);
        assert_eq!(in_models.models_list, vec![a, b]);
    }
}
