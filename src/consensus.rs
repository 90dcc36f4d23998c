//! Consensus utilities over per-source attribute tables.
//!
//! All functions are pure: they read per-source values, restricted to a
//! scope of sources, and return the consensus value for a threshold.

use std::fmt;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

use crate::gpr::{normalize_complexes, Gpr};
use crate::source::{PerSource, SourceId};

/// How many supporting sources an item needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Threshold {
    /// Supported by `k` or more sources.
    AtLeast(usize),
    /// Supported by exactly `k` sources.
    Exactly(usize),
}

impl Threshold {
    /// The `k` of the threshold.
    #[must_use]
    pub const fn k(self) -> usize {
        match self {
            Self::AtLeast(k) | Self::Exactly(k) => k,
        }
    }

    /// Returns true if `count` supporting sources satisfy the threshold.
    #[must_use]
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Self::AtLeast(k) => count >= k,
            Self::Exactly(k) => count == k,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeast(k) => write!(f, "core{k}"),
            Self::Exactly(k) => write!(f, "exactly{k}"),
        }
    }
}

/// Counts, per item, the scoped sources whose list contains it. First-seen order.
fn support<T: Copy + Eq + Hash>(per_source: &PerSource<Vec<T>>, scope: &[SourceId]) -> IndexMap<T, usize> {
    let mut counts: IndexMap<T, usize> = IndexMap::new();
    for &source in scope {
        let Some(items) = per_source.get(source) else {
            continue;
        };
        let distinct: IndexSet<T> = items.iter().copied().collect();
        for item in distinct {
            *counts.entry(item).or_default() += 1;
        }
    }
    counts
}

/// Items supported by a number of scoped sources matching the threshold.
#[must_use]
pub fn core_connections<T: Copy + Eq + Hash>(
    per_source: &PerSource<Vec<T>>,
    scope: &[SourceId],
    threshold: Threshold,
) -> Vec<T> {
    support(per_source, scope)
        .into_iter()
        .filter(|&(_, count)| threshold.accepts(count))
        .map(|(item, _)| item)
        .collect()
}

/// Items present in every `yes` source and in no `no` source.
///
/// With no `yes` source, candidates come from every source outside `no`.
#[must_use]
pub fn partition_connections<T: Copy + Eq + Hash>(
    per_source: &PerSource<Vec<T>>,
    yes: &[SourceId],
    no: &[SourceId],
) -> Vec<T> {
    let candidates: Vec<T> = if yes.is_empty() {
        let others: Vec<SourceId> = per_source.iter().map(|(s, _)| s).filter(|s| !no.contains(s)).collect();
        support(per_source, &others).into_keys().collect()
    } else {
        core_connections(per_source, yes, Threshold::AtLeast(yes.len()))
    };
    candidates
        .into_iter()
        .filter(|item| {
            no.iter()
                .all(|&s| per_source.get(s).map_or(true, |items| !items.contains(item)))
        })
        .collect()
}

/// Rules that fail to parse or expand past [`crate::gpr::MAX_COMPLEXES`] contribute no complexes.
fn parsed_complexes(rule: Option<&String>) -> Vec<Vec<String>> {
    rule.and_then(|r| Gpr::parse(r).ok().flatten())
        .and_then(|g| g.complexes().ok())
        .unwrap_or_default()
}

/// Consensus gene rule.
///
/// With `and_as_solid`, each AND-complex counts as one unit of support and
/// the result is the OR of the supported complexes. Otherwise each gene is
/// a unit; every complex is cut down to the supported genes, and the result
/// is the OR of what remains.
#[must_use]
pub fn core_gene_rule(
    rules: &PerSource<Option<String>>,
    scope: &[SourceId],
    threshold: Threshold,
    and_as_solid: bool,
) -> Option<String> {
    let per_source: Vec<Vec<Vec<String>>> = scope
        .iter()
        .map(|&s| parsed_complexes(rules.get(s).and_then(Option::as_ref)))
        .collect();

    let complexes = if and_as_solid {
        let mut counts: IndexMap<Vec<String>, usize> = IndexMap::new();
        for complexes in &per_source {
            for complex in complexes {
                *counts.entry(complex.clone()).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .filter(|&(_, count)| threshold.accepts(count))
            .map(|(complex, _)| complex)
            .collect()
    } else {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for complexes in &per_source {
            let genes: IndexSet<&str> = complexes.iter().flatten().map(String::as_str).collect();
            for gene in genes {
                *counts.entry(gene).or_default() += 1;
            }
        }
        let supported: IndexSet<&str> = counts
            .into_iter()
            .filter(|&(_, count)| threshold.accepts(count))
            .map(|(gene, _)| gene)
            .collect();
        let restricted: Vec<Vec<String>> = per_source
            .iter()
            .flatten()
            .map(|complex| {
                complex
                    .iter()
                    .filter(|g| supported.contains(g.as_str()))
                    .cloned()
                    .collect::<Vec<String>>()
            })
            .filter(|complex| !complex.is_empty())
            .collect();
        normalize_complexes(restricted)
    };

    Gpr::from_complexes(&complexes).map(|g| g.to_string())
}

fn scoped_bounds(bounds: &PerSource<Option<f64>>, scope: &[SourceId]) -> Vec<f64> {
    scope
        .iter()
        .filter_map(|&s| bounds.get(s).copied().flatten())
        .collect()
}

/// The `k`-th most negative lower bound of the scoped sources.
///
/// `k = 1` gives the most permissive bound.
#[must_use]
pub fn core_lower_bound(bounds: &PerSource<Option<f64>>, scope: &[SourceId], k: usize) -> Option<f64> {
    let mut values = scoped_bounds(bounds, scope);
    values.sort_by(f64::total_cmp);
    k.checked_sub(1).and_then(|i| values.get(i).copied())
}

/// The `k`-th most positive upper bound of the scoped sources.
#[must_use]
pub fn core_upper_bound(bounds: &PerSource<Option<f64>>, scope: &[SourceId], k: usize) -> Option<f64> {
    let mut values = scoped_bounds(bounds, scope);
    values.sort_by(|a, b| b.total_cmp(a));
    k.checked_sub(1).and_then(|i| values.get(i).copied())
}

/// Coefficients for a consensus reactant/product split.
///
/// Each metabolite takes the most frequent absolute coefficient among the
/// scoped sources (first seen on ties), negative for reactants and
/// positive for products.
#[must_use]
pub fn core_coefficients<T: Copy + Eq + Hash>(
    metabolites: &PerSource<IndexMap<T, f64>>,
    reactants: &[T],
    products: &[T],
    scope: &[SourceId],
) -> IndexMap<T, f64> {
    let mut out = IndexMap::new();
    for (&item, sign) in reactants
        .iter()
        .map(|m| (m, -1.0))
        .chain(products.iter().map(|m| (m, 1.0)))
    {
        if out.contains_key(&item) {
            continue;
        }
        let mut counts: Vec<(f64, usize)> = Vec::new();
        for &source in scope {
            let Some(coefficient) = metabolites.get(source).and_then(|m| m.get(&item)) else {
                continue;
            };
            let magnitude = coefficient.abs();
            match counts.iter_mut().find(|(value, _)| *value == magnitude) {
                Some((_, count)) => *count += 1,
                None => counts.push((magnitude, 1)),
            }
        }
        let mut best: Option<(f64, usize)> = None;
        for &(value, count) in &counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((value, count));
            }
        }
        if let Some((magnitude, _)) = best {
            out.insert(item, sign * magnitude);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(i: usize) -> SourceId {
        SourceId::from_index(i)
    }

    fn scope(n: usize) -> Vec<SourceId> {
        (0..n).map(sid).collect()
    }

    fn lists(values: &[&[u32]]) -> PerSource<Vec<u32>> {
        let mut table = PerSource::new(values.len());
        for (i, v) in values.iter().enumerate() {
            table[sid(i)] = v.to_vec();
        }
        table
    }

    fn rules(values: &[Option<&str>]) -> PerSource<Option<String>> {
        let mut table = PerSource::new(values.len());
        for (i, v) in values.iter().enumerate() {
            table[sid(i)] = v.map(str::to_string);
        }
        table
    }

    #[test]
    fn test_threshold_display_and_accepts() {
        assert_eq!(Threshold::AtLeast(2).to_string(), "core2");
        assert_eq!(Threshold::Exactly(1).to_string(), "exactly1");
        assert!(Threshold::AtLeast(2).accepts(3));
        assert!(!Threshold::Exactly(2).accepts(3));
    }

    #[test]
    fn test_core_connections_first_seen_order() {
        let table = lists(&[&[3, 1], &[1, 2], &[2, 1, 1]]);
        assert_eq!(core_connections(&table, &scope(3), Threshold::AtLeast(1)), vec![3, 1, 2]);
        assert_eq!(core_connections(&table, &scope(3), Threshold::AtLeast(2)), vec![1, 2]);
        assert_eq!(core_connections(&table, &scope(3), Threshold::Exactly(1)), vec![3]);
        assert_eq!(core_connections(&table, &scope(3), Threshold::AtLeast(3)), vec![1]);
    }

    #[test]
    fn test_partition_connections() {
        let table = lists(&[&[1, 2], &[1, 3], &[2]]);
        assert_eq!(partition_connections(&table, &[sid(0)], &[sid(2)]), vec![1]);
        assert_eq!(partition_connections(&table, &[sid(0), sid(1)], &[]), vec![1]);
        assert_eq!(partition_connections(&table, &[], &[sid(0)]), vec![3]);
    }

    #[test]
    fn test_gene_rule_genes_as_units() {
        let table = rules(&[Some("g1 and g2"), Some("g1 or g3"), None]);
        assert_eq!(core_gene_rule(&table, &scope(3), Threshold::AtLeast(1), false).as_deref(), Some("(g1 and g2) or g1 or g3"));
        assert_eq!(core_gene_rule(&table, &scope(3), Threshold::AtLeast(2), false).as_deref(), Some("g1"));
        assert_eq!(core_gene_rule(&table, &scope(3), Threshold::AtLeast(3), false), None);
    }

    #[test]
    fn test_gene_rule_complexes_as_units() {
        let table = rules(&[Some("g1 and g2"), Some("(g2 and g1) or g3")]);
        assert_eq!(core_gene_rule(&table, &scope(2), Threshold::AtLeast(2), true).as_deref(), Some("g1 and g2"));
        assert_eq!(core_gene_rule(&table, &scope(2), Threshold::Exactly(1), true).as_deref(), Some("g3"));
    }

    #[test]
    fn test_bounds_envelope() {
        let mut lower: PerSource<Option<f64>> = PerSource::new(3);
        let mut upper: PerSource<Option<f64>> = PerSource::new(3);
        for (i, (l, u)) in [(0.0, 1000.0), (-1000.0, 500.0), (-10.0, 10.0)].into_iter().enumerate() {
            lower[sid(i)] = Some(l);
            upper[sid(i)] = Some(u);
        }
        assert_eq!(core_lower_bound(&lower, &scope(3), 1), Some(-1000.0));
        assert_eq!(core_upper_bound(&upper, &scope(3), 1), Some(1000.0));
        assert_eq!(core_lower_bound(&lower, &scope(3), 2), Some(-10.0));
        assert_eq!(core_upper_bound(&upper, &scope(3), 2), Some(500.0));
        assert_eq!(core_lower_bound(&lower, &scope(3), 4), None);
        assert_eq!(core_lower_bound(&lower, &scope(3), 0), None);
    }

    #[test]
    fn test_coefficients_follow_membership() {
        let mut metabolites: PerSource<IndexMap<u32, f64>> = PerSource::new(3);
        metabolites[sid(0)].insert(1, -2.0);
        metabolites[sid(1)].insert(1, 2.0);
        metabolites[sid(2)].insert(1, -1.0);
        metabolites[sid(0)].insert(2, 1.0);
        let out = core_coefficients(&metabolites, &[1], &[2], &scope(3));
        assert_eq!(out[&1], -2.0);
        assert_eq!(out[&2], 1.0);
    }
}
