//! Reaction orientation reconciliation.
//!
//! Sources may write the same reaction in opposite directions. For every
//! merged reaction whose sources disagree, one orientation is chosen by
//! majority; a tie between two groups is broken by lower-bound sign, and
//! failing that by the lexicographically first source.

use std::collections::HashSet;

use itertools::Itertools;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::entity::{Bucket, MergedReaction, MetaboliteHandle, ReactionHandle, Registry};
use crate::source::{SourceId, SourceRegistry};

/// How an orientation was decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Orientation {
    /// Every source agrees, or a source lacks a side; nothing changed.
    Consistent,
    /// One group of sources holds the majority.
    Majority { swapped: Vec<SourceId> },
    /// Two groups tied; the one without reverse-flux evidence was swapped.
    BoundSign { swapped: Vec<SourceId> },
    /// Sources not sharing a reactant with the first source by name were swapped.
    Lexicographic { swapped: Vec<SourceId> },
}

impl Orientation {
    /// Sources whose orientation was flipped.
    #[must_use]
    pub fn swapped(&self) -> &[SourceId] {
        match self {
            Self::Consistent => &[],
            Self::Majority { swapped } | Self::BoundSign { swapped } | Self::Lexicographic { swapped } => swapped,
        }
    }
}

fn intersects(a: &[MetaboliteHandle], b: &[MetaboliteHandle]) -> bool {
    a.iter().any(|m| b.contains(m))
}

fn common(reaction: &MergedReaction, group: &[SourceId], side: fn(&MergedReaction, SourceId) -> &[MetaboliteHandle]) -> bool {
    let Some((&first, rest)) = group.split_first() else {
        return false;
    };
    let mut shared: HashSet<MetaboliteHandle> = side(reaction, first).iter().copied().collect();
    for &source in rest {
        let other: HashSet<MetaboliteHandle> = side(reaction, source).iter().copied().collect();
        shared.retain(|m| other.contains(m));
    }
    !shared.is_empty()
}

fn reactants_of(reaction: &MergedReaction, source: SourceId) -> &[MetaboliteHandle] {
    &reaction.reactants[source]
}

fn products_of(reaction: &MergedReaction, source: SourceId) -> &[MetaboliteHandle] {
    &reaction.products[source]
}

/// Reconciles reactions of one bucket.
pub struct DirectionReconciler<'a> {
    sources: &'a SourceRegistry,
}

impl<'a> DirectionReconciler<'a> {
    /// Creates a reconciler over the run sources.
    #[must_use]
    pub fn new(sources: &'a SourceRegistry) -> Self {
        Self { sources }
    }

    /// Reconciles every reaction of `bucket`; returns the reactions that changed.
    pub fn reconcile_bucket(
        &self,
        reactions: &mut Registry<MergedReaction>,
        bucket: Bucket,
        diagnostics: &mut Diagnostics,
    ) -> Vec<(ReactionHandle, Orientation)> {
        let handles: Vec<ReactionHandle> = reactions.handles(bucket).collect();
        let mut changed = Vec::new();
        for handle in handles {
            let orientation = self.reconcile(reactions.get_mut(handle), diagnostics);
            if orientation != Orientation::Consistent {
                changed.push((handle, orientation));
            }
        }
        tracing::debug!(?bucket, reoriented = changed.len(), "direction reconciliation done");
        changed
    }

    /// Chooses one orientation for a reaction and swaps the sources that disagree.
    pub fn reconcile(&self, reaction: &mut MergedReaction, diagnostics: &mut Diagnostics) -> Orientation {
        let members = reaction.core.in_models.models_list.clone();
        if members.is_empty() {
            return Orientation::Consistent;
        }
        if members
            .iter()
            .any(|&s| reaction.reactants[s].is_empty() || reaction.products[s].is_empty())
        {
            return Orientation::Consistent;
        }
        if common(reaction, &members, reactants_of) && common(reaction, &members, products_of) {
            return Orientation::Consistent;
        }

        let qualifying = Self::qualifying_groups(reaction, &members);
        let orientation = match qualifying.as_slice() {
            [majority] => Orientation::Majority {
                swapped: members.iter().copied().filter(|s| !majority.contains(s)).collect(),
            },
            [first, second] => {
                let min_lower = |group: &[SourceId]| {
                    group
                        .iter()
                        .filter_map(|&s| reaction.lower_bound[s])
                        .fold(0.0_f64, f64::min)
                };
                let (lb1, lb2) = (min_lower(first), min_lower(second));
                if lb1 < 0.0 && lb2 >= 0.0 {
                    Orientation::BoundSign { swapped: second.clone() }
                } else if lb1 >= 0.0 && lb2 < 0.0 {
                    Orientation::BoundSign { swapped: first.clone() }
                } else {
                    self.lexicographic(reaction, &members)
                }
            }
            _ => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnexpectedDirectionTie,
                    reaction.core.id.as_str(),
                    format!(
                        "{} qualifying source groups; falling back to the first source by name",
                        qualifying.len()
                    ),
                ));
                self.lexicographic(reaction, &members)
            }
        };

        for &source in orientation.swapped() {
            reaction.swap_orientation(source);
        }
        orientation
    }

    /// Groups of size `n-1` down to `ceil(n/2)` whose reactants intersect;
    /// only the largest size with any qualifying group is returned.
    fn qualifying_groups(reaction: &MergedReaction, members: &[SourceId]) -> Vec<Vec<SourceId>> {
        let n = members.len();
        let smallest = n.div_ceil(2).max(1);
        for size in (smallest..n).rev() {
            let groups: Vec<Vec<SourceId>> = members
                .iter()
                .copied()
                .combinations(size)
                .filter(|group| common(reaction, group, reactants_of))
                .collect();
            if !groups.is_empty() {
                return groups;
            }
        }
        Vec::new()
    }

    fn lexicographic(&self, reaction: &MergedReaction, members: &[SourceId]) -> Orientation {
        let mut by_name: Vec<SourceId> = members.to_vec();
        by_name.sort_by(|a, b| self.sources.name(*a).cmp(self.sources.name(*b)));
        let Some((&reference, rest)) = by_name.split_first() else {
            return Orientation::Consistent;
        };
        let swapped = rest
            .iter()
            .copied()
            .filter(|&s| !intersects(&reaction.reactants[s], &reaction.reactants[reference]))
            .collect();
        Orientation::Lexicographic { swapped }
    }
}
