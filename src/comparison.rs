//! Comparison queries over the assembled model.
//!
//! Each query selects the assembly-bucket entities matching a source
//! condition, stores the selection under a label, and attaches a
//! consensus view under the same label to every selected entity.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::consensus::{
    core_coefficients, core_connections, core_gene_rule, core_lower_bound, core_upper_bound, partition_connections,
    Threshold,
};
use crate::entity::{Bucket, GeneHandle, MergedReaction, MetaboliteHandle, ReactionHandle, ReactionView};
use crate::error::ValidationError;
use crate::source::{InModels, PerSource, SourceId};
use crate::supermodel::SuperModel;

/// Entities selected by one comparison query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComparisonSet {
    /// Selected assembly-bucket metabolites.
    pub metabolites: Vec<MetaboliteHandle>,
    /// Selected assembly-bucket reactions.
    pub reactions: Vec<ReactionHandle>,
    /// Selected assembly-bucket genes.
    pub genes: Vec<GeneHandle>,
}

impl ComparisonSet {
    /// Total number of selected entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metabolites.len() + self.reactions.len() + self.genes.len()
    }

    /// Returns true if the query selected nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which sources a query looks at.
#[derive(Debug, Clone)]
enum Condition {
    Threshold(Threshold),
    Partition { yes: Vec<SourceId>, no: Vec<SourceId> },
}

impl Condition {
    fn selects(&self, in_models: &InModels) -> bool {
        match self {
            Self::Threshold(threshold) => threshold.accepts(in_models.models_amount),
            Self::Partition { yes, no } => {
                yes.iter().all(|&s| in_models.contains(s)) && !no.iter().any(|&s| in_models.contains(s))
            }
        }
    }

    fn connections<T: Copy + Eq + std::hash::Hash>(
        &self,
        per_source: &PerSource<Vec<T>>,
        all: &[SourceId],
    ) -> Vec<T> {
        match self {
            Self::Threshold(threshold) => core_connections(per_source, all, *threshold),
            Self::Partition { yes, no } => partition_connections(per_source, yes, no),
        }
    }

    fn reaction_view(&self, reaction: &MergedReaction, all: &[SourceId], and_as_solid: bool) -> ReactionView {
        let reactants = self.connections(&reaction.reactants, all);
        let products = self.connections(&reaction.products, all);
        let genes = self.connections(&reaction.genes, all);
        let (rule_scope, rule_threshold, bound_scope, k) = match self {
            Self::Threshold(threshold) => (
                all.to_vec(),
                *threshold,
                reaction.core.in_models.models_list.clone(),
                threshold.k(),
            ),
            Self::Partition { yes, .. } if yes.is_empty() => {
                // Selected reactions are in no `no` source, so every source they are in counts.
                let present = reaction.core.in_models.models_list.clone();
                (present.clone(), Threshold::AtLeast(1), present, 1)
            }
            Self::Partition { yes, .. } => (yes.clone(), Threshold::AtLeast(yes.len()), yes.clone(), yes.len()),
        };
        let metabolites = core_coefficients(&reaction.metabolites, &reactants, &products, &bound_scope);
        ReactionView {
            gene_reaction_rule: core_gene_rule(&reaction.gene_reaction_rule, &rule_scope, rule_threshold, and_as_solid),
            lower_bound: core_lower_bound(&reaction.lower_bound, &bound_scope, k),
            upper_bound: core_upper_bound(&reaction.upper_bound, &bound_scope, k),
            reactants,
            products,
            metabolites,
            genes,
        }
    }
}

impl SuperModel {
    /// Shortest prefix length that keeps all source names distinct.
    #[must_use]
    pub fn short_name_len(&self) -> usize {
        let names = self.sources.names();
        let longest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
        (0..=longest)
            .find(|&i| names.iter().map(|n| n.chars().take(i).collect::<String>()).all_unique())
            .unwrap_or(longest)
    }

    fn check_k(&self, k: usize) -> Result<(), ValidationError> {
        let source_count = self.sources.len();
        if k < 1 || k > source_count {
            return Err(ValidationError::InvalidThreshold { k, source_count });
        }
        Ok(())
    }

    /// Entities present in at least `k` sources; stored under `core{k}`.
    ///
    /// # Errors
    /// `k` outside `2..=source count`. `k = 1` is the assembly itself.
    pub fn at_least_in(&mut self, k: usize) -> Result<String, ValidationError> {
        self.check_k(k)?;
        if k == 1 {
            return Err(ValidationError::ThresholdAlreadyAssembled);
        }
        let threshold = Threshold::AtLeast(k);
        Ok(self.run(threshold.to_string(), &Condition::Threshold(threshold)))
    }

    /// Entities present in exactly `k` sources; stored under `exactly{k}`.
    ///
    /// # Errors
    /// `k` outside `1..=source count`.
    pub fn exactly_in(&mut self, k: usize) -> Result<String, ValidationError> {
        self.check_k(k)?;
        let threshold = Threshold::Exactly(k);
        Ok(self.run(threshold.to_string(), &Condition::Threshold(threshold)))
    }

    /// Entities present in every `yes` source and in no `no` source.
    ///
    /// # Errors
    /// Both lists empty, unknown source names, or a source on both sides.
    pub fn present<S: AsRef<str>>(&mut self, yes: &[S], no: &[S]) -> Result<String, ValidationError> {
        self.present_with(yes, no, self.short_name_len())
    }

    /// [`SuperModel::present`] with an explicit label abbreviation length.
    ///
    /// # Errors
    /// Same as [`SuperModel::present`].
    pub fn present_with<S: AsRef<str>>(
        &mut self,
        yes: &[S],
        no: &[S],
        short_name_len: usize,
    ) -> Result<String, ValidationError> {
        if yes.is_empty() && no.is_empty() {
            return Err(ValidationError::EmptyPartition);
        }
        let mut unknown = Vec::new();
        for name in yes.iter().chain(no) {
            if self.sources.id(name.as_ref()).is_none() {
                unknown.push(name.as_ref().to_string());
            }
        }
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownSources { names: unknown });
        }
        let overlap: Vec<String> = yes
            .iter()
            .filter(|y| no.iter().any(|n| n.as_ref() == y.as_ref()))
            .map(|y| y.as_ref().to_string())
            .collect();
        if !overlap.is_empty() {
            return Err(ValidationError::OverlappingPartition { names: overlap });
        }

        let yes = self.sources.resolve_all(yes)?;
        let no = self.sources.resolve_all(no)?;
        let label = self.partition_label(&yes, &no, short_name_len);
        Ok(self.run(label, &Condition::Partition { yes, no }))
    }

    /// Runs [`SuperModel::present`] for every non-trivial split of the
    /// sources (`2^M - 2` segments); returns the labels.
    pub fn venn_segments(&mut self) -> Vec<String> {
        let short = self.short_name_len();
        let all: Vec<SourceId> = self.sources.ids().collect();
        let mut labels = Vec::new();
        for size in 1..all.len() {
            for yes in all.iter().copied().combinations(size) {
                let no: Vec<SourceId> = all.iter().copied().filter(|s| !yes.contains(s)).collect();
                let label = self.partition_label(&yes, &no, short);
                labels.push(self.run(label, &Condition::Partition { yes, no }));
            }
        }
        labels
    }

    /// Entities present in every source; stored under `core{M}`.
    pub fn intersection(&mut self) -> String {
        let threshold = Threshold::AtLeast(self.sources.len());
        self.run(threshold.to_string(), &Condition::Threshold(threshold))
    }

    /// Runs [`SuperModel::at_least_in`] for every `k` from the number of sources down to 2.
    pub fn all_confidence_levels(&mut self) -> Vec<String> {
        (2..=self.sources.len())
            .rev()
            .map(|k| {
                let threshold = Threshold::AtLeast(k);
                self.run(threshold.to_string(), &Condition::Threshold(threshold))
            })
            .collect()
    }

    /// A stored comparison by label.
    #[must_use]
    pub fn comparison(&self, label: &str) -> Option<&ComparisonSet> {
        self.comparisons.get(label)
    }

    fn partition_label(&self, yes: &[SourceId], no: &[SourceId], short_name_len: usize) -> String {
        let side = |prefix: &str, ids: &[SourceId]| -> Option<String> {
            if ids.is_empty() {
                return None;
            }
            let mut shorts: Vec<String> = ids
                .iter()
                .map(|&s| self.sources.name(s).chars().take(short_name_len).collect())
                .collect();
            shorts.sort();
            Some(format!("{prefix}_{}", shorts.join("_")))
        };
        [side("yes", yes), side("no", no)].into_iter().flatten().join("_")
    }

    fn run(&mut self, label: String, condition: &Condition) -> String {
        let all: Vec<SourceId> = self.sources.ids().collect();
        let and_as_solid = self.config.and_as_solid;
        let mut set = ComparisonSet::default();

        let handles: Vec<MetaboliteHandle> = self.metabolites.handles(Bucket::Assembly).collect();
        for handle in handles {
            let metabolite = self.metabolites.get_mut(handle);
            if condition.selects(&metabolite.core.in_models) {
                let view = condition.connections(&metabolite.reactions, &all);
                metabolite.comparison.insert(label.clone(), view);
                set.metabolites.push(handle);
            }
        }

        let handles: Vec<ReactionHandle> = self.reactions.handles(Bucket::Assembly).collect();
        for handle in handles {
            let reaction = self.reactions.get_mut(handle);
            if condition.selects(&reaction.core.in_models) {
                let view = condition.reaction_view(reaction, &all, and_as_solid);
                reaction.comparison.insert(label.clone(), view);
                set.reactions.push(handle);
            }
        }

        let handles: Vec<GeneHandle> = self.genes.handles(Bucket::Assembly).collect();
        for handle in handles {
            let gene = self.genes.get_mut(handle);
            if condition.selects(&gene.core.in_models) {
                let view = condition.connections(&gene.reactions, &all);
                gene.comparison.insert(label.clone(), view);
                set.genes.push(handle);
            }
        }

        tracing::info!(
            label = %label,
            metabolites = set.metabolites.len(),
            reactions = set.reactions.len(),
            genes = set.genes.len(),
            "comparison stored"
        );
        self.comparisons.insert(label.clone(), set);
        label
    }
}
