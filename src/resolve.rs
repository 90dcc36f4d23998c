//! Connection resolver.
//!
//! Walks each source's original graph through the [`IdentityMapper`] and
//! fills the per-source connection lists of merged entities: reactions of
//! metabolites and genes, participants and coefficients of reactions,
//! gene rules, and the plain attributes (formula, bounds, subsystem).
//! Every per-source slot is written only from that source's own graph.

use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::entity::{
    Bucket, GeneHandle, MergedGene, MergedMetabolite, MergedReaction, MetaboliteHandle, ReactionHandle, Registry,
};
use crate::gpr::{rewrite_rule, union_rules};
use crate::mapper::IdentityMapper;
use crate::source::{SourceId, SourceRegistry};
use crate::source_model::{OldReaction, SourceModel};
use crate::translation::NOT_FOUND;

/// Separator between subsystems of several old instances of one reaction.
pub const SUBSYSTEM_SEPARATOR: &str = "#or#";

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Per-source result of resolving one merged reaction.
#[derive(Debug, Default)]
struct ReactionConnections {
    reactants: Vec<MetaboliteHandle>,
    products: Vec<MetaboliteHandle>,
    metabolites: IndexMap<MetaboliteHandle, f64>,
    gene_reaction_rule: Option<String>,
    mixed_rules: Vec<String>,
    genes: Vec<GeneHandle>,
}

/// Gene rule of one source, plus the canonical genes it introduces.
#[derive(Debug, Default)]
struct GeneRuleOutcome {
    rule: Option<String>,
    mixed: Vec<String>,
    genes_to_add: Vec<String>,
}

/// Resolves connections of one bucket at a time.
pub struct ConnectionResolver<'a, 'm> {
    sources: &'a SourceRegistry,
    models: &'m [SourceModel],
    mapper: &'a IdentityMapper<'m>,
}

impl<'a, 'm> ConnectionResolver<'a, 'm> {
    /// Creates a resolver over the source models and their identity mapper.
    #[must_use]
    pub fn new(sources: &'a SourceRegistry, models: &'m [SourceModel], mapper: &'a IdentityMapper<'m>) -> Self {
        Self {
            sources,
            models,
            mapper,
        }
    }

    /// Resolves every entity of `bucket`.
    pub fn resolve_bucket(
        &self,
        metabolites: &mut Registry<MergedMetabolite>,
        reactions: &mut Registry<MergedReaction>,
        genes: &mut Registry<MergedGene>,
        bucket: Bucket,
        diagnostics: &mut Diagnostics,
    ) {
        tracing::debug!(
            ?bucket,
            metabolites = metabolites.bucket_len(bucket),
            reactions = reactions.bucket_len(bucket),
            genes = genes.bucket_len(bucket),
            "resolving connections"
        );
        self.metabolite_reactions(metabolites, bucket);
        self.reaction_connections(reactions, metabolites, genes, bucket, diagnostics);
        self.gene_reactions(genes, bucket);
        self.additional_attributes(metabolites, reactions, bucket);
    }

    /// Links merged metabolites to the merged reactions of their old metabolites.
    ///
    /// An old metabolite with a periplasmic duplicate gives a reaction only
    /// to the duplicate whose periplasmic-ness matches whether it was the
    /// periplasmic one in that reaction.
    pub fn metabolite_reactions(&self, metabolites: &mut Registry<MergedMetabolite>, bucket: Bucket) {
        let unresolved = bucket.is_unresolved();
        let handles: Vec<MetaboliteHandle> = metabolites.handles(bucket).collect();
        for handle in handles {
            let metabolite = metabolites.get(handle);
            let is_periplasmic = metabolite.core.is_periplasmic();
            let mut found: Vec<(SourceId, Vec<ReactionHandle>)> = Vec::new();

            for &source in &metabolite.core.in_models.models_list {
                let model = &self.models[source.index()];
                let split_metabolites = self.mapper.periplasmic_metabolites(source);
                let mut linked = Vec::new();
                for old in self.mapper.get_old_mets(source, handle, unresolved) {
                    let has_duplicate = split_metabolites.iter().any(|m| m == &old.id);
                    for reaction_id in model.reactions_of_metabolite(&old.id) {
                        let Some(&new_reaction) = self.mapper.get_new_rs(source, reaction_id, unresolved).first() else {
                            continue;
                        };
                        if has_duplicate && is_periplasmic != self.mapper.was_split_for(source, reaction_id, &old.id) {
                            continue;
                        }
                        push_unique(&mut linked, new_reaction);
                    }
                }
                if !linked.is_empty() {
                    found.push((source, linked));
                }
            }

            let metabolite = metabolites.get_mut(handle);
            for (source, linked) in found {
                metabolite.reactions[source] = linked;
            }
        }
    }

    /// Fills reactants, products, coefficients, gene rules, and genes of every reaction.
    pub fn reaction_connections(
        &self,
        reactions: &mut Registry<MergedReaction>,
        metabolites: &Registry<MergedMetabolite>,
        genes: &Registry<MergedGene>,
        bucket: Bucket,
        diagnostics: &mut Diagnostics,
    ) {
        let unresolved = bucket.is_unresolved();
        let handles: Vec<ReactionHandle> = reactions.handles(bucket).collect();
        for handle in handles {
            let reaction = reactions.get(handle);
            let reaction_id = reaction.core.id.clone();
            let mut resolved: Vec<(SourceId, ReactionConnections)> = Vec::new();

            for &source in &reaction.core.in_models.models_list {
                let old_rs = self.mapper.get_old_rs(source, handle, unresolved);
                let Some(template) = old_rs.first() else {
                    continue;
                };
                self.check_instances(source, &reaction_id, old_rs, diagnostics);

                let mut connections = ReactionConnections::default();
                for (old_met, &coefficient) in &template.metabolites {
                    let candidates = self.mapper.get_new_mets(source, old_met, unresolved);
                    let Some(chosen) =
                        self.pick_metabolite(source, &template.id, old_met, candidates, metabolites, &reaction_id, diagnostics)
                    else {
                        continue;
                    };
                    if coefficient < 0.0 {
                        push_unique(&mut connections.reactants, chosen);
                    } else if coefficient > 0.0 {
                        push_unique(&mut connections.products, chosen);
                    }
                    connections.metabolites.insert(chosen, coefficient);
                }

                let outcome = self.gene_rule(source, old_rs, &reaction_id, diagnostics);
                connections.gene_reaction_rule = outcome.rule;
                connections.mixed_rules = outcome.mixed;
                let converted = self.mapper.has_translation_table(source);
                for gene_id in &outcome.genes_to_add {
                    let found = genes
                        .find(bucket, gene_id, converted)
                        .or_else(|| genes.find(Bucket::Assembly, gene_id, converted));
                    if let Some(gene) = found {
                        push_unique(&mut connections.genes, gene);
                    }
                }
                resolved.push((source, connections));
            }

            let reaction = reactions.get_mut(handle);
            for (source, c) in resolved {
                reaction.reactants[source] = c.reactants;
                reaction.products[source] = c.products;
                reaction.metabolites[source] = c.metabolites;
                reaction.gene_reaction_rule[source] = c.gene_reaction_rule;
                reaction.mixed_gene_reaction_rule[source] = c.mixed_rules;
                reaction.genes[source] = c.genes;
            }
        }
    }

    /// Several old reactions of one source behind one merged reaction are
    /// expected to share participants; the first one is the template.
    fn check_instances(&self, source: SourceId, reaction_id: &str, old_rs: &[&OldReaction], diagnostics: &mut Diagnostics) {
        let Some((template, rest)) = old_rs.split_first() else {
            return;
        };
        for other in rest {
            let same = other.metabolites.len() == template.metabolites.len()
                && other.metabolites.keys().all(|m| template.metabolites.contains_key(m));
            if !same {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::DivergentReactionInstances,
                        reaction_id,
                        format!(
                            "{} and {} differ in participants; {} is used",
                            template.id, other.id, template.id
                        ),
                    )
                    .with_source(self.sources.name(source)),
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn pick_metabolite(
        &self,
        source: SourceId,
        old_reaction: &str,
        old_met: &str,
        candidates: &[MetaboliteHandle],
        metabolites: &Registry<MergedMetabolite>,
        reaction_id: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<MetaboliteHandle> {
        match candidates {
            [] => None,
            [only] => Some(*only),
            _ if self.mapper.is_periplasmic_source(source) => {
                let want_periplasmic = self.mapper.is_periplasmic_reaction(source, old_reaction)
                    && self.mapper.was_split_for(source, old_reaction, old_met);
                let accepted: Vec<MetaboliteHandle> = candidates
                    .iter()
                    .copied()
                    .filter(|&c| metabolites.get(c).core.is_periplasmic() == want_periplasmic)
                    .collect();
                if accepted.len() > 1 {
                    let ids: Vec<&str> = accepted.iter().map(|&c| metabolites.get(c).core.id.as_str()).collect();
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::AmbiguousPeriplasmicAssignment,
                            reaction_id,
                            format!("{old_met} matches {}; {} is kept", ids.join(" "), ids[0]),
                        )
                        .with_source(self.sources.name(source)),
                    );
                }
                accepted.first().copied()
            }
            [first, ..] => {
                let ids: Vec<&str> = candidates.iter().map(|&c| metabolites.get(c).core.id.as_str()).collect();
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::AmbiguousMapping,
                        reaction_id,
                        format!("{old_met} maps to {} without periplasmic context; {} is kept", ids.join(" "), ids[0]),
                    )
                    .with_source(self.sources.name(source)),
                );
                Some(*first)
            }
        }
    }

    /// Translates and unites the gene rules of every old instance.
    fn gene_rule(
        &self,
        source: SourceId,
        old_rs: &[&OldReaction],
        reaction_id: &str,
        diagnostics: &mut Diagnostics,
    ) -> GeneRuleOutcome {
        let mut outcome = GeneRuleOutcome::default();
        let mut rules = Vec::new();
        for old in old_rs {
            if old.genes.is_empty() {
                continue;
            }
            let mut substitution = IndexMap::new();
            for old_gene in &old.genes {
                let new_id = self.mapper.get_new_gene_id(source, old_gene);
                if new_id != NOT_FOUND && !outcome.genes_to_add.iter().any(|g| g == new_id) {
                    outcome.genes_to_add.push(new_id.to_string());
                }
                substitution.insert(old_gene.clone(), new_id.to_string());
            }
            match rewrite_rule(&old.gene_reaction_rule, &substitution) {
                Ok((rule, mixed)) => {
                    if let Some(rule) = rule {
                        rules.push(rule);
                    }
                    outcome.mixed.push(mixed);
                }
                Err(e) => diagnostics.push(
                    Diagnostic::new(DiagnosticKind::MalformedGeneRule, reaction_id, format!("{}: {e}", old.id))
                        .with_source(self.sources.name(source)),
                ),
            }
        }
        outcome.rule = match rules.len() {
            0 => None,
            1 => rules.pop(),
            _ => match union_rules(&rules) {
                Ok(rule) => rule,
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::new(DiagnosticKind::MalformedGeneRule, reaction_id, e.to_string())
                            .with_source(self.sources.name(source)),
                    );
                    None
                }
            },
        };
        outcome
    }

    /// Links merged genes to the merged reactions of their old genes.
    pub fn gene_reactions(&self, genes: &mut Registry<MergedGene>, bucket: Bucket) {
        let unresolved = bucket.is_unresolved();
        let handles: Vec<GeneHandle> = genes.handles(bucket).collect();
        for handle in handles {
            let gene = genes.get(handle);
            let mut found: Vec<(SourceId, Vec<ReactionHandle>)> = Vec::new();
            for &source in &gene.core.in_models.models_list {
                let model = &self.models[source.index()];
                let mut linked = Vec::new();
                for old_gene in &gene.core.annotation[source] {
                    for reaction_id in model.reactions_of_gene(old_gene) {
                        for &new_reaction in self.mapper.get_new_rs(source, reaction_id, unresolved) {
                            push_unique(&mut linked, new_reaction);
                        }
                    }
                }
                found.push((source, linked));
            }
            let gene = genes.get_mut(handle);
            for (source, linked) in found {
                gene.reactions[source] = linked;
            }
        }
    }

    /// Formula of metabolites; bounds and subsystem of reactions.
    ///
    /// Bounds over several old instances give the widest envelope, never
    /// narrower than zero on either side.
    pub fn additional_attributes(
        &self,
        metabolites: &mut Registry<MergedMetabolite>,
        reactions: &mut Registry<MergedReaction>,
        bucket: Bucket,
    ) {
        let unresolved = bucket.is_unresolved();
        let handles: Vec<MetaboliteHandle> = metabolites.handles(bucket).collect();
        for handle in handles {
            let sources = metabolites.get(handle).core.in_models.models_list.clone();
            for source in sources {
                let formula = self
                    .mapper
                    .get_old_mets(source, handle, unresolved)
                    .first()
                    .and_then(|old| old.formula.clone());
                if let Some(formula) = formula {
                    metabolites.get_mut(handle).formula[source].push(formula);
                }
            }
        }

        let handles: Vec<ReactionHandle> = reactions.handles(bucket).collect();
        for handle in handles {
            let sources = reactions.get(handle).core.in_models.models_list.clone();
            for source in sources {
                let old_rs = self.mapper.get_old_rs(source, handle, unresolved);
                if old_rs.is_empty() {
                    continue;
                }
                let lower = old_rs.iter().fold(0.0_f64, |acc, r| acc.min(r.lower_bound));
                let upper = old_rs.iter().fold(0.0_f64, |acc, r| acc.max(r.upper_bound));
                let subsystem = old_rs
                    .iter()
                    .map(|r| r.subsystem.as_deref().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(SUBSYSTEM_SEPARATOR);

                let reaction = reactions.get_mut(handle);
                reaction.lower_bound[source] = Some(lower);
                reaction.upper_bound[source] = Some(upper);
                reaction.subsystem[source] = Some(subsystem);
            }
        }
    }
}
