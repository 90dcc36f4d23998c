//! The assembled model and the builder that produces it.

use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::aggregate::{gene_contributions, selection_contributions, Aggregate, Aggregator};
use crate::comparison::ComparisonSet;
use crate::config::AssemblyConfig;
use crate::consensus::{core_coefficients, core_connections, core_gene_rule, core_lower_bound, core_upper_bound, Threshold};
use crate::diagnostics::Diagnostics;
use crate::direction::DirectionReconciler;
use crate::entity::{
    Bucket, GeneHandle, MergedGene, MergedMetabolite, MergedReaction, MetaboliteHandle, ReactionHandle, Registry,
};
use crate::error::{AssemblyResult, OutputError, ValidationError};
use crate::mapper::{IdentityMapper, MapperInputs};
use crate::reference::ReferenceTable;
use crate::resolve::{ConnectionResolver, SUBSYSTEM_SEPARATOR};
use crate::selection::{PeriplasmicSplits, SelectionSet};
use crate::source::{SourceId, SourceRegistry};
use crate::source_model::SourceModel;
use crate::storage;
use crate::translation::{GeneTranslationTable, GeneTranslations};

/// Merged metabolites, reactions and genes of several sources, with a
/// per-source view and an `assembly` consensus view of every attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperModel {
    /// Sources in merge order.
    pub sources: SourceRegistry,
    /// Merged metabolites.
    pub metabolites: Registry<MergedMetabolite>,
    /// Merged reactions.
    pub reactions: Registry<MergedReaction>,
    /// Merged genes.
    pub genes: Registry<MergedGene>,
    /// Stored comparison results by label, in creation order.
    pub comparisons: IndexMap<String, ComparisonSet>,
    /// Configuration the model was assembled with.
    pub config: AssemblyConfig,
    /// When the assembly finished.
    pub assembled_at: DateTime<Utc>,
}

/// Result of [`AssemblyBuilder::build`].
#[derive(Debug, Clone)]
pub struct Assembly {
    pub model: SuperModel,
    /// Data inconsistencies found during the run.
    pub diagnostics: Diagnostics,
}

impl SuperModel {
    /// Starts an assembly run.
    ///
    /// # Example
    /// ```
    /// use supermodel::{AssemblyConfig, OldReaction, SelectionSet, SourceModel, SuperModel};
    ///
    /// let mut a = SourceModel::new("a");
    /// a.add_reaction(OldReaction::new("PGI").with_metabolite("g6p_c", -1.0).with_metabolite("f6p_c", 1.0));
    /// let mut b = SourceModel::new("b");
    /// b.add_reaction(OldReaction::new("pgi").with_metabolite("glc6p", -1.0).with_metabolite("fru6p", 1.0));
    ///
    /// let metabolites = SelectionSet::new()
    ///     .with("a", "g6p_c", "g6p_c", &["c"])
    ///     .with("a", "f6p_c", "f6p_c", &["c"])
    ///     .with("b", "glc6p", "g6p_c", &["c"])
    ///     .with("b", "fru6p", "f6p_c", &["c"]);
    /// let reactions = SelectionSet::new()
    ///     .with("a", "PGI", "PGI", &["c"])
    ///     .with("b", "pgi", "PGI", &["c"]);
    ///
    /// let assembly = SuperModel::builder(AssemblyConfig::default())
    ///     .source(a)
    ///     .source(b)
    ///     .selected_metabolites(metabolites)
    ///     .selected_reactions(reactions)
    ///     .build()
    ///     .unwrap();
    /// let pgi = assembly.model.reaction("PGI").unwrap();
    /// assert_eq!(pgi.core.in_models.models_amount, 2);
    /// ```
    #[must_use]
    pub fn builder(config: AssemblyConfig) -> AssemblyBuilder {
        AssemblyBuilder::new(config)
    }

    /// Merged metabolite of the assembly bucket.
    #[must_use]
    pub fn metabolite(&self, id: &str) -> Option<&MergedMetabolite> {
        self.metabolites.by_id(Bucket::Assembly, id)
    }

    /// Merged reaction of the assembly bucket.
    #[must_use]
    pub fn reaction(&self, id: &str) -> Option<&MergedReaction> {
        self.reactions.by_id(Bucket::Assembly, id)
    }

    /// Merged gene of the assembly bucket.
    #[must_use]
    pub fn gene(&self, id: &str) -> Option<&MergedGene> {
        self.genes.by_id(Bucket::Assembly, id)
    }

    /// Looks up a source by name.
    #[must_use]
    pub fn source_id(&self, name: &str) -> Option<SourceId> {
        self.sources.id(name)
    }

    /// Writes the model to a new `.supermodel` file.
    ///
    /// # Errors
    /// Wrong extension, an existing destination, encoding or I/O failure.
    /// Nothing is written on failure.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), OutputError> {
        storage::write_new(path.as_ref(), self)
    }

    /// Reads a model written by [`SuperModel::write_to_path`].
    ///
    /// # Errors
    /// Wrong extension, I/O failure, or a corrupted file.
    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self, OutputError> {
        storage::read(path.as_ref())
    }
}

/// Builder for one assembly run.
///
/// Sources are registered in the order they are added; that order is the
/// merge order and the order of every per-source view.
#[derive(Debug, Clone, Default)]
pub struct AssemblyBuilder {
    config: AssemblyConfig,
    models: Vec<SourceModel>,
    selected_metabolites: SelectionSet,
    unselected_metabolites: SelectionSet,
    selected_reactions: SelectionSet,
    unselected_reactions: SelectionSet,
    periplasmic_metabolites: SelectionSet,
    periplasmic_splits: PeriplasmicSplits,
    metabolite_reference: ReferenceTable,
    reaction_reference: ReferenceTable,
    gene_tables: Vec<(String, GeneTranslationTable)>,
}

impl AssemblyBuilder {
    /// Creates a builder with no sources.
    #[must_use]
    pub fn new(config: AssemblyConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Adds one source model.
    #[must_use]
    pub fn source(mut self, model: SourceModel) -> Self {
        self.models.push(model);
        self
    }

    /// Adds several source models in order.
    #[must_use]
    pub fn sources(mut self, models: impl IntoIterator<Item = SourceModel>) -> Self {
        self.models.extend(models);
        self
    }

    /// Metabolites resolved against the reference vocabulary.
    #[must_use]
    pub fn selected_metabolites(mut self, selections: SelectionSet) -> Self {
        self.selected_metabolites = selections;
        self
    }

    /// Metabolites kept under their original ids.
    #[must_use]
    pub fn unselected_metabolites(mut self, selections: SelectionSet) -> Self {
        self.unselected_metabolites = selections;
        self
    }

    /// Reactions resolved against the reference vocabulary.
    #[must_use]
    pub fn selected_reactions(mut self, selections: SelectionSet) -> Self {
        self.selected_reactions = selections;
        self
    }

    /// Reactions kept under their original ids.
    #[must_use]
    pub fn unselected_reactions(mut self, selections: SelectionSet) -> Self {
        self.unselected_reactions = selections;
        self
    }

    /// Periplasmic duplicates of metabolites, keyed by their per-source old ids.
    #[must_use]
    pub fn periplasmic_metabolites(mut self, selections: SelectionSet) -> Self {
        self.periplasmic_metabolites = selections;
        self
    }

    /// Reactions whose metabolites were split across the periplasm boundary.
    #[must_use]
    pub fn periplasmic_splits(mut self, splits: PeriplasmicSplits) -> Self {
        self.periplasmic_splits = splits;
        self
    }

    /// Reference names and formulas of metabolites.
    #[must_use]
    pub fn metabolite_reference(mut self, table: ReferenceTable) -> Self {
        self.metabolite_reference = table;
        self
    }

    /// Reference names and equations of reactions.
    #[must_use]
    pub fn reaction_reference(mut self, table: ReferenceTable) -> Self {
        self.reaction_reference = table;
        self
    }

    /// Gene translation table of one source. Overrides the table loaded
    /// from the configured gene folder, if any.
    #[must_use]
    pub fn gene_table(mut self, source: impl Into<String>, table: GeneTranslationTable) -> Self {
        self.gene_tables.push((source.into(), table));
        self
    }

    fn translations(
        &mut self,
        sources: &SourceRegistry,
        diagnostics: &mut Diagnostics,
    ) -> AssemblyResult<GeneTranslations> {
        let mut translations = match &self.config.gene_folder {
            Some(folder) => GeneTranslations::load(folder, sources, diagnostics)?,
            None => GeneTranslations::disabled(sources.len()),
        };
        for (name, table) in self.gene_tables.drain(..) {
            let source = sources
                .id(&name)
                .ok_or_else(|| ValidationError::UnknownSources { names: vec![name.clone()] })?;
            translations.set(source, table);
        }
        Ok(translations)
    }

    /// Runs aggregation, mapping, resolution, direction reconciliation and
    /// consensus.
    ///
    /// # Errors
    /// Invalid inputs, an unreadable translation table, or any data
    /// inconsistency in strict mode.
    pub fn build(mut self) -> AssemblyResult<Assembly> {
        let sources = SourceRegistry::new(self.models.iter().map(|m| m.id.clone()))?;
        let mix = self.config.mix_unconverted;
        let unresolved_bucket = if mix { Bucket::Assembly } else { Bucket::NotConverted };
        let mut diagnostics = Diagnostics::new();
        tracing::info!(sources = sources.len(), mix_unconverted = mix, "assembly started");

        let translations = self.translations(&sources, &mut diagnostics)?;

        let metabolite_contributions = [
            selection_contributions(&sources, &self.selected_metabolites, Bucket::Assembly, true)?,
            selection_contributions(&sources, &self.periplasmic_metabolites, Bucket::Assembly, true)?,
            selection_contributions(&sources, &self.unselected_metabolites, unresolved_bucket, false)?,
        ];
        let Aggregate {
            registry: mut metabolites,
            placements: metabolite_placements,
            diagnostics: metabolite_diagnostics,
        } = Aggregator::new(&sources, &self.metabolite_reference)
            .fold_into(Aggregate::<MergedMetabolite>::new(sources.len()), metabolite_contributions.into_iter().flatten());

        let reaction_contributions = [
            selection_contributions(&sources, &self.selected_reactions, Bucket::Assembly, true)?,
            selection_contributions(&sources, &self.unselected_reactions, unresolved_bucket, false)?,
        ];
        let Aggregate {
            registry: mut reactions,
            placements: reaction_placements,
            diagnostics: reaction_diagnostics,
        } = Aggregator::new(&sources, &self.reaction_reference)
            .fold_into(Aggregate::<MergedReaction>::new(sources.len()), reaction_contributions.into_iter().flatten());

        let no_reference = ReferenceTable::new();
        let gene_aggregate: Aggregate<MergedGene> = Aggregator::new(&sources, &no_reference).fold_into(
            Aggregate::new(sources.len()),
            gene_contributions(&self.models, &translations, unresolved_bucket),
        );
        let mut genes = gene_aggregate.registry;

        diagnostics.absorb(metabolite_diagnostics);
        diagnostics.absorb(reaction_diagnostics);
        diagnostics.absorb(gene_aggregate.diagnostics);
        tracing::debug!(
            metabolites = metabolites.len(),
            reactions = reactions.len(),
            genes = genes.len(),
            "aggregation done"
        );

        let mapper = IdentityMapper::build(MapperInputs {
            sources: &sources,
            models: &self.models,
            metabolites: &metabolites,
            metabolite_placements,
            reactions: &reactions,
            reaction_placements,
            additional_metabolites: &self.periplasmic_metabolites,
            splits: &self.periplasmic_splits,
            translations,
        })?;

        let resolver = ConnectionResolver::new(&sources, &self.models, &mapper);
        let buckets: &[Bucket] = if mix {
            &[Bucket::Assembly]
        } else {
            &[Bucket::Assembly, Bucket::NotConverted]
        };
        for &bucket in buckets {
            resolver.resolve_bucket(&mut metabolites, &mut reactions, &mut genes, bucket, &mut diagnostics);
        }

        DirectionReconciler::new(&sources).reconcile_bucket(&mut reactions, Bucket::Assembly, &mut diagnostics);

        let all: Vec<SourceId> = sources.ids().collect();
        for &bucket in buckets {
            assemble_bucket(
                &mut metabolites,
                &mut reactions,
                &mut genes,
                bucket,
                &all,
                self.config.and_as_solid,
            );
        }

        let diagnostics = if self.config.strict {
            diagnostics.into_strict()?
        } else {
            diagnostics
        };
        tracing::info!(
            metabolites = metabolites.bucket_len(Bucket::Assembly),
            reactions = reactions.bucket_len(Bucket::Assembly),
            genes = genes.bucket_len(Bucket::Assembly),
            not_converted = metabolites.bucket_len(Bucket::NotConverted)
                + reactions.bucket_len(Bucket::NotConverted)
                + genes.bucket_len(Bucket::NotConverted),
            diagnostics = diagnostics.len(),
            "assembly finished"
        );

        Ok(Assembly {
            model: SuperModel {
                sources,
                metabolites,
                reactions,
                genes,
                comparisons: IndexMap::new(),
                config: self.config,
                assembled_at: Utc::now(),
            },
            diagnostics,
        })
    }
}

/// Writes the `assembly` slot of every attribute in `bucket`.
///
/// Connections and gene rules look at every source; bounds and
/// coefficients at the sources the reaction came from.
fn assemble_bucket(
    metabolites: &mut Registry<MergedMetabolite>,
    reactions: &mut Registry<MergedReaction>,
    genes: &mut Registry<MergedGene>,
    bucket: Bucket,
    all: &[SourceId],
    and_as_solid: bool,
) {
    let any = Threshold::AtLeast(1);

    let handles: Vec<MetaboliteHandle> = metabolites.handles(bucket).collect();
    for handle in handles {
        let metabolite = metabolites.get_mut(handle);
        metabolite.reactions.assembly = core_connections(&metabolite.reactions, all, any);
        let formulas: IndexSet<String> = all
            .iter()
            .flat_map(|&s| metabolite.formula[s].iter().cloned())
            .collect();
        metabolite.formula.assembly = formulas.into_iter().collect();
    }

    let handles: Vec<ReactionHandle> = reactions.handles(bucket).collect();
    for handle in handles {
        let reaction = reactions.get_mut(handle);
        let members = reaction.core.in_models.models_list.clone();
        reaction.reactants.assembly = core_connections(&reaction.reactants, all, any);
        reaction.products.assembly = core_connections(&reaction.products, all, any);
        reaction.genes.assembly = core_connections(&reaction.genes, all, any);
        reaction.gene_reaction_rule.assembly = core_gene_rule(&reaction.gene_reaction_rule, all, any, and_as_solid);
        reaction.lower_bound.assembly = core_lower_bound(&reaction.lower_bound, &members, 1);
        reaction.upper_bound.assembly = core_upper_bound(&reaction.upper_bound, &members, 1);
        reaction.metabolites.assembly = core_coefficients(
            &reaction.metabolites,
            &reaction.reactants.assembly,
            &reaction.products.assembly,
            &members,
        );
        let subsystems: IndexSet<&str> = members
            .iter()
            .filter_map(|&s| reaction.subsystem[s].as_deref())
            .flat_map(|joined| joined.split(SUBSYSTEM_SEPARATOR))
            .collect();
        reaction.subsystem.assembly =
            (!subsystems.is_empty()).then(|| subsystems.into_iter().collect::<Vec<_>>().join(SUBSYSTEM_SEPARATOR));
        let mixed: IndexSet<String> = members
            .iter()
            .flat_map(|&s| reaction.mixed_gene_reaction_rule[s].iter().cloned())
            .collect();
        reaction.mixed_gene_reaction_rule.assembly = mixed.into_iter().collect();
    }

    let handles: Vec<GeneHandle> = genes.handles(bucket).collect();
    for handle in handles {
        let gene = genes.get_mut(handle);
        gene.reactions.assembly = core_connections(&gene.reactions, all, any);
    }
}
