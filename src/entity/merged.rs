//! Merged entities of the assembly.
//!
//! A merged entity aggregates one or more original entities from one or
//! more sources under a single `id`. Its identity is `(id, converted)`:
//! an entity resolved against the reference vocabulary and one kept under
//! its original identity never share a slot, even with the same id.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::handle::{EntityHandle, GeneHandle, MetaboliteHandle, ReactionHandle};
use crate::reference::{ReferenceRecord, ReferenceTable};
use crate::source::{InModels, PerSource, SourceId};

/// Display name given to entities kept under their original identity.
pub const NOT_CONVERTED_NAME: &str = "Not converted";

/// Provenance shared by every merged entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedCore {
    /// Merged id.
    pub id: String,
    /// Display name from the reference table.
    pub name: String,
    /// Whether the id came from the reference vocabulary.
    pub converted: bool,
    /// Occurrences per source; the assembly slot holds the total.
    pub sources: PerSource<u32>,
    /// Sources the entity appears in.
    pub in_models: InModels,
    /// Original ids per source that collapsed into this entity.
    pub annotation: PerSource<Vec<String>>,
}

impl MergedCore {
    /// Provenance for an entity first seen as `old_id` in `source`.
    #[must_use]
    pub fn first_seen(
        id: impl Into<String>,
        converted: bool,
        source: SourceId,
        old_id: &str,
        source_count: usize,
    ) -> Self {
        let mut sources = PerSource::new(source_count);
        sources[source] = 1;
        sources.assembly = 1;
        let mut annotation: PerSource<Vec<String>> = PerSource::new(source_count);
        annotation[source].push(old_id.to_string());
        Self {
            id: id.into(),
            name: String::new(),
            converted,
            sources,
            in_models: InModels::single(source),
            annotation,
        }
    }

    /// Folds one more occurrence of `old_id` from `source` into this entity.
    pub fn absorb(&mut self, source: SourceId, old_id: &str) {
        self.sources[source] += 1;
        self.sources.assembly += 1;
        self.in_models.record(source);
        self.annotation[source].push(old_id.to_string());
    }

    /// Returns true if the id carries the periplasmic compartment suffix.
    #[must_use]
    pub fn is_periplasmic(&self) -> bool {
        self.id.ends_with("_p")
    }
}

/// Common access to merged entities.
pub trait MergedEntity {
    /// Handle type indexing this entity class.
    type Handle: EntityHandle;

    /// Entity class name used in messages.
    const KIND: &'static str;

    fn core(&self) -> &MergedCore;

    fn core_mut(&mut self) -> &mut MergedCore;
}

/// Entities folded from per-source contributions.
pub trait Element: MergedEntity + Sized {
    /// Whether converted entities take their name from a reference table.
    const USES_REFERENCE: bool = true;

    /// Reference record for a (non-disambiguated) new id.
    fn reference<'a>(table: &'a ReferenceTable, new_id: &str) -> Option<&'a ReferenceRecord>;

    /// Builds the entity from its provenance and reference record.
    fn from_core(core: MergedCore, record: Option<&ReferenceRecord>, compartments: &[String]) -> Self;

    fn compartments_mut(&mut self) -> Option<&mut PerSource<Vec<String>>>;

    /// Appends compartments for `source`; the assembly slot is kept deduplicated.
    fn add_compartments(&mut self, source: SourceId, compartments: &[String]) {
        let Some(table) = self.compartments_mut() else {
            return;
        };
        table[source].extend(compartments.iter().cloned());
        for c in compartments {
            if !table.assembly.contains(c) {
                table.assembly.push(c.clone());
            }
        }
    }
}

fn compartment_table(source: SourceId, compartments: &[String], source_count: usize) -> PerSource<Vec<String>> {
    let mut table: PerSource<Vec<String>> = PerSource::new(source_count);
    table[source] = compartments.to_vec();
    for c in compartments {
        if !table.assembly.contains(c) {
            table.assembly.push(c.clone());
        }
    }
    table
}

/// A merged metabolite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedMetabolite {
    /// Shared provenance.
    pub core: MergedCore,
    /// Compartments per source.
    pub compartments: PerSource<Vec<String>>,
    /// Reactions per source.
    pub reactions: PerSource<Vec<ReactionHandle>>,
    /// Formulas of the original metabolites; the assembly slot holds their deduplicated union.
    pub formula: PerSource<Vec<String>>,
    /// Reaction links per comparison label.
    pub comparison: IndexMap<String, Vec<ReactionHandle>>,
}

impl MergedEntity for MergedMetabolite {
    type Handle = MetaboliteHandle;
    const KIND: &'static str = "metabolite";

    fn core(&self) -> &MergedCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut MergedCore {
        &mut self.core
    }
}

impl Element for MergedMetabolite {
    fn reference<'a>(table: &'a ReferenceTable, new_id: &str) -> Option<&'a ReferenceRecord> {
        table.metabolite(new_id)
    }

    fn from_core(mut core: MergedCore, record: Option<&ReferenceRecord>, compartments: &[String]) -> Self {
        let n = core.sources.source_count();
        let source = core.in_models.models_list[0];
        core.name = if core.converted {
            record.and_then(|r| r.name.clone()).unwrap_or_default()
        } else {
            NOT_CONVERTED_NAME.to_string()
        };
        Self {
            core,
            compartments: compartment_table(source, compartments, n),
            reactions: PerSource::new(n),
            formula: PerSource::new(n),
            comparison: IndexMap::new(),
        }
    }

    fn compartments_mut(&mut self) -> Option<&mut PerSource<Vec<String>>> {
        Some(&mut self.compartments)
    }
}

/// Consensus view of a reaction under one comparison label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReactionView {
    /// Consensus reactants.
    pub reactants: Vec<MetaboliteHandle>,
    /// Consensus products.
    pub products: Vec<MetaboliteHandle>,
    /// Consensus coefficient per participant.
    pub metabolites: IndexMap<MetaboliteHandle, f64>,
    /// Consensus genes.
    pub genes: Vec<GeneHandle>,
    /// Consensus gene rule.
    pub gene_reaction_rule: Option<String>,
    /// Consensus lower bound.
    pub lower_bound: Option<f64>,
    /// Consensus upper bound.
    pub upper_bound: Option<f64>,
}

/// A merged reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedReaction {
    /// Shared provenance.
    pub core: MergedCore,
    /// Equation string from the reference table.
    pub equation: Option<String>,
    /// Compartments per source.
    pub compartments: PerSource<Vec<String>>,
    /// Reactants per source.
    pub reactants: PerSource<Vec<MetaboliteHandle>>,
    /// Products per source.
    pub products: PerSource<Vec<MetaboliteHandle>>,
    /// Stoichiometric coefficient per participant.
    pub metabolites: PerSource<IndexMap<MetaboliteHandle, f64>>,
    /// Lower bound per source.
    pub lower_bound: PerSource<Option<f64>>,
    /// Upper bound per source.
    pub upper_bound: PerSource<Option<f64>>,
    /// Subsystems per source; the assembly slot joins the distinct ones.
    pub subsystem: PerSource<Option<String>>,
    /// Linked genes per source.
    pub genes: PerSource<Vec<GeneHandle>>,
    /// Translated gene rule per source.
    pub gene_reaction_rule: PerSource<Option<String>>,
    /// Rules before gene translation, untranslated genes marked; the assembly slot holds their deduplicated union.
    pub mixed_gene_reaction_rule: PerSource<Vec<String>>,
    /// Consensus views per comparison label.
    pub comparison: IndexMap<String, ReactionView>,
}

impl MergedEntity for MergedReaction {
    type Handle = ReactionHandle;
    const KIND: &'static str = "reaction";

    fn core(&self) -> &MergedCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut MergedCore {
        &mut self.core
    }
}

impl Element for MergedReaction {
    fn reference<'a>(table: &'a ReferenceTable, new_id: &str) -> Option<&'a ReferenceRecord> {
        table.reaction(new_id)
    }

    fn from_core(mut core: MergedCore, record: Option<&ReferenceRecord>, compartments: &[String]) -> Self {
        let n = core.sources.source_count();
        let source = core.in_models.models_list[0];
        let equation = if core.converted {
            core.name = record.and_then(|r| r.name.clone()).unwrap_or_default();
            record.and_then(|r| r.formula.clone())
        } else {
            core.name = NOT_CONVERTED_NAME.to_string();
            None
        };
        Self {
            core,
            equation,
            compartments: compartment_table(source, compartments, n),
            reactants: PerSource::new(n),
            products: PerSource::new(n),
            metabolites: PerSource::new(n),
            lower_bound: PerSource::new(n),
            upper_bound: PerSource::new(n),
            subsystem: PerSource::new(n),
            genes: PerSource::new(n),
            gene_reaction_rule: PerSource::new(n),
            mixed_gene_reaction_rule: PerSource::new(n),
            comparison: IndexMap::new(),
        }
    }

    fn compartments_mut(&mut self) -> Option<&mut PerSource<Vec<String>>> {
        Some(&mut self.compartments)
    }
}

impl MergedReaction {
    /// Flips the orientation recorded for `source`.
    ///
    /// Reactants and products are exchanged, the bounds become
    /// `(-upper, -lower)` and every coefficient is negated, so bound sign
    /// and stoichiometric sign stay consistent. Applying it twice restores
    /// the original state.
    pub fn swap_orientation(&mut self, source: SourceId) {
        std::mem::swap(&mut self.reactants[source], &mut self.products[source]);
        let lower = self.lower_bound[source];
        let upper = self.upper_bound[source];
        self.lower_bound[source] = upper.map(|u| -u);
        self.upper_bound[source] = lower.map(|l| -l);
        for coefficient in self.metabolites[source].values_mut() {
            *coefficient = -*coefficient;
        }
    }
}

/// A merged gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedGene {
    /// Shared provenance.
    pub core: MergedCore,
    /// Linked reactions per source.
    pub reactions: PerSource<Vec<ReactionHandle>>,
    /// Reaction links per comparison label.
    pub comparison: IndexMap<String, Vec<ReactionHandle>>,
}

impl MergedGene {
    /// Gene with empty reaction links.
    #[must_use]
    pub fn new(core: MergedCore) -> Self {
        let n = core.sources.source_count();
        Self {
            core,
            reactions: PerSource::new(n),
            comparison: IndexMap::new(),
        }
    }
}

impl MergedEntity for MergedGene {
    type Handle = GeneHandle;
    const KIND: &'static str = "gene";

    fn core(&self) -> &MergedCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut MergedCore {
        &mut self.core
    }
}

impl Element for MergedGene {
    const USES_REFERENCE: bool = false;

    fn reference<'a>(_table: &'a ReferenceTable, _new_id: &str) -> Option<&'a ReferenceRecord> {
        None
    }

    fn from_core(core: MergedCore, _record: Option<&ReferenceRecord>, _compartments: &[String]) -> Self {
        Self::new(core)
    }

    fn compartments_mut(&mut self) -> Option<&mut PerSource<Vec<String>>> {
        None
    }
}
