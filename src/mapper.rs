//! Old-id ↔ new-entity translation tables.
//!
//! The mapper is built once, after aggregation, and is read-only
//! afterwards. Old→new tables come from the placements recorded while
//! folding; new→old tables come from each entity's annotation, resolved
//! against the source models. Lookups never fail: a missing key is an
//! empty result.

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::aggregate::Placements;
use crate::entity::{
    Bucket, EntityHandle, MergedEntity, MergedMetabolite, MergedReaction, MetaboliteHandle, ReactionHandle,
    Registry,
};
use crate::error::ValidationError;
use crate::selection::{PeriplasmicSplits, SelectionSet};
use crate::source::{SourceId, SourceRegistry};
use crate::source_model::{OldMetabolite, OldReaction, SourceModel};
use crate::translation::GeneTranslations;

/// Entity → per-source original objects.
struct ReverseTable<'m, H, O> {
    by_entity: HashMap<H, Vec<Vec<&'m O>>>,
}

impl<'m, H: EntityHandle, O> ReverseTable<'m, H, O> {
    fn build<E, F>(
        registry: &Registry<E>,
        bucket: Bucket,
        sources: &SourceRegistry,
        models: &'m [SourceModel],
        lookup: F,
    ) -> Result<Self, ValidationError>
    where
        E: MergedEntity<Handle = H>,
        F: Fn(&'m SourceModel, &str) -> Option<&'m O>,
    {
        let mut by_entity = HashMap::new();
        for (handle, entity) in registry.iter(bucket) {
            let core = entity.core();
            let mut per_source: Vec<Vec<&'m O>> = (0..sources.len()).map(|_| Vec::new()).collect();
            for &source in &core.in_models.models_list {
                let model = &models[source.index()];
                for old_id in &core.annotation[source] {
                    let old = lookup(model, old_id).ok_or_else(|| ValidationError::UnknownOldId {
                        source_name: sources.name(source).to_string(),
                        kind: E::KIND,
                        id: old_id.clone(),
                    })?;
                    per_source[source.index()].push(old);
                }
            }
            by_entity.insert(handle, per_source);
        }
        Ok(Self { by_entity })
    }

    fn get(&self, source: SourceId, handle: H) -> &[&'m O] {
        self.by_entity
            .get(&handle)
            .and_then(|per_source| per_source.get(source.index()))
            .map_or(&[], Vec::as_slice)
    }
}

/// Resolved and unresolved tables of one entity class.
struct ClassTables<'m, H, O> {
    placements: Placements<H>,
    resolved: ReverseTable<'m, H, O>,
    unresolved: ReverseTable<'m, H, O>,
}

impl<'m, H: EntityHandle, O> ClassTables<'m, H, O> {
    fn new_ids(&self, source: SourceId, old_id: &str, unresolved: bool) -> &[H] {
        let bucket = if unresolved { Bucket::NotConverted } else { Bucket::Assembly };
        self.placements.get(bucket, source, old_id)
    }

    fn old_objects(&self, source: SourceId, handle: H, unresolved: bool) -> &[&'m O] {
        if unresolved {
            self.unresolved.get(source, handle)
        } else {
            self.resolved.get(source, handle)
        }
    }
}

/// Periplasmic bookkeeping of one source.
#[derive(Debug, Default)]
struct PeriplasmicInfo {
    split_source: bool,
    metabolites: Vec<String>,
    by_reaction: HashMap<String, IndexSet<String>>,
}

/// Inputs for [`IdentityMapper::build`].
pub struct MapperInputs<'a, 'm> {
    /// Run sources.
    pub sources: &'a SourceRegistry,
    pub models: &'m [SourceModel],
    /// Merged metabolites.
    pub metabolites: &'a Registry<MergedMetabolite>,
    /// Where each old metabolite landed.
    pub metabolite_placements: Placements<MetaboliteHandle>,
    /// Merged reactions.
    pub reactions: &'a Registry<MergedReaction>,
    /// Where each old reaction landed.
    pub reaction_placements: Placements<ReactionHandle>,
    /// Periplasmic duplicates of metabolites.
    pub additional_metabolites: &'a SelectionSet,
    /// Reactions split across the periplasm.
    pub splits: &'a PeriplasmicSplits,
    /// Gene translation tables.
    pub translations: GeneTranslations,
}

/// Serves old↔new translation for metabolites, reactions, and genes.
pub struct IdentityMapper<'m> {
    metabolites: ClassTables<'m, MetaboliteHandle, OldMetabolite>,
    reactions: ClassTables<'m, ReactionHandle, OldReaction>,
    periplasmic: Vec<PeriplasmicInfo>,
    translations: GeneTranslations,
}

impl<'m> IdentityMapper<'m> {
    /// Builds every table.
    ///
    /// # Errors
    /// Fails if an annotation names an old id its source model does not
    /// contain, or periplasmic inputs name an unregistered source.
    pub fn build(inputs: MapperInputs<'_, 'm>) -> Result<Self, ValidationError> {
        let MapperInputs {
            sources,
            models,
            metabolites,
            metabolite_placements,
            reactions,
            reaction_placements,
            additional_metabolites,
            splits,
            translations,
        } = inputs;

        let metabolites = ClassTables {
            placements: metabolite_placements,
            resolved: ReverseTable::build(metabolites, Bucket::Assembly, sources, models, SourceModel::metabolite)?,
            unresolved: ReverseTable::build(metabolites, Bucket::NotConverted, sources, models, SourceModel::metabolite)?,
        };
        let reactions = ClassTables {
            placements: reaction_placements,
            resolved: ReverseTable::build(reactions, Bucket::Assembly, sources, models, SourceModel::reaction)?,
            unresolved: ReverseTable::build(reactions, Bucket::NotConverted, sources, models, SourceModel::reaction)?,
        };

        let named: Vec<&str> = splits.sources().chain(additional_metabolites.sources()).collect();
        sources.resolve_all(&named)?;

        let mut periplasmic: Vec<PeriplasmicInfo> = (0..sources.len()).map(|_| PeriplasmicInfo::default()).collect();
        for (source, name) in sources.iter() {
            let info = &mut periplasmic[source.index()];
            if let Some(additional) = additional_metabolites.source(name) {
                info.metabolites = additional.keys().cloned().collect();
            }
            if let Some(split) = splits.source(name) {
                info.split_source = true;
                info.by_reaction = split.iter().map(|(r, mets)| (r.clone(), mets.clone())).collect();
            }
        }

        Ok(Self {
            metabolites,
            reactions,
            periplasmic,
            translations,
        })
    }

    /// Original metabolites of `source` behind a merged metabolite.
    #[must_use]
    pub fn get_old_mets(&self, source: SourceId, handle: MetaboliteHandle, unresolved: bool) -> &[&'m OldMetabolite] {
        self.metabolites.old_objects(source, handle, unresolved)
    }

    /// Merged metabolites an old metabolite of `source` maps to.
    #[must_use]
    pub fn get_new_mets(&self, source: SourceId, old_id: &str, unresolved: bool) -> &[MetaboliteHandle] {
        self.metabolites.new_ids(source, old_id, unresolved)
    }

    /// Original reactions of `source` behind a merged reaction.
    #[must_use]
    pub fn get_old_rs(&self, source: SourceId, handle: ReactionHandle, unresolved: bool) -> &[&'m OldReaction] {
        self.reactions.old_objects(source, handle, unresolved)
    }

    /// Merged reactions an old reaction of `source` maps to.
    #[must_use]
    pub fn get_new_rs(&self, source: SourceId, old_id: &str, unresolved: bool) -> &[ReactionHandle] {
        self.reactions.new_ids(source, old_id, unresolved)
    }

    /// Returns true if `source` split reactions across the periplasm.
    #[must_use]
    pub fn is_periplasmic_source(&self, source: SourceId) -> bool {
        self.periplasmic.get(source.index()).is_some_and(|p| p.split_source)
    }

    /// Old ids of metabolites that gained a periplasmic duplicate.
    #[must_use]
    pub fn periplasmic_metabolites(&self, source: SourceId) -> &[String] {
        self.periplasmic
            .get(source.index())
            .map_or(&[], |p| p.metabolites.as_slice())
    }

    /// Returns true if `reaction` is one of the split reactions of `source`.
    #[must_use]
    pub fn is_periplasmic_reaction(&self, source: SourceId, reaction: &str) -> bool {
        self.periplasmic
            .get(source.index())
            .is_some_and(|p| p.by_reaction.contains_key(reaction))
    }

    /// Returns true if `metabolite` was replaced by its periplasmic duplicate in `reaction`.
    #[must_use]
    pub fn was_split_for(&self, source: SourceId, reaction: &str, metabolite: &str) -> bool {
        self.periplasmic
            .get(source.index())
            .and_then(|p| p.by_reaction.get(reaction))
            .is_some_and(|mets| mets.contains(metabolite))
    }

    /// Canonical gene id; see [`GeneTranslations::new_gene_id`].
    #[must_use]
    pub fn get_new_gene_id<'s>(&'s self, source: SourceId, old_id: &'s str) -> &'s str {
        self.translations.new_gene_id(source, old_id)
    }

    /// Returns true if `source` has a gene translation table.
    #[must_use]
    pub fn has_translation_table(&self, source: SourceId) -> bool {
        self.translations.table(source).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{selection_contributions, Aggregate, Aggregator};
    use crate::reference::ReferenceTable;
    use crate::source_model::OldReaction;
    use crate::translation::{GeneTranslationTable, NOT_FOUND};

    struct Fixture {
        sources: SourceRegistry,
        models: Vec<SourceModel>,
        metabolites: Aggregate<MergedMetabolite>,
        reactions: Aggregate<MergedReaction>,
        additional: SelectionSet,
        splits: PeriplasmicSplits,
    }

    fn fixture() -> Fixture {
        let sources = SourceRegistry::new(["m1", "m2"]).unwrap();
        let mut m1 = SourceModel::new("m1");
        m1.add_reaction(OldReaction::new("GLCt").with_metabolite("glc_e", -1.0).with_metabolite("glc_c", 1.0));
        let mut m2 = SourceModel::new("m2");
        m2.add_reaction(OldReaction::new("R_GLCt").with_metabolite("GLC_e", -1.0).with_metabolite("GLC_c", 1.0));

        let met_sel = SelectionSet::new()
            .with("m1", "glc_e", "glc__D_e", &["e"])
            .with("m1", "glc_c", "glc__D_c", &["c"])
            .with("m2", "GLC_e", "glc__D_e", &["e"]);
        let met_not_sel = SelectionSet::new().with("m2", "GLC_c", "GLC_c", &["c"]);
        let additional = SelectionSet::new().with("m1", "glc_e", "glc__D_p", &["p"]);
        let rxn_sel = SelectionSet::new()
            .with("m1", "GLCt", "GLCtex", &["e", "c"])
            .with("m2", "R_GLCt", "GLCtex", &["e", "c"]);
        let splits = PeriplasmicSplits::new().with("m1", "GLCt", &["glc_e"]);

        let reference = ReferenceTable::new();
        let aggregator = Aggregator::new(&sources, &reference);
        let mut contributions = selection_contributions(&sources, &met_sel, Bucket::Assembly, true).unwrap();
        contributions.extend(selection_contributions(&sources, &additional, Bucket::Assembly, true).unwrap());
        contributions.extend(selection_contributions(&sources, &met_not_sel, Bucket::NotConverted, false).unwrap());
        let metabolites = aggregator.fold_into(Aggregate::new(2), contributions);
        let reactions = aggregator.fold_into(
            Aggregate::new(2),
            selection_contributions(&sources, &rxn_sel, Bucket::Assembly, true).unwrap(),
        );

        Fixture {
            sources,
            models: vec![m1, m2],
            metabolites,
            reactions,
            additional,
            splits,
        }
    }

    fn mapper(f: &Fixture, translations: GeneTranslations) -> IdentityMapper<'_> {
        IdentityMapper::build(MapperInputs {
            sources: &f.sources,
            models: &f.models,
            metabolites: &f.metabolites.registry,
            metabolite_placements: f.metabolites.placements.clone(),
            reactions: &f.reactions.registry,
            reaction_placements: f.reactions.placements.clone(),
            additional_metabolites: &f.additional,
            splits: &f.splits,
            translations,
        })
        .unwrap()
    }

    #[test]
    fn test_old_id_round_trips_through_annotation() {
        let f = fixture();
        let mapper = mapper(&f, GeneTranslations::disabled(2));
        let m2 = f.sources.id("m2").unwrap();

        let new = mapper.get_new_mets(m2, "GLC_e", false);
        assert_eq!(new.len(), 1);
        let old = mapper.get_old_mets(m2, new[0], false);
        assert_eq!(old.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["GLC_e"]);
    }

    #[test]
    fn test_periplasmic_metabolite_maps_to_both_duplicates() {
        let f = fixture();
        let mapper = mapper(&f, GeneTranslations::disabled(2));
        let m1 = f.sources.id("m1").unwrap();
        let new = mapper.get_new_mets(m1, "glc_e", false);
        let ids: Vec<&str> = new
            .iter()
            .map(|&h| f.metabolites.registry.get(h).core.id.as_str())
            .collect();
        assert_eq!(ids, vec!["glc__D_e", "glc__D_p"]);
        assert_eq!(mapper.periplasmic_metabolites(m1), ["glc_e".to_string()]);
        assert!(mapper.is_periplasmic_source(m1));
        assert!(mapper.was_split_for(m1, "GLCt", "glc_e"));
        assert!(!mapper.was_split_for(m1, "GLCt", "glc_c"));
    }

    #[test]
    fn test_unresolved_tables_are_separate() {
        let f = fixture();
        let mapper = mapper(&f, GeneTranslations::disabled(2));
        let m2 = f.sources.id("m2").unwrap();
        assert!(mapper.get_new_mets(m2, "GLC_c", false).is_empty());
        assert_eq!(mapper.get_new_mets(m2, "GLC_c", true).len(), 1);
        assert!(mapper.get_new_rs(m2, "unknown", false).is_empty());
    }

    #[test]
    fn test_gene_ids_pass_through_translation() {
        let f = fixture();
        let mut translations = GeneTranslations::disabled(2);
        translations.set(f.sources.id("m1").unwrap(), GeneTranslationTable::new().with_row("g0", Some("b0001")));
        let mapper = mapper(&f, translations);
        let m1 = f.sources.id("m1").unwrap();
        let m2 = f.sources.id("m2").unwrap();
        assert_eq!(mapper.get_new_gene_id(m1, "g0"), "b0001");
        assert_eq!(mapper.get_new_gene_id(m1, "g1"), NOT_FOUND);
        assert_eq!(mapper.get_new_gene_id(m2, "g1"), "g1");
        assert!(mapper.has_translation_table(m1));
    }

    #[test]
    fn test_unknown_old_id_is_rejected() {
        let mut f = fixture();
        let bogus = SelectionSet::new().with("m2", "does_not_exist", "x_c", &["c"]);
        let reference = ReferenceTable::new();
        let contributions = selection_contributions(&f.sources, &bogus, Bucket::Assembly, true).unwrap();
        f.metabolites = Aggregator::new(&f.sources, &reference).fold_into(f.metabolites, contributions);

        let result = IdentityMapper::build(MapperInputs {
            sources: &f.sources,
            models: &f.models,
            metabolites: &f.metabolites.registry,
            metabolite_placements: f.metabolites.placements.clone(),
            reactions: &f.reactions.registry,
            reaction_placements: f.reactions.placements.clone(),
            additional_metabolites: &f.additional,
            splits: &f.splits,
            translations: GeneTranslations::disabled(2),
        });
        assert!(matches!(result, Err(ValidationError::UnknownOldId { .. })));
    }
}
