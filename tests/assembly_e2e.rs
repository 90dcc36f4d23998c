//! End-to-end assembly runs through the public builder API.
//!
//! These tests cover:
//! - Orientation disagreement between two sources
//! - Gene translation with unmatched genes
//! - Converted and not-converted entities sharing an id
//! - Old id round-trips through annotations
//! - Strict mode

use std::fs;

use supermodel::{
    AssemblyBuilder, AssemblyConfig, Bucket, DiagnosticKind, GeneTranslationTable, GeneTranslations, OldReaction,
    ReferenceTable, SelectionSet, SourceModel, SourceRegistry, SuperModel, NOT_FOUND,
};
use tempfile::tempdir;

fn single_reaction_model(id: &str, reaction: &str, reactant: &str, product: &str) -> SourceModel {
    let mut model = SourceModel::new(id);
    model.add_reaction(
        OldReaction::new(reaction)
            .with_metabolite(reactant, -1.0)
            .with_metabolite(product, 1.0),
    );
    model
}

/// A writes a -> b, B writes b -> a.
fn opposite_orientations() -> AssemblyBuilder {
    let metabolites = SelectionSet::new()
        .with("A", "a", "a_c", &["c"])
        .with("A", "b", "b_c", &["c"])
        .with("B", "a", "a_c", &["c"])
        .with("B", "b", "b_c", &["c"]);
    let reactions = SelectionSet::new()
        .with("A", "r1", "R1", &["c"])
        .with("B", "r1", "R1", &["c"]);
    SuperModel::builder(AssemblyConfig::default())
        .source(single_reaction_model("A", "r1", "a", "b"))
        .source(single_reaction_model("B", "r1", "b", "a"))
        .selected_metabolites(metabolites)
        .selected_reactions(reactions)
}

#[test]
fn test_opposite_orientation_swaps_second_source() {
    let assembly = opposite_orientations().build().unwrap();
    let model = &assembly.model;
    let a = model.metabolites.lookup(Bucket::Assembly, "a_c").unwrap();
    let b = model.metabolites.lookup(Bucket::Assembly, "b_c").unwrap();
    let source_b = model.source_id("B").unwrap();

    let r1 = model.reaction("R1").unwrap();
    assert_eq!(r1.reactants[source_b], vec![a]);
    assert_eq!(r1.products[source_b], vec![b]);
    assert_eq!(r1.metabolites[source_b][&a], -1.0);
    assert_eq!(r1.lower_bound[source_b], Some(-1000.0));
    assert_eq!(r1.upper_bound[source_b], Some(0.0));

    assert_eq!(r1.reactants.assembly, vec![a]);
    assert_eq!(r1.products.assembly, vec![b]);
    assert_eq!(r1.lower_bound.assembly, Some(-1000.0));
    assert_eq!(r1.upper_bound.assembly, Some(1000.0));
    assert_eq!(assembly.diagnostics.of_kind(DiagnosticKind::UnexpectedDirectionTie).count(), 0);
}

#[test]
fn test_reverse_flux_evidence_decides_tie() {
    let mut a = SourceModel::new("A");
    a.add_reaction(
        OldReaction::new("r1")
            .with_metabolite("a", -1.0)
            .with_metabolite("b", 1.0)
            .with_bounds(0.0, 1000.0),
    );
    let mut b = SourceModel::new("B");
    b.add_reaction(
        OldReaction::new("r1")
            .with_metabolite("b", -1.0)
            .with_metabolite("a", 1.0)
            .with_bounds(-1000.0, 1000.0),
    );
    let model = SuperModel::builder(AssemblyConfig::default())
        .source(a)
        .source(b)
        .selected_metabolites(
            SelectionSet::new()
                .with("A", "a", "a_c", &["c"])
                .with("A", "b", "b_c", &["c"])
                .with("B", "a", "a_c", &["c"])
                .with("B", "b", "b_c", &["c"]),
        )
        .selected_reactions(
            SelectionSet::new()
                .with("A", "r1", "R1", &["c"])
                .with("B", "r1", "R1", &["c"]),
        )
        .build()
        .unwrap()
        .model;

    // A lacks reverse flux evidence, so A is flipped to B's orientation.
    let b_c = model.metabolites.lookup(Bucket::Assembly, "b_c").unwrap();
    let r1 = model.reaction("R1").unwrap();
    assert_eq!(r1.reactants.assembly, vec![b_c]);
    assert_eq!(r1.lower_bound[model.source_id("A").unwrap()], Some(-1000.0));
}

#[test]
fn test_swapping_twice_restores_source_view() {
    let mut model = opposite_orientations().build().unwrap().model;
    let source_a = model.source_id("A").unwrap();
    let handle = model.reactions.lookup(Bucket::Assembly, "R1").unwrap();
    let before = model.reactions.get(handle).clone();

    let reaction = model.reactions.get_mut(handle);
    reaction.swap_orientation(source_a);
    assert_ne!(*reaction, before);
    reaction.swap_orientation(source_a);
    assert_eq!(*reaction, before);
}

#[test]
fn test_unmatched_gene_is_not_linked() {
    let mut a = SourceModel::new("A");
    a.add_reaction(
        OldReaction::new("r1")
            .with_metabolite("a", -1.0)
            .with_metabolite("b", 1.0)
            .with_gene_rule("g1 or g2", &["g1", "g2"]),
    );
    let table = GeneTranslationTable::new().with_row("g2", Some("b0002"));

    let source = SourceRegistry::new(["A"]).unwrap().id("A").unwrap();
    let mut translations = GeneTranslations::disabled(1);
    translations.set(source, table.clone());
    assert_eq!(translations.new_gene_id(source, "g1"), NOT_FOUND);
    assert_eq!(translations.new_gene_id(source, "g2"), "b0002");

    let model = SuperModel::builder(AssemblyConfig::default())
        .source(a)
        .selected_metabolites(
            SelectionSet::new()
                .with("A", "a", "a_c", &["c"])
                .with("A", "b", "b_c", &["c"]),
        )
        .selected_reactions(SelectionSet::new().with("A", "r1", "R1", &["c"]))
        .gene_table("A", table)
        .build()
        .unwrap()
        .model;

    let b0002 = model.genes.lookup(Bucket::Assembly, "b0002").unwrap();
    assert!(model.gene("g1").is_none());
    assert!(model.genes.lookup(Bucket::NotConverted, "g1").is_some());

    let r1 = model.reaction("R1").unwrap();
    assert_eq!(r1.genes[source], vec![b0002]);
    assert_eq!(r1.gene_reaction_rule[source].as_deref(), Some("b0002"));
    assert_eq!(r1.mixed_gene_reaction_rule[source], vec!["g1_not_found or b0002"]);
    assert_eq!(model.genes.get(b0002).reactions[source], vec![model.reactions.lookup(Bucket::Assembly, "R1").unwrap()]);
}

#[test]
fn test_unmatched_gene_leaves_and_branch() {
    let mut a = SourceModel::new("A");
    a.add_reaction(
        OldReaction::new("r1")
            .with_metabolite("a", -1.0)
            .with_metabolite("b", 1.0)
            .with_gene_rule("g1 and g2", &["g1", "g2"]),
    );
    let model = SuperModel::builder(AssemblyConfig::default())
        .source(a)
        .selected_metabolites(
            SelectionSet::new()
                .with("A", "a", "a_c", &["c"])
                .with("A", "b", "b_c", &["c"]),
        )
        .selected_reactions(SelectionSet::new().with("A", "r1", "R1", &["c"]))
        .gene_table("A", GeneTranslationTable::new().with_row("g2", Some("b0002")))
        .build()
        .unwrap()
        .model;

    let source = model.source_id("A").unwrap();
    let b0002 = model.genes.lookup(Bucket::Assembly, "b0002").unwrap();
    let r1 = model.reaction("R1").unwrap();
    assert_eq!(r1.gene_reaction_rule[source].as_deref(), Some("b0002"));
    assert_eq!(r1.mixed_gene_reaction_rule[source], vec!["g1_not_found and b0002"]);
    assert_eq!(r1.genes[source], vec![b0002]);
    assert_eq!(r1.gene_reaction_rule.assembly.as_deref(), Some("b0002"));
}

#[test]
fn test_gene_folder_with_missing_table() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("A_blast.tsv"), "g1\tb0001\t98.5\t300\ng1\tb9999\t40.0\t120\n").unwrap();

    let assembly = SuperModel::builder(AssemblyConfig::default().gene_folder(dir.path()))
        .source({
            let mut a = SourceModel::new("A");
            a.add_reaction(OldReaction::new("r1").with_metabolite("a", -1.0).with_gene_rule("g1", &["g1"]));
            a
        })
        .source({
            let mut b = SourceModel::new("B");
            b.add_reaction(OldReaction::new("r1").with_metabolite("a", -1.0).with_gene_rule("g1", &["g1"]));
            b
        })
        .build()
        .unwrap();

    let missing: Vec<_> = assembly
        .diagnostics
        .of_kind(DiagnosticKind::MissingTranslationTable)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].source.as_deref(), Some("B"));

    // First row wins; B keeps its own id, unconverted.
    assert!(assembly.model.gene("b0001").unwrap().core.converted);
    assert!(assembly.model.gene("b9999").is_none());
    assert!(!assembly.model.gene("g1").unwrap().core.converted);
}

#[test]
fn test_same_id_converted_and_not_converted_stay_apart() {
    let a = single_reaction_model("A", "r1", "glc", "g6p");
    let b = single_reaction_model("B", "r1", "glucose", "g6p");
    let metabolites = SelectionSet::new()
        .with("A", "glc", "glc__D_c", &["c"])
        .with("A", "g6p", "g6p_c", &["c"])
        .with("B", "g6p", "g6p_c", &["c"]);
    let unresolved = SelectionSet::new().with("B", "glucose", "glc__D_c", &["c"]);

    let model = SuperModel::builder(AssemblyConfig::default().mix_unconverted(true))
        .source(a.clone())
        .source(b.clone())
        .selected_metabolites(metabolites.clone())
        .unselected_metabolites(unresolved.clone())
        .build()
        .unwrap()
        .model;

    let converted = model.metabolite("glc__D_c").unwrap();
    let kept = model.metabolite("glc__D_c_convert_False").unwrap();
    assert!(converted.core.converted);
    assert!(!kept.core.converted);
    assert_eq!(kept.core.name, "Not converted");
    assert_eq!(kept.core.annotation[model.source_id("B").unwrap()], vec!["glucose"]);

    // Without mixing, the unresolved entity lives in its own bucket under its plain id.
    let model = SuperModel::builder(AssemblyConfig::default())
        .source(a)
        .source(b)
        .selected_metabolites(metabolites)
        .unselected_metabolites(unresolved)
        .build()
        .unwrap()
        .model;
    assert!(model.metabolite("glc__D_c_convert_False").is_none());
    assert!(model.metabolites.by_id(Bucket::NotConverted, "glc__D_c").is_some());
}

#[test]
fn test_every_old_id_maps_back_through_annotation() {
    let metabolites = SelectionSet::new()
        .with("A", "a", "a_c", &["c"])
        .with("A", "b", "b_c", &["c"])
        .with("B", "a", "a_c", &["c"])
        .with("B", "b", "b_c", &["c"]);
    let model = opposite_orientations().build().unwrap().model;

    for source_name in ["A", "B"] {
        let source = model.source_id(source_name).unwrap();
        for (old_id, selection) in metabolites.source(source_name).unwrap() {
            let merged = model.metabolite(&selection.new_id).unwrap();
            assert!(merged.core.annotation[source].contains(old_id));
            assert!(merged.core.in_models.contains(source));
        }
    }
}

/// A maps two old reactions with different participants onto R1.
fn divergent_instances(config: AssemblyConfig) -> AssemblyBuilder {
    let mut a = SourceModel::new("A");
    a.add_reaction(OldReaction::new("r1a").with_metabolite("a", -1.0).with_metabolite("b", 1.0));
    a.add_reaction(OldReaction::new("r1b").with_metabolite("a", -1.0));
    SuperModel::builder(config)
        .source(a)
        .selected_metabolites(
            SelectionSet::new()
                .with("A", "a", "a_c", &["c"])
                .with("A", "b", "b_c", &["c"]),
        )
        .selected_reactions(
            SelectionSet::new()
                .with("A", "r1a", "R1", &["c"])
                .with("A", "r1b", "R1", &["c"]),
        )
}

#[test]
fn test_strict_mode_fails_on_data_inconsistency() {
    let lenient = divergent_instances(AssemblyConfig::default()).build().unwrap();
    assert_eq!(lenient.diagnostics.of_kind(DiagnosticKind::DivergentReactionInstances).count(), 1);

    let err = divergent_instances(AssemblyConfig::default().strict(true)).build().unwrap_err();
    assert!(err.is_strict());
    assert!(err.to_string().contains("divergent_reaction_instances"));
}

#[test]
fn test_strict_mode_tolerates_resource_notices() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("A_blast.tsv"), "g1\tb0001\t98.5\t300\n").unwrap();

    let assembly = SuperModel::builder(AssemblyConfig::default().gene_folder(dir.path()).strict(true))
        .source(single_reaction_model("A", "r1", "a", "b"))
        .source(single_reaction_model("B", "r1", "a", "b"))
        .build()
        .unwrap();

    assert_eq!(assembly.diagnostics.of_kind(DiagnosticKind::MissingTranslationTable).count(), 1);
    // Nothing is selected, so every entity is unresolved and needs no reference row.
    assert!(assembly.diagnostics.iter().all(|d| !d.kind.is_data_inconsistency()));
}

#[test]
fn test_strict_mode_passes_with_complete_reference() {
    let metabolites = ReferenceTable::new()
        .with_name("a", "Substance A")
        .with_name("b", "Substance B");
    let reactions = ReferenceTable::new().with_name("R1", "Reaction one");

    let assembly = SuperModel::builder(AssemblyConfig::default().strict(true))
        .source(single_reaction_model("A", "r1", "a", "b"))
        .source(single_reaction_model("B", "r1", "a", "b"))
        .selected_metabolites(
            SelectionSet::new()
                .with("A", "a", "a_c", &["c"])
                .with("A", "b", "b_c", &["c"])
                .with("B", "a", "a_c", &["c"])
                .with("B", "b", "b_c", &["c"]),
        )
        .selected_reactions(
            SelectionSet::new()
                .with("A", "r1", "R1", &["c"])
                .with("B", "r1", "R1", &["c"]),
        )
        .metabolite_reference(metabolites)
        .reaction_reference(reactions)
        .build()
        .unwrap();

    assert!(assembly.diagnostics.is_empty());
    assert_eq!(assembly.model.metabolite("a_c").unwrap().core.name, "Substance A");
    assert_eq!(assembly.model.reaction("R1").unwrap().core.name, "Reaction one");
}
