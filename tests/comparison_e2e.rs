//! Comparison queries over a three-source assembly.
//!
//! Reactions by source:
//! - R1: A, B, C
//! - R2: A, B
//! - R3: A
//! - R4: C

use std::collections::HashSet;

use supermodel::{
    AssemblyConfig, Bucket, OldReaction, ReactionHandle, Selection, SelectionSet, SourceModel, SuperModel,
    ValidationError,
};

const LAYOUT: [(&str, &[&str]); 3] = [("A", &["R1", "R2", "R3"]), ("B", &["R1", "R2"]), ("C", &["R1", "R4"])];

fn model_with(names: [&str; 3]) -> SuperModel {
    let mut metabolites = SelectionSet::new();
    let mut reactions = SelectionSet::new();
    let mut builder = SuperModel::builder(AssemblyConfig::default());

    for (name, (_, present)) in names.iter().zip(LAYOUT) {
        let mut model = SourceModel::new(*name);
        for reaction in present {
            let old_id = reaction.to_lowercase();
            let gene = format!("{}_{old_id}", name.to_lowercase());
            model.add_reaction(
                OldReaction::new(old_id.as_str())
                    .with_metabolite("m1", -1.0)
                    .with_metabolite("m2", 1.0)
                    .with_gene_rule(gene.as_str(), &[gene.as_str()]),
            );
            reactions.insert(*name, old_id, Selection::new(*reaction, &["c"]));
        }
        metabolites.insert(*name, "m1", Selection::new("M1_c", &["c"]));
        metabolites.insert(*name, "m2", Selection::new("M2_c", &["c"]));
        builder = builder.source(model);
    }

    builder
        .selected_metabolites(metabolites)
        .selected_reactions(reactions)
        .build()
        .unwrap()
        .model
}

fn three_sources() -> SuperModel {
    model_with(["A", "B", "C"])
}

fn reaction_ids(model: &SuperModel, label: &str) -> Vec<String> {
    let mut ids: Vec<String> = model
        .comparison(label)
        .unwrap()
        .reactions
        .iter()
        .map(|&h| model.reactions.get(h).core.id.clone())
        .collect();
    ids.sort();
    ids
}

#[test]
fn test_at_least_in_is_monotone() {
    let mut model = three_sources();
    assert_eq!(model.at_least_in(2).unwrap(), "core2");
    assert_eq!(model.at_least_in(3).unwrap(), "core3");

    assert_eq!(reaction_ids(&model, "core2"), vec!["R1", "R2"]);
    assert_eq!(reaction_ids(&model, "core3"), vec!["R1"]);

    let core2: HashSet<ReactionHandle> = model.comparison("core2").unwrap().reactions.iter().copied().collect();
    assert!(model.comparison("core3").unwrap().reactions.iter().all(|r| core2.contains(r)));
    assert_eq!(model.comparison("core3").unwrap().metabolites.len(), 2);
}

#[test]
fn test_threshold_validation() {
    let mut model = three_sources();
    assert!(matches!(model.at_least_in(1), Err(ValidationError::ThresholdAlreadyAssembled)));
    assert!(matches!(
        model.at_least_in(4),
        Err(ValidationError::InvalidThreshold { k: 4, source_count: 3 })
    ));
    assert!(matches!(model.at_least_in(0), Err(ValidationError::InvalidThreshold { .. })));
    assert!(matches!(model.exactly_in(0), Err(ValidationError::InvalidThreshold { .. })));
    assert!(model.comparisons.is_empty());
}

#[test]
fn test_exactly_in_partitions_reactions() {
    let mut model = three_sources();
    let mut seen = HashSet::new();
    let mut total = 0;
    for k in 1..=3 {
        let label = model.exactly_in(k).unwrap();
        assert_eq!(label, format!("exactly{k}"));
        for &reaction in &model.comparison(&label).unwrap().reactions {
            assert!(seen.insert(reaction), "reaction counted twice");
            total += 1;
        }
    }
    assert_eq!(total, model.reactions.bucket_len(Bucket::Assembly));
    assert_eq!(reaction_ids(&model, "exactly1"), vec!["R3", "R4"]);
}

#[test]
fn test_venn_segments_count_and_labels() {
    let mut model = three_sources();
    let labels = model.venn_segments();
    assert_eq!(labels.len(), 2usize.pow(3) - 2);
    assert_eq!(labels.iter().collect::<HashSet<_>>().len(), labels.len());
    assert!(labels.contains(&"yes_A_no_B_C".to_string()));
    assert!(labels.contains(&"yes_A_B_no_C".to_string()));

    assert_eq!(reaction_ids(&model, "yes_A_no_B_C"), vec!["R3"]);
    assert_eq!(reaction_ids(&model, "yes_A_B_no_C"), vec!["R2"]);
    assert!(reaction_ids(&model, "yes_B_no_A_C").is_empty());
}

#[test]
fn test_present_partition() {
    let mut model = three_sources();
    let label = model.present(&["A"], &["C"]).unwrap();
    assert_eq!(label, "yes_A_no_C");
    assert_eq!(reaction_ids(&model, &label), vec!["R2", "R3"]);

    let only_absent = model.present::<&str>(&[], &["A"]).unwrap();
    assert_eq!(only_absent, "no_A");
    assert_eq!(reaction_ids(&model, &only_absent), vec!["R4"]);

    // Without a `yes` side the view is taken over the sources R4 is in.
    let m1 = model.metabolites.lookup(Bucket::Assembly, "M1_c").unwrap();
    let m2 = model.metabolites.lookup(Bucket::Assembly, "M2_c").unwrap();
    let view = &model.reaction("R4").unwrap().comparison[&only_absent];
    assert_eq!(view.gene_reaction_rule.as_deref(), Some("c_r4"));
    assert_eq!(view.lower_bound, Some(0.0));
    assert_eq!(view.upper_bound, Some(1000.0));
    assert_eq!(view.reactants, vec![m1]);
    assert_eq!(view.products, vec![m2]);
    assert_eq!(view.metabolites[&m1], -1.0);
    assert_eq!(view.metabolites[&m2], 1.0);
}

#[test]
fn test_present_validation() {
    let mut model = three_sources();
    assert!(matches!(model.present::<&str>(&[], &[]), Err(ValidationError::EmptyPartition)));
    assert!(matches!(
        model.present(&["A", "D"], &[]),
        Err(ValidationError::UnknownSources { names }) if names == vec!["D".to_string()]
    ));
    assert!(matches!(
        model.present(&["A"], &["A"]),
        Err(ValidationError::OverlappingPartition { .. })
    ));
}

#[test]
fn test_views_are_attached_to_entities() {
    let mut model = three_sources();
    model.at_least_in(2).unwrap();
    model.present(&["A"], &["C"]).unwrap();

    let m1 = model.metabolites.lookup(Bucket::Assembly, "M1_c").unwrap();
    let r1 = model.reaction("R1").unwrap();
    assert_eq!(r1.comparison["core2"].reactants, vec![m1]);
    assert_eq!(r1.comparison["core2"].metabolites[&m1], -1.0);
    assert_eq!(r1.comparison["core2"].lower_bound, Some(0.0));
    // Every source has its own gene for R1, so none reaches two sources.
    assert!(r1.comparison["core2"].genes.is_empty());
    assert_eq!(r1.comparison["core2"].gene_reaction_rule, None);
    assert!(!r1.comparison.contains_key("yes_A_no_C"));

    let r3 = model.reaction("R3").unwrap();
    assert_eq!(r3.comparison["yes_A_no_C"].gene_reaction_rule.as_deref(), Some("a_r3"));

    let m1 = model.metabolites.get(m1);
    assert_eq!(m1.comparison["core2"].len(), 2);
}

#[test]
fn test_intersection_and_confidence_levels() {
    let mut model = three_sources();
    assert_eq!(model.intersection(), "core3");
    assert_eq!(model.all_confidence_levels(), vec!["core3", "core2"]);
    assert_eq!(model.comparisons.len(), 2);
}

#[test]
fn test_short_name_len() {
    assert_eq!(three_sources().short_name_len(), 1);
    let mut model = model_with(["carveme", "cobrapy", "gapseq"]);
    assert_eq!(model.short_name_len(), 2);
    assert_eq!(model.present(&["carveme"], &["gapseq"]).unwrap(), "yes_ca_no_ga");
}
