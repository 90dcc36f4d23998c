//! In-memory view of one curated source model.
//!
//! Loading and parsing models is left to callers; they populate a
//! [`SourceModel`] and hand it to the assembler read-only. The model keeps
//! reverse structural indexes (metabolite → reactions, gene → reactions)
//! up to date as reactions are added.

use std::collections::HashMap;

use indexmap::IndexMap;

/// A metabolite as it appears in a source model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OldMetabolite {
    /// Original id.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Compartment id.
    pub compartment: Option<String>,
    /// Chemical formula.
    pub formula: Option<String>,
}

impl OldMetabolite {
    /// Creates a metabolite with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the chemical formula.
    #[must_use]
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Sets the compartment.
    #[must_use]
    pub fn with_compartment(mut self, compartment: impl Into<String>) -> Self {
        self.compartment = Some(compartment.into());
        self
    }
}

/// A reaction as it appears in a source model.
///
/// Participants with a negative coefficient are reactants, positive ones
/// are products.
#[derive(Debug, Clone, PartialEq)]
pub struct OldReaction {
    /// Original id.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Coefficient per participant id.
    pub metabolites: IndexMap<String, f64>,
    /// Lower flux bound.
    pub lower_bound: f64,
    /// Upper flux bound.
    pub upper_bound: f64,
    /// Subsystem, if any.
    pub subsystem: Option<String>,
    /// Gene rule; empty when the reaction has none.
    pub gene_reaction_rule: String,
    /// Genes named in the rule.
    pub genes: Vec<String>,
}

impl OldReaction {
    /// Creates an irreversible reaction (`0..1000`) without participants.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            metabolites: IndexMap::new(),
            lower_bound: 0.0,
            upper_bound: 1000.0,
            subsystem: None,
            gene_reaction_rule: String::new(),
            genes: Vec::new(),
        }
    }

    /// Adds a participant with its stoichiometric coefficient.
    #[must_use]
    pub fn with_metabolite(mut self, id: impl Into<String>, coefficient: f64) -> Self {
        self.metabolites.insert(id.into(), coefficient);
        self
    }

    /// Sets the flux bounds.
    #[must_use]
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    /// Sets the subsystem.
    #[must_use]
    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    /// Sets the gene rule and the genes it mentions.
    #[must_use]
    pub fn with_gene_rule(mut self, rule: impl Into<String>, genes: &[&str]) -> Self {
        self.gene_reaction_rule = rule.into();
        self.genes = genes.iter().map(|g| (*g).to_string()).collect();
        self
    }

    /// Ids of reactants, in declaration order.
    pub fn reactants(&self) -> impl Iterator<Item = &str> + '_ {
        self.metabolites
            .iter()
            .filter(|(_, c)| **c < 0.0)
            .map(|(id, _)| id.as_str())
    }

    /// Ids of products, in declaration order.
    pub fn products(&self) -> impl Iterator<Item = &str> + '_ {
        self.metabolites
            .iter()
            .filter(|(_, c)| **c > 0.0)
            .map(|(id, _)| id.as_str())
    }
}

/// A gene as it appears in a source model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OldGene {
    /// Original id.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
}

impl OldGene {
    /// Creates a gene with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Structural graph of one source model.
#[derive(Debug, Clone, Default)]
pub struct SourceModel {
    /// Source name.
    pub id: String,
    metabolites: IndexMap<String, OldMetabolite>,
    reactions: IndexMap<String, OldReaction>,
    genes: IndexMap<String, OldGene>,
    metabolite_reactions: HashMap<String, Vec<String>>,
    gene_reactions: HashMap<String, Vec<String>>,
}

impl SourceModel {
    /// Creates an empty model.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Adds (or replaces) a metabolite.
    pub fn add_metabolite(&mut self, metabolite: OldMetabolite) {
        self.metabolites.insert(metabolite.id.clone(), metabolite);
    }

    /// Adds (or replaces) a gene.
    pub fn add_gene(&mut self, gene: OldGene) {
        self.genes.insert(gene.id.clone(), gene);
    }

    /// Adds a reaction and indexes its participants and genes.
    ///
    /// Participants and genes not yet in the model are added with only an id.
    pub fn add_reaction(&mut self, reaction: OldReaction) {
        if let Some(previous) = self.reactions.shift_remove(&reaction.id) {
            self.unlink(&previous);
        }
        for met_id in reaction.metabolites.keys() {
            if !self.metabolites.contains_key(met_id) {
                self.add_metabolite(OldMetabolite::new(met_id.clone()));
            }
            self.metabolite_reactions
                .entry(met_id.clone())
                .or_default()
                .push(reaction.id.clone());
        }
        for gene_id in &reaction.genes {
            if !self.genes.contains_key(gene_id) {
                self.add_gene(OldGene::new(gene_id.clone()));
            }
            let linked = self.gene_reactions.entry(gene_id.clone()).or_default();
            if !linked.contains(&reaction.id) {
                linked.push(reaction.id.clone());
            }
        }
        self.reactions.insert(reaction.id.clone(), reaction);
    }

    fn unlink(&mut self, reaction: &OldReaction) {
        for met_id in reaction.metabolites.keys() {
            if let Some(linked) = self.metabolite_reactions.get_mut(met_id) {
                linked.retain(|r| r != &reaction.id);
            }
        }
        for gene_id in &reaction.genes {
            if let Some(linked) = self.gene_reactions.get_mut(gene_id) {
                linked.retain(|r| r != &reaction.id);
            }
        }
    }

    /// Metabolite by original id.
    #[must_use]
    pub fn metabolite(&self, id: &str) -> Option<&OldMetabolite> {
        self.metabolites.get(id)
    }

    /// Reaction by original id.
    #[must_use]
    pub fn reaction(&self, id: &str) -> Option<&OldReaction> {
        self.reactions.get(id)
    }

    /// Gene by original id.
    #[must_use]
    pub fn gene(&self, id: &str) -> Option<&OldGene> {
        self.genes.get(id)
    }

    /// Metabolites in insertion order.
    pub fn metabolites(&self) -> impl Iterator<Item = &OldMetabolite> + '_ {
        self.metabolites.values()
    }

    /// Reactions in insertion order.
    pub fn reactions(&self) -> impl Iterator<Item = &OldReaction> + '_ {
        self.reactions.values()
    }

    /// Genes in insertion order.
    pub fn genes(&self) -> impl Iterator<Item = &OldGene> + '_ {
        self.genes.values()
    }

    /// Reactions a metabolite participates in.
    #[must_use]
    pub fn reactions_of_metabolite(&self, id: &str) -> &[String] {
        self.metabolite_reactions.get(id).map_or(&[], Vec::as_slice)
    }

    /// Reactions whose gene list mentions the gene.
    #[must_use]
    pub fn reactions_of_gene(&self, id: &str) -> &[String] {
        self.gene_reactions.get(id).map_or(&[], Vec::as_slice)
    }

    /// `(lower, upper)` flux bounds of a reaction.
    #[must_use]
    pub fn bounds(&self, reaction_id: &str) -> Option<(f64, f64)> {
        self.reactions
            .get(reaction_id)
            .map(|r| (r.lower_bound, r.upper_bound))
    }

    /// Subsystem of a reaction.
    #[must_use]
    pub fn subsystem(&self, reaction_id: &str) -> Option<&str> {
        self.reactions
            .get(reaction_id)
            .and_then(|r| r.subsystem.as_deref())
    }

    /// Gene rule of a reaction.
    #[must_use]
    pub fn gene_rule(&self, reaction_id: &str) -> Option<&str> {
        self.reactions
            .get(reaction_id)
            .map(|r| r.gene_reaction_rule.as_str())
    }

    /// Genes of a reaction.
    #[must_use]
    pub fn genes_of(&self, reaction_id: &str) -> &[String] {
        self.reactions
            .get(reaction_id)
            .map_or(&[], |r| r.genes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glycolysis_fragment() -> SourceModel {
        let mut model = SourceModel::new("m1");
        model.add_metabolite(
            OldMetabolite::new("glc__D_c")
                .with_formula("C6H12O6")
                .with_compartment("c"),
        );
        model.add_reaction(
            OldReaction::new("HEX1")
                .with_metabolite("glc__D_c", -1.0)
                .with_metabolite("atp_c", -1.0)
                .with_metabolite("g6p_c", 1.0)
                .with_metabolite("adp_c", 1.0)
                .with_gene_rule("b2388", &["b2388"]),
        );
        model.add_reaction(
            OldReaction::new("PGI")
                .with_metabolite("g6p_c", -1.0)
                .with_metabolite("f6p_c", 1.0)
                .with_bounds(-1000.0, 1000.0),
        );
        model
    }

    #[test]
    fn test_reactants_and_products_follow_sign() {
        let model = glycolysis_fragment();
        let hex = model.reaction("HEX1").unwrap();
        assert_eq!(hex.reactants().collect::<Vec<_>>(), vec!["glc__D_c", "atp_c"]);
        assert_eq!(hex.products().collect::<Vec<_>>(), vec!["g6p_c", "adp_c"]);
    }

    #[test]
    fn test_structural_links_are_indexed() {
        let model = glycolysis_fragment();
        assert_eq!(model.reactions_of_metabolite("g6p_c"), ["HEX1", "PGI"]);
        assert_eq!(model.reactions_of_gene("b2388"), ["HEX1"]);
        assert!(model.reactions_of_metabolite("unknown").is_empty());
        assert!(model.gene("b2388").is_some());
        let glc = model.metabolite("glc__D_c").unwrap();
        assert_eq!(glc.formula.as_deref(), Some("C6H12O6"));
        assert_eq!(glc.compartment.as_deref(), Some("c"));
    }

    #[test]
    fn test_replacing_reaction_relinks() {
        let mut model = glycolysis_fragment();
        model.add_reaction(
            OldReaction::new("PGI")
                .with_metabolite("f6p_c", -1.0)
                .with_metabolite("g6p_c", 1.0),
        );
        assert_eq!(model.reactions_of_metabolite("g6p_c"), ["HEX1", "PGI"]);
        assert_eq!(model.reactions().count(), 2);
    }

    #[test]
    fn test_reaction_accessors() {
        let model = glycolysis_fragment();
        assert_eq!(model.bounds("PGI"), Some((-1000.0, 1000.0)));
        assert_eq!(model.gene_rule("HEX1"), Some("b2388"));
        assert_eq!(model.genes_of("HEX1"), ["b2388"]);
        assert!(model.subsystem("HEX1").is_none());
        assert!(model.bounds("missing").is_none());
    }
}
