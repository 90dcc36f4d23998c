//! Folding per-source contributions into merged entities.
//!
//! Every accepted identity of an original entity becomes one immutable
//! [`SourceContribution`]. Contributions are folded left to right with
//! [`Aggregator::merge`]; the fold order decides which contribution
//! creates an entity, and the creator's reference lookup names it.

use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::entity::{Bucket, Element, MergedCore, MergedEntity, Registry, Slot};
use crate::error::ValidationError;
use crate::reference::ReferenceTable;
use crate::selection::SelectionSet;
use crate::source::{SourceId, SourceRegistry};
use crate::source_model::SourceModel;
use crate::translation::{GeneHit, GeneTranslations};

/// One original entity assigned to a new identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContribution {
    /// Source the original entity belongs to.
    pub source: SourceId,
    /// Original id in the source.
    pub old_id: String,
    /// Merged id it resolves to.
    pub new_id: String,
    /// Compartments it was placed in.
    pub compartments: Vec<String>,
    /// Bucket the merged entity lives in.
    pub bucket: Bucket,
    /// Whether the id came from the reference vocabulary.
    pub converted: bool,
}

impl SourceContribution {
    /// Creates a contribution with no compartments.
    #[must_use]
    pub fn new(
        source: SourceId,
        old_id: impl Into<String>,
        new_id: impl Into<String>,
        bucket: Bucket,
        converted: bool,
    ) -> Self {
        Self {
            source,
            old_id: old_id.into(),
            new_id: new_id.into(),
            compartments: Vec::new(),
            bucket,
            converted,
        }
    }

    /// Sets the compartments.
    #[must_use]
    pub fn with_compartments(mut self, compartments: Vec<String>) -> Self {
        self.compartments = compartments;
        self
    }
}

/// Handles each `(source, old id)` was folded into, per bucket.
///
/// The assembly bucket backs the resolved old→new tables, the
/// not-converted bucket the unresolved ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Placements<H> {
    assembly: Vec<IndexMap<String, Vec<H>>>,
    notconverted: Vec<IndexMap<String, Vec<H>>>,
}

impl<H: Copy + PartialEq> Placements<H> {
    /// Empty placements for `source_count` sources.
    #[must_use]
    pub fn new(source_count: usize) -> Self {
        Self {
            assembly: vec![IndexMap::new(); source_count],
            notconverted: vec![IndexMap::new(); source_count],
        }
    }

    fn table_mut(&mut self, bucket: Bucket) -> &mut Vec<IndexMap<String, Vec<H>>> {
        match bucket {
            Bucket::Assembly => &mut self.assembly,
            Bucket::NotConverted => &mut self.notconverted,
        }
    }

    /// Records that `old_id` of `source` landed in `handle`.
    pub fn record(&mut self, bucket: Bucket, source: SourceId, old_id: &str, handle: H) {
        let placed = self.table_mut(bucket)[source.index()]
            .entry(old_id.to_string())
            .or_default();
        if !placed.contains(&handle) {
            placed.push(handle);
        }
    }

    /// Handles an old id was folded into, in fold order.
    #[must_use]
    pub fn get(&self, bucket: Bucket, source: SourceId, old_id: &str) -> &[H] {
        let table = match bucket {
            Bucket::Assembly => &self.assembly,
            Bucket::NotConverted => &self.notconverted,
        };
        table
            .get(source.index())
            .and_then(|m| m.get(old_id))
            .map_or(&[], Vec::as_slice)
    }
}

/// Accumulator of a fold: the registry, where everything landed, and
/// the diagnostics raised on the way.
#[derive(Debug, Clone)]
pub struct Aggregate<E: MergedEntity> {
    /// Merged entities folded so far.
    pub registry: Registry<E>,
    /// Where each `(source, old id)` landed.
    pub placements: Placements<E::Handle>,
    /// Diagnostics raised while folding.
    pub diagnostics: Diagnostics,
}

impl<E: MergedEntity> Aggregate<E> {
    /// Empty accumulator for `source_count` sources.
    #[must_use]
    pub fn new(source_count: usize) -> Self {
        Self {
            registry: Registry::new(),
            placements: Placements::new(source_count),
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Context shared by every merge step of one entity class.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    sources: &'a SourceRegistry,
    reference: &'a ReferenceTable,
}

impl<'a> Aggregator<'a> {
    /// Creates an aggregator over the run sources and a reference table.
    #[must_use]
    pub fn new(sources: &'a SourceRegistry, reference: &'a ReferenceTable) -> Self {
        Self { sources, reference }
    }

    /// Folds one contribution into the accumulator.
    #[must_use]
    pub fn merge<E: Element>(&self, mut acc: Aggregate<E>, contribution: &SourceContribution) -> Aggregate<E> {
        let SourceContribution {
            source,
            old_id,
            new_id,
            compartments,
            bucket,
            converted,
        } = contribution;

        let handle = match acc.registry.slot(*bucket, new_id, *converted) {
            Slot::Existing(handle) => {
                let entity = acc.registry.get_mut(handle);
                entity.core_mut().absorb(*source, old_id);
                entity.add_compartments(*source, compartments);
                handle
            }
            Slot::New(id) => {
                let record = if *converted && E::USES_REFERENCE {
                    let record = E::reference(self.reference, new_id);
                    if record.and_then(|r| r.name.as_ref()).is_none() {
                        acc.diagnostics.push(
                            Diagnostic::new(
                                DiagnosticKind::MissingReference,
                                id.as_str(),
                                format!("no reference {} entry for {new_id}", E::KIND),
                            )
                            .with_source(self.sources.name(*source)),
                        );
                    }
                    record
                } else {
                    None
                };
                let core = MergedCore::first_seen(id, *converted, *source, old_id, self.sources.len());
                acc.registry.insert(*bucket, E::from_core(core, record, compartments))
            }
        };
        acc.placements.record(*bucket, *source, old_id, handle);
        acc
    }

    /// Folds contributions in order, starting from `acc`.
    #[must_use]
    pub fn fold_into<E, I>(&self, acc: Aggregate<E>, contributions: I) -> Aggregate<E>
    where
        E: Element,
        I: IntoIterator<Item = SourceContribution>,
    {
        contributions
            .into_iter()
            .fold(acc, |acc, contribution| self.merge(acc, &contribution))
    }
}

/// Turns selections into contributions, sources in registry order.
///
/// # Errors
/// Fails if a selection names a source that is not registered.
pub fn selection_contributions(
    sources: &SourceRegistry,
    selections: &SelectionSet,
    bucket: Bucket,
    converted: bool,
) -> Result<Vec<SourceContribution>, ValidationError> {
    let named: Vec<&str> = selections.sources().collect();
    sources.resolve_all(&named)?;

    let mut contributions = Vec::new();
    for (source, name) in sources.iter() {
        let Some(selected) = selections.source(name) else {
            continue;
        };
        for (old_id, selection) in selected {
            contributions.push(
                SourceContribution::new(source, old_id.as_str(), selection.new_id.as_str(), bucket, converted)
                    .with_compartments(selection.compartments.clone()),
            );
        }
    }
    Ok(contributions)
}

/// Gene contributions of every source, in registry order.
///
/// Without a translation table every gene keeps its id in the assembly
/// bucket. With one, translated genes merge under their locus tag in the
/// assembly bucket; unmatched or unusable rows keep the original id in
/// `unmatched_bucket`.
#[must_use]
pub fn gene_contributions(
    models: &[SourceModel],
    translations: &GeneTranslations,
    unmatched_bucket: Bucket,
) -> Vec<SourceContribution> {
    let mut contributions = Vec::new();
    for (index, model) in models.iter().enumerate() {
        let source = SourceId::from_index(index);
        let table = translations.table(source);
        for gene in model.genes() {
            let contribution = match table.map(|t| t.lookup(&gene.id)) {
                None => SourceContribution::new(source, gene.id.as_str(), gene.id.as_str(), Bucket::Assembly, false),
                Some(GeneHit::Translated(new_id)) => {
                    SourceContribution::new(source, gene.id.as_str(), new_id, Bucket::Assembly, true)
                }
                Some(GeneHit::Unusable | GeneHit::Missing) => {
                    SourceContribution::new(source, gene.id.as_str(), gene.id.as_str(), unmatched_bucket, false)
                }
            };
            contributions.push(contribution);
        }
    }
    contributions
}
