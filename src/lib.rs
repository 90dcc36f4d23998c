//! # supermodel - multi-source metabolic model reconciliation
//!
//! Several independently curated genome-scale metabolic models describe
//! overlapping chemistry under different identifiers, orientations and
//! gene annotations. `supermodel` merges them into one assembly that keeps
//! full provenance: every merged entity knows which sources contributed
//! it, under which original ids, and what each source said about it.
//!
//! ## Pipeline
//!
//! 1. **Aggregation**: per-source selections are folded into merged
//!    metabolites, reactions and genes ([`aggregate`]).
//! 2. **Identity mapping**: old↔new id tables, periplasmic context and
//!    gene translation ([`mapper`]).
//! 3. **Connection resolution**: per-source participants, genes, gene
//!    rules, bounds and subsystems in merged terms ([`resolve`]).
//! 4. **Direction reconciliation**: sources that wrote a reaction the
//!    other way round are flipped ([`direction`]).
//! 5. **Consensus**: the `assembly` view of every attribute
//!    ([`consensus`]).
//!
//! Comparison queries ([`comparison`]) then label consensus subsets such
//! as "present in at least 3 sources" or "only in source A".
//!
//! ## Usage
//!
//! ```rust,ignore
//! use supermodel::{AssemblyConfig, SelectionSet, SuperModel};
//!
//! let assembly = SuperModel::builder(AssemblyConfig::default().and_as_solid(true))
//!     .sources([carveme, gapseq, modelseed])
//!     .selected_metabolites(metabolites)
//!     .selected_reactions(reactions)
//!     .build()?;
//!
//! for diagnostic in assembly.diagnostics.iter() {
//!     eprintln!("{diagnostic}");
//! }
//!
//! let mut model = assembly.model;
//! model.at_least_in(2)?;
//! model.venn_segments();
//! model.write_to_path("community.supermodel")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Inputs
pub mod config;
pub mod error;
pub mod reference;
pub mod selection;
pub mod source;
pub mod source_model;
pub mod translation;

// Merged entities and the run pipeline
pub mod aggregate;
pub mod consensus;
pub mod diagnostics;
pub mod direction;
pub mod entity;
pub mod gpr;
pub mod mapper;
pub mod resolve;

// Assembled model, queries and persistence
pub mod comparison;
pub mod storage;
pub mod supermodel;

// Re-export primary types at crate root for convenience
pub use comparison::ComparisonSet;
pub use config::AssemblyConfig;
pub use consensus::Threshold;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use direction::Orientation;
pub use entity::{
    Bucket, GeneHandle, MergedGene, MergedMetabolite, MergedReaction, MetaboliteHandle, ReactionHandle, ReactionView,
    Registry,
};
pub use error::{AssemblyError, AssemblyResult, OutputError, ValidationError};
pub use gpr::{Gpr, GprError};
pub use reference::ReferenceTable;
pub use selection::{PeriplasmicSplits, Selection, SelectionSet};
pub use source::{InModels, PerSource, SourceId, SourceRegistry};
pub use source_model::{OldGene, OldMetabolite, OldReaction, SourceModel};
pub use supermodel::{Assembly, AssemblyBuilder, SuperModel};
pub use translation::{GeneTranslationTable, GeneTranslations, NOT_FOUND};
