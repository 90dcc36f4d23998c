//! Entity layer modules.
//!
//! This module groups handles, merged entities, and their registry.

pub mod handle;
pub mod merged;
pub mod registry;

pub use handle::{EntityHandle, GeneHandle, MetaboliteHandle, ReactionHandle};
pub use merged::{
    Element, MergedCore, MergedEntity, MergedGene, MergedMetabolite, MergedReaction, ReactionView,
    NOT_CONVERTED_NAME,
};
pub use registry::{disambiguated_id, Bucket, Registry, Slot};
