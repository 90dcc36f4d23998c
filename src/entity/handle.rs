//! Typed handles into the entity arenas.
//!
//! Merged entities never hold references to each other; they hold
//! handles resolved through the owning [`super::Registry`].

use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Index of an entity inside its registry arena.
pub trait EntityHandle:
    Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display + Serialize + DeserializeOwned
{
    /// Arena position.
    fn index(self) -> usize;

    /// Handle for an arena position.
    fn from_index(index: usize) -> Self;
}

macro_rules! entity_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl EntityHandle for $name {
            fn index(self) -> usize {
                self.0 as usize
            }

            #[allow(clippy::cast_possible_truncation)]
            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

entity_handle!(
    /// Handle of a merged metabolite.
    MetaboliteHandle,
    "metabolite"
);
entity_handle!(
    /// Handle of a merged reaction.
    ReactionHandle,
    "reaction"
);
entity_handle!(
    /// Handle of a merged gene.
    GeneHandle,
    "gene"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip_and_display() {
        let h = ReactionHandle::from_index(3);
        assert_eq!(h.index(), 3);
        assert_eq!(h.to_string(), "reaction#3");
        assert_eq!(serde_json::to_string(&h).unwrap(), "3");
    }
}
