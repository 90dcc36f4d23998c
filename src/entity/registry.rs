//! Owner-indexed arena of merged entities.
//!
//! Each entity class has one [`Registry`]. Entities live in a single
//! arena and are addressed by typed handles; the two buckets map ids to
//! handles. An entity belongs to exactly one bucket.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::entity::handle::EntityHandle;
use crate::entity::merged::MergedEntity;

/// Named partitions of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Entities resolved against the reference vocabulary (and, when
    /// mixing is enabled, unresolved ones too).
    Assembly,
    /// Entities kept under their original identity.
    NotConverted,
}

impl Bucket {
    /// Returns true for the bucket served by the unresolved mapping tables.
    #[must_use]
    pub const fn is_unresolved(self) -> bool {
        matches!(self, Self::NotConverted)
    }
}

/// Id of the entity created when `id` collides with an entity of the
/// opposite `converted` flag.
#[must_use]
pub fn disambiguated_id(id: &str, converted: bool) -> String {
    let flag = if converted { "True" } else { "False" };
    format!("{id}_convert_{flag}")
}

/// Where a new contribution lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<H> {
    /// Fold into an existing entity.
    Existing(H),
    /// Create a new entity under this id.
    New(String),
}

/// Arena plus bucket indexes for one entity class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "E: Serialize",
    deserialize = "E: DeserializeOwned"
))]
pub struct Registry<E: MergedEntity> {
    entities: Vec<E>,
    buckets: Vec<Bucket>,
    assembly: IndexMap<String, E::Handle>,
    notconverted: IndexMap<String, E::Handle>,
}

impl<E: MergedEntity> Default for Registry<E> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            buckets: Vec::new(),
            assembly: IndexMap::new(),
            notconverted: IndexMap::new(),
        }
    }
}

impl<E: MergedEntity> Registry<E> {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, bucket: Bucket) -> &IndexMap<String, E::Handle> {
        match bucket {
            Bucket::Assembly => &self.assembly,
            Bucket::NotConverted => &self.notconverted,
        }
    }

    /// Stores an entity under its core id. An id already present in the
    /// bucket is re-pointed at the new entity.
    pub fn insert(&mut self, bucket: Bucket, entity: E) -> E::Handle {
        let handle = E::Handle::from_index(self.entities.len());
        let id = entity.core().id.clone();
        self.entities.push(entity);
        self.buckets.push(bucket);
        match bucket {
            Bucket::Assembly => self.assembly.insert(id, handle),
            Bucket::NotConverted => self.notconverted.insert(id, handle),
        };
        handle
    }

    /// Returns the entity behind a handle issued by this registry.
    ///
    /// # Panics
    /// Panics if the handle belongs to another registry.
    #[must_use]
    pub fn get(&self, handle: E::Handle) -> &E {
        &self.entities[handle.index()]
    }

    /// Mutable access to the entity behind a handle.
    ///
    /// # Panics
    /// Panics if the handle belongs to another registry.
    pub fn get_mut(&mut self, handle: E::Handle) -> &mut E {
        &mut self.entities[handle.index()]
    }

    /// Returns the bucket the entity was inserted into.
    #[must_use]
    pub fn bucket_of(&self, handle: E::Handle) -> Bucket {
        self.buckets[handle.index()]
    }

    /// Exact id lookup in one bucket.
    #[must_use]
    pub fn lookup(&self, bucket: Bucket, id: &str) -> Option<E::Handle> {
        self.index(bucket).get(id).copied()
    }

    /// Entity by id in one bucket.
    #[must_use]
    pub fn by_id(&self, bucket: Bucket, id: &str) -> Option<&E> {
        self.lookup(bucket, id).map(|h| self.get(h))
    }

    /// Finds the entity a contribution `(id, converted)` was folded into.
    #[must_use]
    pub fn find(&self, bucket: Bucket, id: &str, converted: bool) -> Option<E::Handle> {
        match self.lookup(bucket, id) {
            Some(handle) if self.get(handle).core().converted == converted => Some(handle),
            Some(_) => self.lookup(bucket, &disambiguated_id(id, converted)),
            None => None,
        }
    }

    /// Applies the merge rule: same id and flag folds in place; a flag
    /// collision goes to the disambiguated id, created on first use.
    #[must_use]
    pub fn slot(&self, bucket: Bucket, id: &str, converted: bool) -> Slot<E::Handle> {
        match self.lookup(bucket, id) {
            None => Slot::New(id.to_string()),
            Some(handle) if self.get(handle).core().converted == converted => Slot::Existing(handle),
            Some(_) => {
                let alt = disambiguated_id(id, converted);
                match self.lookup(bucket, &alt) {
                    Some(handle) => Slot::Existing(handle),
                    None => Slot::New(alt),
                }
            }
        }
    }

    /// Handles of one bucket, in insertion order.
    pub fn handles(&self, bucket: Bucket) -> impl Iterator<Item = E::Handle> + '_ {
        self.index(bucket).values().copied()
    }

    /// `(handle, entity)` pairs of one bucket, in insertion order.
    pub fn iter(&self, bucket: Bucket) -> impl Iterator<Item = (E::Handle, &E)> + '_ {
        self.index(bucket).values().map(move |&h| (h, self.get(h)))
    }

    /// Number of entities in one bucket.
    #[must_use]
    pub fn bucket_len(&self, bucket: Bucket) -> usize {
        self.index(bucket).len()
    }

    /// Total number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entity was inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
