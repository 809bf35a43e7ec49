use crate::{QuillHasher, ValueKey};
use indexmap::IndexSet;
use std::hash::BuildHasherDefault;

/// The hash set type underlying [QSet]
pub type ValueSet = IndexSet<ValueKey, BuildHasherDefault<QuillHasher>>;

/// The Quill runtime's set storage
///
/// Elements follow the same hashability rule as map keys, so sets only ever hold
/// scalar values and never participate in reference cycles.
#[derive(Clone, Default)]
pub struct QSet {
    data: ValueSet,
}

impl QSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: ValueSet::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Provides a reference to the set's elements
    pub fn data(&self) -> &ValueSet {
        &self.data
    }

    /// Inserts an element, returning false if an equal element was already present
    pub fn insert(&mut self, value: ValueKey) -> bool {
        self.data.insert(value)
    }

    /// Removes an element, returning true if it was present
    pub fn remove(&mut self, value: &ValueKey) -> bool {
        self.data.shift_remove(value)
    }

    /// Returns true if the set contains the given element
    pub fn contains(&self, value: &ValueKey) -> bool {
        self.data.contains(value)
    }

    /// Removes all elements from the set
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Returns the number of elements in the set
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the set contains no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a fresh set containing the elements of both sets
    ///
    /// The inputs are left untouched.
    #[must_use]
    pub fn union(&self, other: &QSet) -> QSet {
        Self {
            data: self.data.union(&other.data).cloned().collect(),
        }
    }

    /// Returns a fresh set containing the elements present in both sets
    ///
    /// The inputs are left untouched.
    #[must_use]
    pub fn intersection(&self, other: &QSet) -> QSet {
        Self {
            data: self.data.intersection(&other.data).cloned().collect(),
        }
    }
}
