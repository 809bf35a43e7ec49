use crate::{QValue, ValueKey};
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

/// The hasher used throughout the Quill runtime
pub type QuillHasher = FxHasher;

/// The (ValueKey -> QValue) hashmap type used by the Quill runtime
///
/// Also used for class method tables and instance field maps.
pub type ValueMap = IndexMap<ValueKey, QValue, BuildHasherDefault<QuillHasher>>;

/// The Quill runtime's map storage
///
/// Keys are restricted to hashable values (see [ValueKey]); iteration order is an
/// implementation detail that scripts shouldn't rely on.
#[derive(Clone, Default)]
pub struct QMap {
    data: ValueMap,
}

impl QMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: ValueMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Creates a map initialized with the provided data
    pub fn with_data(data: ValueMap) -> Self {
        Self { data }
    }

    /// Provides a reference to the map's entries
    pub fn data(&self) -> &ValueMap {
        &self.data
    }

    /// Provides a mutable reference to the map's entries
    pub fn data_mut(&mut self) -> &mut ValueMap {
        &mut self.data
    }

    /// Inserts an entry into the map, replacing any existing entry with an equal key
    pub fn insert(&mut self, key: ValueKey, value: QValue) {
        self.data.insert(key, value);
    }

    /// Returns a clone of the value corresponding to the given key
    pub fn get(&self, key: &ValueKey) -> Option<QValue> {
        self.data.get(key).cloned()
    }

    /// Removes the entry with the given key, returning its value
    pub fn remove(&mut self, key: &ValueKey) -> Option<QValue> {
        self.data.shift_remove(key)
    }

    /// Returns true if the map contains the given key
    pub fn contains_key(&self, key: &ValueKey) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the number of entries in the map
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the map contains no entries
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<ValueMap> for QMap {
    fn from(value: ValueMap) -> Self {
        QMap::with_data(value)
    }
}
