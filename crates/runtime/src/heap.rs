//! The garbage collector's registry of heap-allocated runtime values

use crate::{
    ErrorKind, QClass, QFunction, QInstance, QList, QMap, QSet, QValue, Result, runtime_error,
};
use std::fmt;

/// The default number of live objects that triggers a collection
pub const DEFAULT_GC_THRESHOLD: usize = 512;

/// The default ceiling on the number of live objects
pub const DEFAULT_HEAP_LIMIT: usize = 1 << 20;

/// A non-owning handle to a value in the [Heap]'s registry
///
/// Handles stay valid for as long as the value is reachable from the VM's roots; the
/// sweep phase is the single point where a handle's payload is dropped.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(u32);

impl HeapId {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapId({})", self.0)
    }
}

/// The payload of a registered heap value
#[allow(missing_docs)]
pub enum HeapData {
    List(QList),
    Map(QMap),
    Set(QSet),
    Function(QFunction),
    Class(QClass),
    Instance(QInstance),
}

// A registry slot: the payload plus the mark bit used during collection
struct Slot {
    data: HeapData,
    marked: bool,
}

/// The registry that owns every heap-allocated runtime value
///
/// Collection is precise, non-moving, stop-the-world mark-sweep. All other holders of
/// heap values (the operand stack, frames, upvalues, other containers) hold non-owning
/// [HeapId] handles, so reference cycles between containers don't keep anything alive.
pub struct Heap {
    slots: Vec<Option<Slot>>,
    free_list: Vec<u32>,
    live_count: usize,
    // The live count that triggers the next collection; recomputed after each sweep
    threshold: usize,
    base_threshold: usize,
    limit: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::with_limits(DEFAULT_GC_THRESHOLD, DEFAULT_HEAP_LIMIT)
    }
}

impl Heap {
    /// Creates a heap with the given collection threshold and object-count ceiling
    pub fn with_limits(threshold: usize, limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live_count: 0,
            threshold,
            base_threshold: threshold,
            limit,
        }
    }

    /// Registers a value with the heap, returning its handle
    ///
    /// Registration is the single entry point for creating heap values; a value that
    /// was never registered can't be reached by the interpreter.
    pub fn allocate(&mut self, data: HeapData) -> Result<HeapId> {
        if self.live_count >= self.limit {
            return runtime_error!(ErrorKind::Allocation(format!(
                "the heap limit of {} objects has been reached",
                self.limit
            )));
        }

        let slot = Slot {
            data,
            marked: false,
        };

        let id = match self.free_list.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(slot);
                HeapId::new(index)
            }
            None => {
                self.slots.push(Some(slot));
                HeapId::new((self.slots.len() - 1) as u32)
            }
        };

        self.live_count += 1;
        Ok(id)
    }

    /// The number of values currently registered
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Returns true if the live count has crossed the collection threshold
    pub fn should_collect(&self) -> bool {
        self.live_count >= self.threshold
    }

    fn slot(&self, id: HeapId) -> &Slot {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .expect("Dangling heap id")
    }

    fn slot_mut(&mut self, id: HeapId) -> &mut Slot {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .expect("Dangling heap id")
    }

    /// Provides a reference to a registered value's payload
    pub fn data(&self, id: HeapId) -> &HeapData {
        &self.slot(id).data
    }

    /// Provides a mutable reference to a registered value's payload
    pub fn data_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self.slot_mut(id).data
    }

    /// Provides a reference to a registered list
    pub fn list(&self, id: HeapId) -> &QList {
        match self.data(id) {
            HeapData::List(list) => list,
            _ => panic!("Expected a list"),
        }
    }

    /// Provides a mutable reference to a registered list
    pub fn list_mut(&mut self, id: HeapId) -> &mut QList {
        match self.data_mut(id) {
            HeapData::List(list) => list,
            _ => panic!("Expected a list"),
        }
    }

    /// Provides a reference to a registered map
    pub fn map(&self, id: HeapId) -> &QMap {
        match self.data(id) {
            HeapData::Map(map) => map,
            _ => panic!("Expected a map"),
        }
    }

    /// Provides a mutable reference to a registered map
    pub fn map_mut(&mut self, id: HeapId) -> &mut QMap {
        match self.data_mut(id) {
            HeapData::Map(map) => map,
            _ => panic!("Expected a map"),
        }
    }

    /// Provides a reference to a registered set
    pub fn set(&self, id: HeapId) -> &QSet {
        match self.data(id) {
            HeapData::Set(set) => set,
            _ => panic!("Expected a set"),
        }
    }

    /// Provides a mutable reference to a registered set
    pub fn set_mut(&mut self, id: HeapId) -> &mut QSet {
        match self.data_mut(id) {
            HeapData::Set(set) => set,
            _ => panic!("Expected a set"),
        }
    }

    /// Provides a reference to a registered function
    pub fn function(&self, id: HeapId) -> &QFunction {
        match self.data(id) {
            HeapData::Function(function) => function,
            _ => panic!("Expected a function"),
        }
    }

    /// Provides a reference to a registered class
    pub fn class(&self, id: HeapId) -> &QClass {
        match self.data(id) {
            HeapData::Class(class) => class,
            _ => panic!("Expected a class"),
        }
    }

    /// Provides a reference to a registered instance
    pub fn instance(&self, id: HeapId) -> &QInstance {
        match self.data(id) {
            HeapData::Instance(instance) => instance,
            _ => panic!("Expected an instance"),
        }
    }

    /// Provides a mutable reference to a registered instance
    pub fn instance_mut(&mut self, id: HeapId) -> &mut QInstance {
        match self.data_mut(id) {
            HeapData::Instance(instance) => instance,
            _ => panic!("Expected an instance"),
        }
    }

    /// Runs a full collection cycle over the given roots, returning the number of
    /// values that were freed
    pub fn collect(&mut self, roots: &[HeapId]) -> usize {
        self.mark(roots);
        let freed = self.sweep();
        self.threshold = (self.live_count * 2).max(self.base_threshold);
        freed
    }

    /// Drops every registered value, used at VM teardown
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.live_count = 0;
        self.threshold = self.base_threshold;
    }

    // The mark phase: traverses the reference graph from the roots, setting each
    // reached value's mark bit. The explicit worklist keeps deeply nested (and cyclic)
    // structures from recursing; the mark bit makes re-entry a no-op.
    fn mark(&mut self, roots: &[HeapId]) {
        let mut worklist: Vec<HeapId> = roots.to_vec();

        while let Some(id) = worklist.pop() {
            let slot = self.slot_mut(id);
            if slot.marked {
                continue;
            }
            slot.marked = true;
            push_refs(&slot.data, &mut worklist);
        }
    }

    // The sweep phase: every unmarked slot is dropped and recycled, every marked slot
    // is cleared for the next cycle
    fn sweep(&mut self) -> usize {
        let mut freed = 0;

        for (index, entry) in self.slots.iter_mut().enumerate() {
            match entry {
                Some(slot) if slot.marked => slot.marked = false,
                Some(_) => {
                    *entry = None;
                    self.free_list.push(index as u32);
                    freed += 1;
                }
                None => {}
            }
        }

        self.live_count -= freed;
        freed
    }

    /// Returns true if two values are structurally equal
    ///
    /// Lists compare pointwise, maps by key set and value equality, sets by mutual
    /// containment; functions, classes and instances compare by identity.
    pub fn values_equal(&self, a: &QValue, b: &QValue) -> bool {
        use QValue::*;

        match (a, b) {
            (Undefined, Undefined) => true,
            (Null, Null) => true,
            (Number(a), Number(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => {
                if a == b {
                    return true;
                }
                let (a, b) = (self.list(*a), self.list(*b));
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(a, b)| self.values_equal(a, b))
            }
            (Map(a), Map(b)) => {
                if a == b {
                    return true;
                }
                let (a, b) = (self.map(*a), self.map(*b));
                a.len() == b.len()
                    && a.data().iter().all(|(key, value)| {
                        b.data()
                            .get(key)
                            .is_some_and(|other| self.values_equal(value, other))
                    })
            }
            (Set(a), Set(b)) => a == b || self.set(*a).data() == self.set(*b).data(),
            (Function(a), Function(b)) => a == b,
            (Class(a), Class(b)) => a == b,
            (Instance(a), Instance(b)) => a == b,
            _ => false,
        }
    }

    /// Converts a value to 0/1 for branching and the logical operators
    ///
    /// Null, Undefined, zero, and empty strings/containers are falsey; everything else
    /// is truthy.
    pub fn is_truthy(&self, value: &QValue) -> bool {
        use QValue::*;

        match value {
            Undefined | Null => false,
            Number(n) => !n.is_zero(),
            Str(s) => !s.is_empty(),
            List(id) => !self.list(*id).is_empty(),
            Map(id) => !self.map(*id).is_empty(),
            Set(id) => !self.set(*id).is_empty(),
            Function(_) | Class(_) | Instance(_) => true,
        }
    }

    /// Returns a copy of the value that shares contained values with the original
    ///
    /// Scalars copy trivially; containers get a fresh allocation holding the same
    /// element handles. Functions and classes are immutable once made, so the handle
    /// itself is the copy.
    pub fn shallow_copy(&mut self, value: &QValue) -> Result<QValue> {
        let result = match value {
            QValue::List(id) => {
                let data = self.list(*id).data().to_vec();
                QValue::List(self.allocate(HeapData::List(QList::from_vec(data)))?)
            }
            QValue::Map(id) => {
                let data = self.map(*id).clone();
                QValue::Map(self.allocate(HeapData::Map(data))?)
            }
            QValue::Set(id) => {
                let data = self.set(*id).clone();
                QValue::Set(self.allocate(HeapData::Set(data))?)
            }
            QValue::Instance(id) => {
                let data = self.instance(*id).clone();
                QValue::Instance(self.allocate(HeapData::Instance(data))?)
            }
            other => other.clone(),
        };
        Ok(result)
    }

    /// Returns a recursive copy of the value
    ///
    /// The copy compares equal to the original under structural equality while sharing
    /// no mutable state with it.
    pub fn deep_copy(&mut self, value: &QValue) -> Result<QValue> {
        let result = match value {
            QValue::List(id) => {
                let elements = self.list(*id).data().to_vec();
                let mut copied = Vec::with_capacity(elements.len());
                for element in &elements {
                    copied.push(self.deep_copy(element)?);
                }
                QValue::List(self.allocate(HeapData::List(QList::from_vec(copied)))?)
            }
            QValue::Map(id) => {
                let entries: Vec<_> = self
                    .map(*id)
                    .data()
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                let mut copied = QMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.deep_copy(&value)?;
                    copied.insert(key, value);
                }
                QValue::Map(self.allocate(HeapData::Map(copied))?)
            }
            QValue::Set(id) => {
                // Set elements are scalars, so a shallow clone of the data is deep
                let data = self.set(*id).clone();
                QValue::Set(self.allocate(HeapData::Set(data))?)
            }
            QValue::Instance(id) => {
                let instance = self.instance(*id).clone();
                let mut fields = crate::ValueMap::default();
                for (key, value) in instance.fields.iter() {
                    let value = self.deep_copy(value)?;
                    fields.insert(key.clone(), value);
                }
                QValue::Instance(self.allocate(HeapData::Instance(QInstance {
                    class: instance.class,
                    fields,
                }))?)
            }
            other => other.clone(),
        };
        Ok(result)
    }
}

// Enumerates the heap handles referenced by a payload, used by the mark phase.
//
// Map keys and set elements are hashable scalars, so only map values need tracing.
// A scripted function's captured cells are read through their RefCells; no borrows are
// held across instructions, so the cells are always readable at a safe point.
fn push_refs(data: &HeapData, worklist: &mut Vec<HeapId>) {
    let mut note = |value: &QValue| {
        if let Some(id) = value.heap_id() {
            worklist.push(id);
        }
    };

    match data {
        HeapData::List(list) => list.iter().for_each(&mut note),
        HeapData::Map(map) => map.data().values().for_each(&mut note),
        HeapData::Set(_) => {}
        HeapData::Function(QFunction::Scripted(function)) => {
            for cell in &function.upvalues {
                note(&cell.borrow());
            }
        }
        HeapData::Function(QFunction::Native(_)) => {}
        HeapData::Class(class) => {
            class.methods.values().for_each(&mut note);
            if let Some(constructor) = &class.constructor {
                note(constructor);
            }
        }
        HeapData::Instance(instance) => {
            instance.fields.values().for_each(&mut note);
            worklist.push(instance.class);
        }
    }
}
