use crate::{HeapId, QString, QValue, ValueMap};

/// A Quill class: a named method table with an optional constructor
///
/// The methods and the constructor are [QValue::Function] handles, built from the
/// program's function descriptors when the class's `MakeClass` operation executes.
#[derive(Clone)]
pub struct QClass {
    /// The class's name
    pub name: QString,
    /// The class's methods, keyed by method name
    pub methods: ValueMap,
    /// The constructor, run when the class is called
    pub constructor: Option<QValue>,
}

/// An instance of a [QClass]
#[derive(Clone)]
pub struct QInstance {
    /// The instance's class
    pub class: HeapId,
    /// The instance's fields, keyed by field name
    pub fields: ValueMap,
}

impl QInstance {
    /// Creates an instance of the given class with no fields set
    pub fn new(class: HeapId) -> Self {
        Self {
            class,
            fields: ValueMap::default(),
        }
    }
}
