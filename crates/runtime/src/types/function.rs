use crate::{QValue, QuillVm, Result};
use std::{cell::RefCell, fmt, rc::Rc};

/// A captured variable cell, shared between a closure and its defining scope
///
/// Mutation through either side is visible to the other; this is what gives closures
/// their by-reference capture semantics.
pub type Upvalue = Rc<RefCell<QValue>>;

/// A Quill function, either scripted or implemented natively by the host
#[derive(Clone)]
pub enum QFunction {
    /// A function defined in bytecode by the running program
    Scripted(ScriptedFunction),
    /// A function implemented outside of the Quill runtime
    Native(NativeFunction),
}

/// A function built from one of the program's function descriptors
#[derive(Clone)]
pub struct ScriptedFunction {
    /// The index of the function's descriptor in the program
    pub function: u32,
    /// The captured cells, one per free variable listed in the descriptor
    pub upvalues: Vec<Upvalue>,
}

/// A trait for native functions exposed to Quill programs
pub trait QuillNativeFn: Fn(&mut CallContext) -> Result<QValue> + 'static {}

impl<T> QuillNativeFn for T where T: Fn(&mut CallContext) -> Result<QValue> + 'static {}

/// A function that's implemented outside of the Quill runtime
///
/// See [QFunction::Native]
#[derive(Clone)]
pub struct NativeFunction {
    /// The function's name, used in arity errors and debug output
    pub name: &'static str,
    /// The expected number of arguments; `None` means the function is variadic
    pub arity: Option<u8>,
    /// The implementation that's called when the function is invoked
    pub function: Rc<dyn QuillNativeFn>,
}

impl NativeFunction {
    /// Creates a new native function
    pub fn new(name: &'static str, arity: Option<u8>, function: impl QuillNativeFn) -> Self {
        Self {
            name,
            arity,
            function: Rc::new(function),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "builtin function: {}", self.name)
    }
}

/// The context provided when a call to a [NativeFunction] is made
///
/// The VM can be used for operations that need the heap or the configured output
/// handles, e.g. stringifying arguments or allocating result containers.
pub struct CallContext<'a> {
    /// The VM making the call
    pub vm: &'a mut QuillVm,
    /// The function call's arguments
    pub args: &'a [QValue],
}

impl<'a> CallContext<'a> {
    /// Returns a new context for calling native functions
    pub fn new(vm: &'a mut QuillVm, args: &'a [QValue]) -> Self {
        Self { vm, args }
    }
}
