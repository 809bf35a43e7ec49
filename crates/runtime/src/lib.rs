//! Contains the runtime and builtins for the Quill language
//!
//! The compiler collaborator hands the runtime a [Program](quill_bytecode::Program);
//! [QuillVm] executes it on a stack-based dispatch loop, with every heap-allocated
//! runtime value owned by a mark-sweep [Heap] registry.

#![warn(missing_docs)]

mod attrs;
mod builtins;
mod display_context;
mod error;
mod heap;
mod io;
mod operators;
mod types;
mod vm;

pub mod prelude;

pub use crate::{
    display_context::DisplayContext,
    error::{
        Error, ErrorKind, Result, arith_error, arity_error, attribute_error, index_error,
        key_error, name_error, type_error, unexpected_type,
    },
    heap::{DEFAULT_GC_THRESHOLD, DEFAULT_HEAP_LIMIT, Heap, HeapData, HeapId},
    io::{DefaultStderr, DefaultStdout, OutputCapture, QuillFile, QuillWrite},
    types::{
        CallContext, LIST_MIN_RESERVE, NativeFunction, QClass, QFunction, QInstance, QList, QMap,
        QNumber, QSet, QString, QValue, QuillHasher, QuillNativeFn, ScriptedFunction, Upvalue,
        ValueKey, ValueMap, ValueSet,
    },
    vm::{ExecutionState, QuillVm, QuillVmSettings},
};
