//! A collection of useful items to make it easier to work with `quill_runtime`

#[doc(inline)]
pub use crate::{
    CallContext, DisplayContext, Error, ErrorKind, ExecutionState, Heap, HeapData, HeapId,
    NativeFunction, OutputCapture, QClass, QFunction, QInstance, QList, QMap, QNumber, QSet,
    QString, QValue, QuillFile, QuillHasher, QuillVm, QuillVmSettings, QuillWrite, Result,
    ScriptedFunction, Upvalue, ValueKey, ValueMap, ValueSet, runtime_error,
};
