//! The core value type used in the Quill runtime

use crate::{HeapId, QNumber, QString};
use std::fmt;

/// The core Value type for Quill
///
/// Scalar kinds carry their data inline; container kinds carry a non-owning
/// [HeapId] handle into the garbage collector's registry, which is the sole owner of
/// every heap payload.
#[derive(Clone, Default)]
pub enum QValue {
    /// The default type representing the absence of a value
    #[default]
    Undefined,

    /// An explicit null value
    Null,

    /// A number, represented as either a signed 64 bit integer or float
    Number(QNumber),

    /// An immutable string
    Str(QString),

    /// A handle to a list on the heap
    List(HeapId),

    /// A handle to a map on the heap
    Map(HeapId),

    /// A handle to a set on the heap
    Set(HeapId),

    /// A handle to a scripted or builtin function on the heap
    Function(HeapId),

    /// A handle to a class on the heap
    Class(HeapId),

    /// A handle to a class instance on the heap
    Instance(HeapId),
}

impl QValue {
    /// Returns true if the value is hashable
    ///
    /// Only hashable values are acceptable as map keys and set elements.
    pub fn is_hashable(&self) -> bool {
        use QValue::*;
        matches!(self, Undefined | Null | Number(_) | Str(_))
    }

    /// Returns the value's heap handle if it's a container kind
    pub fn heap_id(&self) -> Option<HeapId> {
        use QValue::*;
        match self {
            List(id) | Map(id) | Set(id) | Function(id) | Class(id) | Instance(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the value's type as a [QString]
    pub fn type_as_string(&self) -> QString {
        use QValue::*;
        match &self {
            Undefined => TYPE_UNDEFINED.with(|x| x.clone()),
            Null => TYPE_NULL.with(|x| x.clone()),
            Number(_) => TYPE_NUMBER.with(|x| x.clone()),
            Str(_) => TYPE_STRING.with(|x| x.clone()),
            List(_) => TYPE_LIST.with(|x| x.clone()),
            Map(_) => TYPE_MAP.with(|x| x.clone()),
            Set(_) => TYPE_SET.with(|x| x.clone()),
            Function(_) => TYPE_FUNCTION.with(|x| x.clone()),
            Class(_) => TYPE_CLASS.with(|x| x.clone()),
            Instance(_) => TYPE_INSTANCE.with(|x| x.clone()),
        }
    }
}

thread_local! {
    static TYPE_UNDEFINED: QString = "undefined".into();
    static TYPE_NULL: QString = "null".into();
    static TYPE_NUMBER: QString = "number".into();
    static TYPE_STRING: QString = "string".into();
    static TYPE_LIST: QString = "list".into();
    static TYPE_MAP: QString = "map".into();
    static TYPE_SET: QString = "set".into();
    static TYPE_FUNCTION: QString = "function".into();
    static TYPE_CLASS: QString = "class".into();
    static TYPE_INSTANCE: QString = "instance".into();
}

impl fmt::Debug for QValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QValue::Number(n) => write!(f, "{n:?}"),
            QValue::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "{}", other.type_as_string()),
        }
    }
}

impl From<QNumber> for QValue {
    fn from(value: QNumber) -> Self {
        Self::Number(value)
    }
}

impl From<QString> for QValue {
    fn from(value: QString) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for QValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for QValue {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

/// Quill has no boolean kind; truthiness converts to Number(1) or Number(0)
impl From<bool> for QValue {
    fn from(value: bool) -> Self {
        Self::Number(QNumber::I64(value as i64))
    }
}
