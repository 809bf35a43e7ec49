use crate::QValue;
use std::{error, fmt};
use thiserror::Error;

/// The different error kinds that can be raised by the Quill runtime
///
/// Every kind except [Allocation](ErrorKind::Allocation) and
/// [Internal](ErrorKind::Internal) can be caught by an installed `try` handler.
#[derive(Error, Clone, Debug)]
#[allow(missing_docs)]
pub enum ErrorKind {
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ArithError: {0}")]
    Arith(String),
    #[error("IndexError: {0}")]
    Index(String),
    #[error("KeyError: {0}")]
    Key(String),
    #[error("AttributeError: {0}")]
    Attribute(String),
    #[error("ArityError: {0}")]
    Arity(String),
    #[error("StackOverflow: {0}")]
    StackOverflow(String),
    #[error("NameError: {0}")]
    Name(String),
    #[error("AllocationError: {0}")]
    Allocation(String),
    /// A value raised by the program itself, stringified when the raise executed
    #[error("RuntimeError: {0}")]
    Raised(String),
    /// A violated internal invariant; always fatal
    #[error("InternalError: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// Returns true if no handler is allowed to catch this kind of error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Allocation(_) | Self::Internal(_))
    }
}

/// An error raised by the Quill runtime
#[derive(Clone, Debug)]
pub struct Error {
    pub(crate) kind: ErrorKind,
}

impl Error {
    /// Initializes an error with the given error kind
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// The kind of the error
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if no handler is allowed to catch the error
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// The Result type used by the Quill runtime
pub type Result<T> = std::result::Result<T, Error>;

/// Creates a [crate::Error] from an [ErrorKind], wrapped in `Err`
///
/// Wrapping the result in `Err` is a convenience for functions that need to return
/// immediately when an error has occurred.
#[macro_export]
macro_rules! runtime_error {
    ($kind:expr) => {
        Err($crate::Error::from($kind))
    };
}

/// Creates a *TypeError* wrapped in `Err`
pub fn type_error<T>(message: impl Into<String>) -> Result<T> {
    runtime_error!(ErrorKind::Type(message.into()))
}

/// Creates an *ArithError* wrapped in `Err`
pub fn arith_error<T>(message: impl Into<String>) -> Result<T> {
    runtime_error!(ErrorKind::Arith(message.into()))
}

/// Creates an *IndexError* wrapped in `Err`
pub fn index_error<T>(message: impl Into<String>) -> Result<T> {
    runtime_error!(ErrorKind::Index(message.into()))
}

/// Creates a *KeyError* wrapped in `Err`
pub fn key_error<T>(message: impl Into<String>) -> Result<T> {
    runtime_error!(ErrorKind::Key(message.into()))
}

/// Creates an *AttributeError* wrapped in `Err`
pub fn attribute_error<T>(message: impl Into<String>) -> Result<T> {
    runtime_error!(ErrorKind::Attribute(message.into()))
}

/// Creates an *ArityError* wrapped in `Err`
pub fn arity_error<T>(message: impl Into<String>) -> Result<T> {
    runtime_error!(ErrorKind::Arity(message.into()))
}

/// Creates a *NameError* wrapped in `Err`
pub fn name_error<T>(message: impl Into<String>) -> Result<T> {
    runtime_error!(ErrorKind::Name(message.into()))
}

/// Creates an error that describes a type mismatch
pub fn unexpected_type<T>(expected: &str, unexpected: &QValue) -> Result<T> {
    type_error(format!(
        "expected {expected}, found '{}'",
        unexpected.type_as_string()
    ))
}
