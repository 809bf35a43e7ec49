//! The output abstraction used by the VM for program output and runtime warnings

mod capture;
mod stdio;

pub use self::{
    capture::OutputCapture,
    stdio::{DefaultStderr, DefaultStdout},
};

use crate::{QString, Result};

/// A trait for writable output streams used by the Quill runtime
pub trait QuillWrite {
    /// Writes bytes to the stream
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Writes text to the stream, followed by a newline
    fn write_line(&self, text: &str) -> Result<()>;

    /// Flushes any buffered output
    fn flush(&self) -> Result<()>;
}

/// A trait that represents an output file or stream for the Quill runtime
pub trait QuillFile: QuillWrite {
    /// An identifier for the file, used in debug output
    fn id(&self) -> QString;
}
