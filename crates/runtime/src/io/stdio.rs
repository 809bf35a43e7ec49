use crate::{ErrorKind, QString, QuillFile, QuillWrite, Result, runtime_error};
use std::io::{self, Write};

fn map_io_err<T>(error: io::Error) -> Result<T> {
    runtime_error!(ErrorKind::Internal(format!("io error: {error}")))
}

/// The process's stdout, used as the default program output stream
#[derive(Default)]
pub struct DefaultStdout {}

impl QuillFile for DefaultStdout {
    fn id(&self) -> QString {
        "_stdout_".into()
    }
}

impl QuillWrite for DefaultStdout {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        io::stdout()
            .write_all(bytes)
            .or_else(map_io_err)
    }

    fn write_line(&self, output: &str) -> Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.as_bytes())
            .and_then(|_| handle.write_all("\n".as_bytes()))
            .or_else(map_io_err)
    }

    fn flush(&self) -> Result<()> {
        io::stdout().flush().or_else(map_io_err)
    }
}

/// The process's stderr, used as the default stream for warnings and uncaught errors
#[derive(Default)]
pub struct DefaultStderr {}

impl QuillFile for DefaultStderr {
    fn id(&self) -> QString {
        "_stderr_".into()
    }
}

impl QuillWrite for DefaultStderr {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        io::stderr()
            .write_all(bytes)
            .or_else(map_io_err)
    }

    fn write_line(&self, output: &str) -> Result<()> {
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        handle
            .write_all(output.as_bytes())
            .and_then(|_| handle.write_all("\n".as_bytes()))
            .or_else(map_io_err)
    }

    fn flush(&self) -> Result<()> {
        io::stderr().flush().or_else(map_io_err)
    }
}
