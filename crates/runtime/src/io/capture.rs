use crate::{QString, QuillFile, QuillVm, QuillVmSettings, QuillWrite, Result};
use std::{cell::RefCell, rc::Rc};

/// Captures output from Quill in a String
///
/// [QuillWrite] is implemented for OutputCapture, allowing it to be used as stdout and
/// stderr for the Quill runtime. Used by embedders and the runtime's own tests.
#[derive(Clone, Default)]
pub struct OutputCapture {
    output: Rc<RefCell<String>>,
}

impl OutputCapture {
    /// Returns a [QuillVm] with `stdout` and `stderr` captured by an instance of
    /// [OutputCapture]
    pub fn make_vm_with_output_capture() -> (QuillVm, Self) {
        let output_capture = Self::default();

        let vm = QuillVm::with_settings(QuillVmSettings {
            stdout: Rc::new(output_capture.clone()),
            stderr: Rc::new(output_capture.clone()),
            ..Default::default()
        });

        (vm, output_capture)
    }

    /// Clears the captured output
    pub fn clear(&mut self) {
        self.output.borrow_mut().clear();
    }

    /// Returns the currently captured output
    pub fn captured_output(&self) -> String {
        self.output.borrow().clone()
    }
}

impl QuillFile for OutputCapture {
    fn id(&self) -> QString {
        "_output_capture_".into()
    }
}

impl QuillWrite for OutputCapture {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        let bytes_str = match std::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                return crate::error::type_error(format!("invalid utf-8 written to capture: {e}"));
            }
        };
        self.output.borrow_mut().push_str(bytes_str);
        Ok(())
    }

    fn write_line(&self, output: &str) -> Result<()> {
        let mut unlocked = self.output.borrow_mut();
        unlocked.push_str(output);
        unlocked.push('\n');
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
