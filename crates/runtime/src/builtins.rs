//! The builtin functions available to every Quill program

use crate::{NativeFunction, QValue, QuillWrite};
use rustc_hash::FxHashMap;

/// Builds the table of builtin functions installed when a VM is prepared
///
/// All builtins are variadic; `typeof` checks its own argument count so that misuse
/// produces a warning instead of an error.
pub(crate) fn make_builtins() -> FxHashMap<&'static str, NativeFunction> {
    let mut result = FxHashMap::default();

    result.insert(
        "print",
        NativeFunction::new("print", None, |ctx| {
            let args = ctx.args;
            for value in args {
                let text = ctx.vm.value_to_display_string(value);
                ctx.vm.stdout().write(format!("{text} ").as_bytes())?;
            }
            Ok(QValue::Undefined)
        }),
    );

    result.insert(
        "println",
        NativeFunction::new("println", None, |ctx| {
            let args = ctx.args;
            for value in args {
                let text = ctx.vm.value_to_display_string(value);
                ctx.vm.stdout().write(format!("{text} ").as_bytes())?;
            }
            ctx.vm.stdout().write("\n".as_bytes())?;
            Ok(QValue::Undefined)
        }),
    );

    result.insert(
        "string",
        NativeFunction::new("string", None, |ctx| {
            let args = ctx.args;
            let mut result = String::new();
            for value in args {
                result.push_str(&ctx.vm.value_to_display_string(value));
            }
            Ok(result.into())
        }),
    );

    result.insert(
        "typeof",
        NativeFunction::new("typeof", None, |ctx| match ctx.args {
            [single] => Ok(single.type_as_string().into()),
            args => {
                ctx.vm.warn(&format!(
                    "typeof expects a single argument, found {}",
                    args.len()
                ));
                Ok(QValue::Undefined)
            }
        }),
    );

    result
}
