use crate::{Heap, HeapId, QFunction, QValue};
use std::fmt::{self, Write};

/// A helper for converting Quill values to strings
///
/// A contained value might need to be displayed differently:
/// - Strings are displayed with quotes when they're inside a container.
/// - Containers check the parent list to avoid recursing into themselves.
#[derive(Default)]
pub struct DisplayContext {
    result: String,
    parent_containers: Vec<HeapId>,
}

impl DisplayContext {
    /// Returns the resulting string and consumes the context
    pub fn result(self) -> String {
        self.result
    }

    /// Returns true if the value being displayed is contained in another value
    fn is_contained(&self) -> bool {
        !self.parent_containers.is_empty()
    }

    fn is_in_parents(&self, id: HeapId) -> bool {
        self.parent_containers.contains(&id)
    }

    fn push_container(&mut self, id: HeapId) {
        self.parent_containers.push(id);
    }

    fn pop_container(&mut self) {
        self.parent_containers.pop();
    }
}

impl Write for DisplayContext {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.result.push_str(s);
        Ok(())
    }
}

impl Heap {
    /// Renders a value into the provided display context
    pub fn display_value(&self, ctx: &mut DisplayContext, value: &QValue) {
        use QValue::*;

        let _ = match value {
            Undefined => write!(ctx, "undefined"),
            Null => write!(ctx, "null"),
            Number(n) => write!(ctx, "{n}"),
            Str(s) => {
                if ctx.is_contained() {
                    write!(ctx, "\"{s}\"")
                } else {
                    write!(ctx, "{s}")
                }
            }
            List(id) => {
                let _ = write!(ctx, "[");
                if ctx.is_in_parents(*id) {
                    let _ = write!(ctx, "...");
                } else {
                    ctx.push_container(*id);
                    for (i, element) in self.list(*id).iter().enumerate() {
                        if i > 0 {
                            let _ = write!(ctx, ", ");
                        }
                        self.display_value(ctx, element);
                    }
                    ctx.pop_container();
                }
                write!(ctx, "]")
            }
            Map(id) => {
                let _ = write!(ctx, "{{");
                if ctx.is_in_parents(*id) {
                    let _ = write!(ctx, "...");
                } else {
                    ctx.push_container(*id);
                    for (i, (key, entry)) in self.map(*id).data().iter().enumerate() {
                        if i > 0 {
                            let _ = write!(ctx, ", ");
                        }
                        self.display_value(ctx, key.value());
                        let _ = write!(ctx, ": ");
                        self.display_value(ctx, entry);
                    }
                    ctx.pop_container();
                }
                write!(ctx, "}}")
            }
            Set(id) => {
                let _ = write!(ctx, "{{");
                ctx.push_container(*id);
                for (i, element) in self.set(*id).data().iter().enumerate() {
                    if i > 0 {
                        let _ = write!(ctx, ", ");
                    }
                    self.display_value(ctx, element.value());
                }
                ctx.pop_container();
                write!(ctx, "}}")
            }
            Function(id) => match self.function(*id) {
                QFunction::Scripted(_) => write!(ctx, "function@{id}"),
                QFunction::Native(native) => write!(ctx, "builtin: {}", native.name),
            },
            Class(id) => write!(ctx, "class {}", self.class(*id).name),
            Instance(id) => {
                let class = self.instance(*id).class;
                write!(ctx, "{}@{id}", self.class(class).name)
            }
        };
    }

    /// Converts a value to its display string
    pub fn value_to_string(&self, value: &QValue) -> String {
        let mut ctx = DisplayContext::default();
        self.display_value(&mut ctx, value);
        ctx.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeapData, QList, QSet, ValueKey};

    #[test]
    fn strings_are_quoted_inside_containers_only() {
        let mut heap = Heap::default();
        let list = heap
            .allocate(HeapData::List(QList::from_slice(&[
                QValue::from(1),
                QValue::from("x"),
                QValue::Null,
            ])))
            .unwrap();

        assert_eq!(heap.value_to_string(&QValue::from("x")), "x");
        assert_eq!(
            heap.value_to_string(&QValue::List(list)),
            r#"[1, "x", null]"#
        );
    }

    #[test]
    fn cyclic_lists_display_without_recursing() {
        let mut heap = Heap::default();
        let list = heap.allocate(HeapData::List(QList::new())).unwrap();
        heap.list_mut(list).push(QValue::List(list));

        assert_eq!(heap.value_to_string(&QValue::List(list)), "[[...]]");
    }

    #[test]
    fn sets_display_their_elements() {
        let mut heap = Heap::default();
        let mut set = QSet::new();
        set.insert(ValueKey::from(1));
        set.insert(ValueKey::from(2));
        let set = heap.allocate(HeapData::Set(set)).unwrap();

        assert_eq!(heap.value_to_string(&QValue::Set(set)), "{1, 2}");
    }
}
