//! The builtin attribute surface of the container types
//!
//! Instance attribute calls resolve through class method tables in the VM; everything
//! else lands here, where the attribute name selects a builtin operation on the
//! target's kind.

use crate::{
    HeapData, QList, QValue, QuillVm, Result, ValueKey,
    error::{arity_error, attribute_error, index_error, type_error, unexpected_type},
};

/// Calls a builtin attribute on a non-instance target, returning the result value
pub(crate) fn call_builtin_attr(
    vm: &mut QuillVm,
    target: &QValue,
    name: &str,
    args: &[QValue],
) -> Result<QValue> {
    match target {
        QValue::List(_) => call_list_attr(vm, target, name, args),
        QValue::Map(_) => call_map_attr(vm, target, name, args),
        QValue::Set(_) => call_set_attr(vm, target, name, args),
        QValue::Str(_) => call_string_attr(vm, target, name, args),
        unexpected => attribute_error(format!(
            "a value of type '{}' has no attribute '{name}'",
            unexpected.type_as_string()
        )),
    }
}

fn call_list_attr(
    vm: &mut QuillVm,
    target: &QValue,
    name: &str,
    args: &[QValue],
) -> Result<QValue> {
    let QValue::List(id) = target else {
        unreachable!()
    };
    let id = *id;

    match name {
        "append" => {
            check_arity(name, 1, args)?;
            vm.heap.list_mut(id).push(args[0].clone());
            Ok(target.clone())
        }
        "popLast" => {
            check_arity(name, 0, args)?;
            match vm.heap.list_mut(id).pop_last() {
                Some(value) => Ok(value),
                None => index_error("popLast called on an empty list"),
            }
        }
        "popFirst" => {
            check_arity(name, 0, args)?;
            match vm.heap.list_mut(id).pop_first() {
                Some(value) => Ok(value),
                None => index_error("popFirst called on an empty list"),
            }
        }
        "removeAt" => {
            check_arity(name, 1, args)?;
            let index = integer_arg(name, &args[0])?;
            let len = vm.heap.list(id).len();
            let index = usize::try_from(index).ok().filter(|i| *i < len);
            match index.and_then(|i| vm.heap.list_mut(id).remove_at(i)) {
                Some(value) => Ok(value),
                None => index_error(format!("removeAt index is out of range for a list of length {len}")),
            }
        }
        "remove" => {
            check_arity(name, 1, args)?;
            let heap = &vm.heap;
            let position = heap
                .list(id)
                .iter()
                .position(|element| heap.values_equal(element, &args[0]));
            match position {
                Some(i) => Ok(vm
                    .heap
                    .list_mut(id)
                    .remove_at(i)
                    .unwrap_or(QValue::Undefined)),
                None => Ok(QValue::Undefined),
            }
        }
        "contains" => {
            check_arity(name, 1, args)?;
            let heap = &vm.heap;
            let result = heap
                .list(id)
                .iter()
                .any(|element| heap.values_equal(element, &args[0]));
            Ok(result.into())
        }
        "reverse" => {
            check_arity(name, 0, args)?;
            vm.heap.list_mut(id).reverse();
            Ok(target.clone())
        }
        "copy" => {
            check_arity(name, 0, args)?;
            vm.heap.shallow_copy(target)
        }
        "deepCopy" => {
            check_arity(name, 0, args)?;
            vm.heap.deep_copy(target)
        }
        "length" => {
            check_arity(name, 0, args)?;
            Ok(vm.heap.list(id).len().into())
        }
        _ => unknown_attr(target, name),
    }
}

fn call_map_attr(vm: &mut QuillVm, target: &QValue, name: &str, args: &[QValue]) -> Result<QValue> {
    let QValue::Map(id) = target else {
        unreachable!()
    };
    let id = *id;

    match name {
        "get" => {
            check_arity(name, 1, args)?;
            let key = ValueKey::try_from(args[0].clone())?;
            Ok(vm.heap.map(id).get(&key).unwrap_or(QValue::Undefined))
        }
        "set" => {
            check_arity(name, 2, args)?;
            let key = ValueKey::try_from(args[0].clone())?;
            vm.heap.map_mut(id).insert(key, args[1].clone());
            Ok(target.clone())
        }
        "delete" => {
            check_arity(name, 1, args)?;
            let key = ValueKey::try_from(args[0].clone())?;
            match vm.heap.map_mut(id).remove(&key) {
                Some(value) => Ok(value),
                None => crate::error::key_error(format!("key '{key}' not found in map")),
            }
        }
        "contains" => {
            check_arity(name, 1, args)?;
            let key = ValueKey::try_from(args[0].clone())?;
            Ok(vm.heap.map(id).contains_key(&key).into())
        }
        "size" => {
            check_arity(name, 0, args)?;
            Ok(vm.heap.map(id).len().into())
        }
        "keys" => {
            check_arity(name, 0, args)?;
            let keys: Vec<QValue> = vm
                .heap
                .map(id)
                .data()
                .keys()
                .map(|key| key.value().clone())
                .collect();
            let id = vm.heap.allocate(HeapData::List(QList::from_vec(keys)))?;
            Ok(QValue::List(id))
        }
        "values" => {
            check_arity(name, 0, args)?;
            let values: Vec<QValue> = vm.heap.map(id).data().values().cloned().collect();
            let id = vm.heap.allocate(HeapData::List(QList::from_vec(values)))?;
            Ok(QValue::List(id))
        }
        _ => unknown_attr(target, name),
    }
}

fn call_set_attr(vm: &mut QuillVm, target: &QValue, name: &str, args: &[QValue]) -> Result<QValue> {
    let QValue::Set(id) = target else {
        unreachable!()
    };
    let id = *id;

    match name {
        "add" => {
            check_arity(name, 1, args)?;
            // Adding a set to itself is a no-op with a warning rather than an error
            if matches!(&args[0], QValue::Set(other) if *other == id) {
                vm.warn("cannot add a set to itself");
                return Ok(target.clone());
            }
            let key = ValueKey::try_from(args[0].clone())?;
            vm.heap.set_mut(id).insert(key);
            Ok(target.clone())
        }
        "remove" => {
            check_arity(name, 1, args)?;
            let key = ValueKey::try_from(args[0].clone())?;
            vm.heap.set_mut(id).remove(&key);
            Ok(target.clone())
        }
        "contains" => {
            check_arity(name, 1, args)?;
            let key = ValueKey::try_from(args[0].clone())?;
            Ok(vm.heap.set(id).contains(&key).into())
        }
        "clear" => {
            check_arity(name, 0, args)?;
            vm.heap.set_mut(id).clear();
            Ok(target.clone())
        }
        "toList" => {
            check_arity(name, 0, args)?;
            let elements: Vec<QValue> = vm
                .heap
                .set(id)
                .data()
                .iter()
                .map(|element| element.value().clone())
                .collect();
            let id = vm
                .heap
                .allocate(HeapData::List(QList::from_vec(elements)))?;
            Ok(QValue::List(id))
        }
        "union" => {
            check_arity(name, 1, args)?;
            let QValue::Set(other) = &args[0] else {
                return unexpected_type("a set as the union argument", &args[0]);
            };
            let result = vm.heap.set(id).union(vm.heap.set(*other));
            let id = vm.heap.allocate(HeapData::Set(result))?;
            Ok(QValue::Set(id))
        }
        "intersection" => {
            check_arity(name, 1, args)?;
            let QValue::Set(other) = &args[0] else {
                return unexpected_type("a set as the intersection argument", &args[0]);
            };
            let result = vm.heap.set(id).intersection(vm.heap.set(*other));
            let id = vm.heap.allocate(HeapData::Set(result))?;
            Ok(QValue::Set(id))
        }
        "size" => {
            check_arity(name, 0, args)?;
            Ok(vm.heap.set(id).len().into())
        }
        _ => unknown_attr(target, name),
    }
}

fn call_string_attr(
    _vm: &mut QuillVm,
    target: &QValue,
    name: &str,
    args: &[QValue],
) -> Result<QValue> {
    let QValue::Str(s) = target else {
        unreachable!()
    };

    match name {
        "length" => {
            check_arity(name, 0, args)?;
            Ok(s.grapheme_count().into())
        }
        _ => unknown_attr(target, name),
    }
}

fn check_arity(name: &str, expected: usize, args: &[QValue]) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        arity_error(format!(
            "{name} expects {expected} argument(s), found {}",
            args.len()
        ))
    }
}

fn integer_arg(name: &str, arg: &QValue) -> Result<i64> {
    match arg {
        QValue::Number(n) => match n.as_integer() {
            Some(i) => Ok(i),
            None => type_error(format!("{name} expects an integer argument, found {n}")),
        },
        unexpected => unexpected_type(&format!("an integer argument for {name}"), unexpected),
    }
}

fn unknown_attr<T>(target: &QValue, name: &str) -> Result<T> {
    attribute_error(format!(
        "a value of type '{}' has no attribute '{name}'",
        target.type_as_string()
    ))
}
