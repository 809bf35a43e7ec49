//! The operator kernel: the allowed operand kinds and result of every operator

use crate::{
    Heap, HeapData, QList, QNumber, QValue, Result, ValueKey,
    error::{arith_error, index_error, key_error, type_error, unexpected_type},
    types::signed_index,
};
use quill_bytecode::BinaryOp;
use std::cmp::Ordering;

/// Applies a binary operator to two operand values
///
/// Allocating results (list concatenation) go through the heap; mismatched operand
/// kinds produce a *TypeError*, and arithmetic domain failures a *ArithError*.
pub(crate) fn binary_op(
    heap: &mut Heap,
    op: BinaryOp,
    lhs: &QValue,
    rhs: &QValue,
) -> Result<QValue> {
    use BinaryOp::*;

    match op {
        Add => add(heap, lhs, rhs),
        Subtract | Multiply | Divide | Remainder | Power => arithmetic(op, lhs, rhs),
        BitAnd | BitOr | BitXor | ShiftLeft | ShiftRight => bitwise(op, lhs, rhs),
        Less | LessOrEqual | Greater | GreaterOrEqual => comparison(op, lhs, rhs),
        Equal => Ok(heap.values_equal(lhs, rhs).into()),
        NotEqual => Ok((!heap.values_equal(lhs, rhs)).into()),
        And => Ok((heap.is_truthy(lhs) && heap.is_truthy(rhs)).into()),
        Or => Ok((heap.is_truthy(lhs) || heap.is_truthy(rhs)).into()),
    }
}

/// The truthiness negation performed by the `Not` instruction
pub(crate) fn not(heap: &Heap, value: &QValue) -> QValue {
    (!heap.is_truthy(value)).into()
}

/// The arithmetic negation performed by the `Negate` instruction
pub(crate) fn negate(value: &QValue) -> Result<QValue> {
    match value {
        QValue::Number(n) => Ok(QValue::Number(-*n)),
        unexpected => unexpected_type("a number to negate", unexpected),
    }
}

fn add(heap: &mut Heap, lhs: &QValue, rhs: &QValue) -> Result<QValue> {
    use QValue::*;

    match (lhs, rhs) {
        (Number(a), Number(b)) => Ok(Number(*a + *b)),
        (Str(a), Str(b)) => Ok(format!("{a}{b}").into()),
        (List(a), List(b)) => {
            let mut data = heap.list(*a).data().to_vec();
            data.extend_from_slice(heap.list(*b).data());
            let id = heap.allocate(HeapData::List(QList::from_vec(data)))?;
            Ok(List(id))
        }
        _ => binary_op_error(BinaryOp::Add, lhs, rhs),
    }
}

fn arithmetic(op: BinaryOp, lhs: &QValue, rhs: &QValue) -> Result<QValue> {
    use BinaryOp::*;

    let (QValue::Number(a), QValue::Number(b)) = (lhs, rhs) else {
        return binary_op_error(op, lhs, rhs);
    };

    let result = match op {
        Subtract => *a - *b,
        Multiply => *a * *b,
        Divide => {
            if b.is_zero() {
                return arith_error("division by zero");
            }
            *a / *b
        }
        Remainder => {
            if b.is_zero() {
                return arith_error("remainder of division by zero");
            }
            *a % *b
        }
        Power => a.pow(*b),
        _ => unreachable!(),
    };

    Ok(QValue::Number(result))
}

fn bitwise(op: BinaryOp, lhs: &QValue, rhs: &QValue) -> Result<QValue> {
    use BinaryOp::*;

    let operands = match (lhs, rhs) {
        (QValue::Number(a), QValue::Number(b)) => a.as_integer().zip(b.as_integer()),
        _ => None,
    };
    let Some((a, b)) = operands else {
        return type_error(format!(
            "the '{op}' operator requires integer operands, found '{}' and '{}'",
            lhs.type_as_string(),
            rhs.type_as_string()
        ));
    };

    let result = match op {
        BitAnd => a & b,
        BitOr => a | b,
        BitXor => a ^ b,
        ShiftLeft | ShiftRight => {
            if !(0..64).contains(&b) {
                return arith_error(format!("shift amount must be in the range 0..64, found {b}"));
            }
            if op == ShiftLeft { a << b } else { a >> b }
        }
        _ => unreachable!(),
    };

    Ok(QValue::Number(QNumber::I64(result)))
}

fn comparison(op: BinaryOp, lhs: &QValue, rhs: &QValue) -> Result<QValue> {
    use BinaryOp::*;
    use QValue::*;

    let ordering = match (lhs, rhs) {
        (Number(a), Number(b)) => a.cmp(b),
        (Str(a), Str(b)) => a.cmp(b),
        _ => return binary_op_error(op, lhs, rhs),
    };

    let result = match op {
        Less => ordering == Ordering::Less,
        LessOrEqual => ordering != Ordering::Greater,
        Greater => ordering == Ordering::Greater,
        GreaterOrEqual => ordering != Ordering::Less,
        _ => unreachable!(),
    };

    Ok(result.into())
}

/// The `target[index]` operation
pub(crate) fn index_get(heap: &Heap, target: &QValue, index: &QValue) -> Result<QValue> {
    use QValue::*;

    match target {
        List(id) => {
            let list = heap.list(*id);
            let i = integer_index(index, "list")?;
            match list.get(i) {
                Some(value) => Ok(value.clone()),
                None => index_error(format!(
                    "index {i} is out of range for a list of length {}",
                    list.len()
                )),
            }
        }
        Str(s) => {
            let i = integer_index(index, "string")?;
            let grapheme_count = s.grapheme_count();
            match signed_index(i, grapheme_count).and_then(|i| s.grapheme_at(i)) {
                Some(result) => Ok(result.into()),
                None => index_error(format!(
                    "index {i} is out of range for a string of length {grapheme_count}"
                )),
            }
        }
        Map(id) => {
            let key = ValueKey::try_from(index.clone())?;
            match heap.map(*id).get(&key) {
                Some(value) => Ok(value),
                None => key_error(format!("key '{key}' not found in map")),
            }
        }
        unexpected => type_error(format!(
            "a value of type '{}' isn't indexable",
            unexpected.type_as_string()
        )),
    }
}

/// The `target[index] = value` operation
pub(crate) fn index_set(
    heap: &mut Heap,
    target: &QValue,
    index: &QValue,
    value: QValue,
) -> Result<()> {
    use QValue::*;

    match target {
        List(id) => {
            let i = integer_index(index, "list")?;
            let list = heap.list_mut(*id);
            if list.set(i, value) {
                Ok(())
            } else {
                let len = list.len();
                index_error(format!(
                    "index {i} is out of range for a list of length {len}"
                ))
            }
        }
        Map(id) => {
            let key = ValueKey::try_from(index.clone())?;
            heap.map_mut(*id).insert(key, value);
            Ok(())
        }
        Str(_) => type_error("strings are immutable and can't be assigned to by index"),
        unexpected => type_error(format!(
            "a value of type '{}' isn't indexable",
            unexpected.type_as_string()
        )),
    }
}

fn integer_index(index: &QValue, target_kind: &str) -> Result<i64> {
    match index {
        QValue::Number(n) => match n.as_integer() {
            Some(i) => Ok(i),
            None => type_error(format!("{target_kind} indices must be integers, found {n}")),
        },
        unexpected => unexpected_type(&format!("an integer {target_kind} index"), unexpected),
    }
}

fn binary_op_error<T>(op: BinaryOp, lhs: &QValue, rhs: &QValue) -> Result<T> {
    type_error(format!(
        "unable to perform operation '{op}' with '{}' and '{}'",
        lhs.type_as_string(),
        rhs.type_as_string()
    ))
}
