//! Typed compare-and-branch condition test (spec.md §4.9): pops two operands
//! of `kind` and reports whether `cmp` holds between them. Branching on the
//! result is `dispatch`'s job since only it owns `pc`.

use crate::errors::{VmError, VmResult};
use crate::stack::OperandStack;
use crate::value::Value;
use lumen_common::{Comparator, ScalarKind};

/// Narrows any numeric payload to `kind` (spec.md §4.7: a consumer asking
/// for a given kind accepts any Number by widening/narrowing through it;
/// only a non-numeric, i.e. `Ref`, payload is fatal).
fn expect(value: Value, kind: ScalarKind) -> VmResult<Value> {
    if value.kind() == kind {
        return Ok(value);
    }
    Ok(match kind {
        ScalarKind::Byte => Value::Byte(value.as_i64()? as i8),
        ScalarKind::Short => Value::Short(value.as_i64()? as i16),
        ScalarKind::Int => Value::Int(value.as_i64()? as i32),
        ScalarKind::Long => Value::Long(value.as_i64()?),
        ScalarKind::Float => Value::Float(value.as_f64()? as f32),
        ScalarKind::Double => Value::Double(value.as_f64()?),
        ScalarKind::Ref => return Err(VmError::Type { expected: "R".to_string(), found: value.kind().to_string() }),
    })
}

pub fn holds(stack: &mut OperandStack, kind: ScalarKind, cmp: Comparator) -> VmResult<bool> {
    let rhs = expect(stack.pop()?, kind)?;
    let lhs = expect(stack.pop()?, kind)?;
    Ok(match (lhs, rhs) {
        (Value::Byte(a), Value::Byte(b)) => cmp.holds(a, b),
        (Value::Short(a), Value::Short(b)) => cmp.holds(a, b),
        (Value::Int(a), Value::Int(b)) => cmp.holds(a, b),
        (Value::Long(a), Value::Long(b)) => cmp.holds(a, b),
        (Value::Float(a), Value::Float(b)) => cmp.holds(a, b),
        (Value::Double(a), Value::Double(b)) => cmp.holds(a, b),
        _ => return Err(VmError::Type { expected: kind.to_string(), found: "mismatched payload".to_string() }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn less_than_holds() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(1));
        stack.push(Value::Int(2));
        assert!(holds(&mut stack, ScalarKind::Int, Comparator::Lt).unwrap());
    }

    #[test]
    fn equal_does_not_hold_for_differing_doubles() {
        let mut stack = OperandStack::new();
        stack.push(Value::Double(1.5));
        stack.push(Value::Double(2.5));
        assert!(!holds(&mut stack, ScalarKind::Double, Comparator::Eq).unwrap());
    }

    #[test]
    fn a_narrower_numeric_payload_is_widened_rather_than_rejected() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(1));
        stack.push(Value::Int(2));
        assert!(holds(&mut stack, ScalarKind::Long, Comparator::Lt).unwrap());
    }

    #[rstest]
    #[case(Comparator::Eq, false)]
    #[case(Comparator::Ne, true)]
    #[case(Comparator::Gt, false)]
    #[case(Comparator::Ge, false)]
    #[case(Comparator::Lt, true)]
    #[case(Comparator::Le, true)]
    fn every_comparator_agrees_with_native_ordering_on_one_lt_two(#[case] cmp: Comparator, #[case] expected: bool) {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(1));
        stack.push(Value::Int(2));
        assert_eq!(holds(&mut stack, ScalarKind::Int, cmp).unwrap(), expected);
    }
}
