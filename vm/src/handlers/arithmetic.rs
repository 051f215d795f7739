//! Typed arithmetic/bitwise opcodes (spec.md §4.9, `0x0000..=0x00BF`'s
//! `ADD`/`SUB`/`MUL`/`DIV`/`MOD`/`NEG`/`INC`/`AND`/`OR`/`XOR` slots). Each
//! operates at its own kind's native width so wrapping matches what the
//! corresponding host integer type would do.

use crate::errors::{VmError, VmResult};
use crate::stack::OperandStack;
use crate::value::Value;
use lumen_common::{ArithOp, ScalarKind};

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

macro_rules! int_binary {
    ($lhs:expr, $rhs:expr, $op:expr, $ctor:path) => {{
        let a = $lhs;
        let b = $rhs;
        match $op {
            ArithOp::Add => $ctor(a.wrapping_add(b)),
            ArithOp::Sub => $ctor(a.wrapping_sub(b)),
            ArithOp::Mul => $ctor(a.wrapping_mul(b)),
            ArithOp::Div => {
                if b == 0 {
                    return Err(VmError::DivideByZero);
                }
                $ctor(a.wrapping_div(b))
            }
            ArithOp::Mod => {
                if b == 0 {
                    return Err(VmError::DivideByZero);
                }
                $ctor(a.wrapping_rem(b))
            }
            ArithOp::And => $ctor(a & b),
            ArithOp::Or => $ctor(a | b),
            ArithOp::Xor => $ctor(a ^ b),
            ArithOp::Neg | ArithOp::Inc => unreachable!("unary ops are handled separately"),
        }
    }};
}

macro_rules! int_unary {
    ($v:expr, $op:expr, $ctor:path) => {{
        let a = $v;
        match $op {
            ArithOp::Neg => $ctor(a.wrapping_neg()),
            ArithOp::Inc => $ctor(a.wrapping_add(1)),
            _ => unreachable!("binary ops are handled separately"),
        }
    }};
}

pub fn handle(stack: &mut OperandStack, kind: ScalarKind, op: ArithOp) -> VmResult<()> {
    if op.is_unary() {
        let v = expect(stack.pop()?, kind)?;
        let result = match (kind, v) {
            (ScalarKind::Byte, Value::Byte(a)) => int_unary!(a, op, Value::Byte),
            (ScalarKind::Short, Value::Short(a)) => int_unary!(a, op, Value::Short),
            (ScalarKind::Int, Value::Int(a)) => int_unary!(a, op, Value::Int),
            (ScalarKind::Long, Value::Long(a)) => int_unary!(a, op, Value::Long),
            (ScalarKind::Float, Value::Float(a)) => Value::Float(if op == ArithOp::Neg { -a } else { a + 1.0 }),
            (ScalarKind::Double, Value::Double(a)) => Value::Double(if op == ArithOp::Neg { -a } else { a + 1.0 }),
            _ => return Err(VmError::Type { expected: kind.to_string(), found: "mismatched payload".to_string() }),
        };
        stack.push(result);
        return Ok(());
    }

    if op.is_bitwise() && !kind.is_integral() {
        return Err(VmError::Type { expected: "an integral kind".to_string(), found: kind.to_string() });
    }

    let rhs = expect(stack.pop()?, kind)?;
    let lhs = expect(stack.pop()?, kind)?;
    let result = match (kind, lhs, rhs) {
        (ScalarKind::Byte, Value::Byte(a), Value::Byte(b)) => int_binary!(a, b, op, Value::Byte),
        (ScalarKind::Short, Value::Short(a), Value::Short(b)) => int_binary!(a, b, op, Value::Short),
        (ScalarKind::Int, Value::Int(a), Value::Int(b)) => int_binary!(a, b, op, Value::Int),
        (ScalarKind::Long, Value::Long(a), Value::Long(b)) => int_binary!(a, b, op, Value::Long),
        (ScalarKind::Float, Value::Float(a), Value::Float(b)) => Value::Float(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Mod => a % b,
            _ => return Err(VmError::Type { expected: "an integral kind".to_string(), found: kind.to_string() }),
        }),
        (ScalarKind::Double, Value::Double(a), Value::Double(b)) => Value::Double(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Mod => a % b,
            _ => return Err(VmError::Type { expected: "an integral kind".to_string(), found: kind.to_string() }),
        }),
        _ => return Err(VmError::Type { expected: kind.to_string(), found: "mismatched payload".to_string() }),
    };
    stack.push(result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn integer_division_by_zero_is_a_divide_by_zero_error() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(7));
        stack.push(Value::Int(0));
        assert!(matches!(handle(&mut stack, ScalarKind::Int, ArithOp::Div), Err(VmError::DivideByZero)));
    }

    #[test]
    fn byte_addition_wraps_at_native_width() {
        let mut stack = OperandStack::new();
        stack.push(Value::Byte(120));
        stack.push(Value::Byte(10));
        handle(&mut stack, ScalarKind::Byte, ArithOp::Add).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 120i8.wrapping_add(10) as i64);
    }

    #[test]
    fn bitwise_xor_on_int() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(0b1010));
        stack.push(Value::Int(0b0110));
        handle(&mut stack, ScalarKind::Int, ArithOp::Xor).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 0b1100);
    }

    #[test_case(ScalarKind::Float, Value::Float(1.0), Value::Float(2.0); "float")]
    #[test_case(ScalarKind::Double, Value::Double(1.0), Value::Double(2.0); "double")]
    fn bitwise_on_a_floating_kind_is_rejected(kind: ScalarKind, lhs: Value, rhs: Value) {
        let mut stack = OperandStack::new();
        stack.push(lhs);
        stack.push(rhs);
        assert!(matches!(handle(&mut stack, kind, ArithOp::And), Err(VmError::Type { .. })));
    }

    #[test]
    fn a_narrower_numeric_payload_is_widened_rather_than_rejected() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(2));
        stack.push(Value::Int(3));
        handle(&mut stack, ScalarKind::Long, ArithOp::Add).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 5);
    }

    #[test]
    fn a_reference_payload_is_still_rejected_where_a_number_is_expected() {
        let mut stack = OperandStack::new();
        stack.push(Value::string("nope"));
        stack.push(Value::Int(1));
        assert!(matches!(handle(&mut stack, ScalarKind::Int, ArithOp::Add), Err(VmError::Type { .. })));
    }

    #[test]
    fn negation_is_unary() {
        let mut stack = OperandStack::new();
        stack.push(Value::Long(5));
        handle(&mut stack, ScalarKind::Long, ArithOp::Neg).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), -5);
    }
}
