//! Scalar conversions (spec.md §4.9, `0x00C0..=0x00DF`). Float-to-integer
//! narrowing saturates at the target's min/max and maps `NaN` to zero rather
//! than wrapping, resolving spec.md's open question on out-of-range casts
//! the way Rust's own `as` numeric cast already behaves.

use crate::errors::{VmError, VmResult};
use crate::stack::OperandStack;
use crate::value::Value;
use lumen_common::ScalarKind;

/// Narrows any numeric payload to `kind` (spec.md §4.7: a consumer asking
/// for a given kind accepts any Number by widening/narrowing through it;
/// only a non-numeric, i.e. `Ref`, payload is fatal). `from` here is the
/// source kind the `CONVERT` opcode itself was encoded with, so a pushed
/// value of a different numeric kind is normalized the same way any other
/// operand consumer normalizes its inputs rather than rejected outright.
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

macro_rules! convert_from {
    ($x:expr, $to:expr) => {
        match $to {
            ScalarKind::Byte => Value::Byte($x as i8),
            ScalarKind::Short => Value::Short($x as i16),
            ScalarKind::Int => Value::Int($x as i32),
            ScalarKind::Long => Value::Long($x as i64),
            ScalarKind::Float => Value::Float($x as f32),
            ScalarKind::Double => Value::Double($x as f64),
            other => return Err(VmError::Type { expected: "a numeric kind".to_string(), found: other.to_string() }),
        }
    };
}

pub fn handle(stack: &mut OperandStack, from: ScalarKind, to: ScalarKind) -> VmResult<()> {
    let v = expect(stack.pop()?, from)?;
    let result = match v {
        Value::Byte(x) => convert_from!(x, to),
        Value::Short(x) => convert_from!(x, to),
        Value::Int(x) => convert_from!(x, to),
        Value::Long(x) => convert_from!(x, to),
        Value::Float(x) => convert_from!(x, to),
        Value::Double(x) => convert_from!(x, to),
        Value::Ref(_) => {
            return Err(VmError::Type { expected: "a numeric kind".to_string(), found: "R".to_string() })
        }
    };
    stack.push(result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_int_to_long() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(7));
        handle(&mut stack, ScalarKind::Int, ScalarKind::Long).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 7);
    }

    #[test]
    fn out_of_range_double_to_int_saturates() {
        let mut stack = OperandStack::new();
        stack.push(Value::Double(1e20));
        handle(&mut stack, ScalarKind::Double, ScalarKind::Int).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), i32::MAX as i64);
    }

    #[test]
    fn a_pushed_int_is_widened_when_the_opcode_declares_a_long_source() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(7));
        handle(&mut stack, ScalarKind::Long, ScalarKind::Double).unwrap();
        assert_eq!(stack.pop().unwrap().as_f64().unwrap(), 7.0);
    }

    #[test]
    fn nan_to_int_is_zero() {
        let mut stack = OperandStack::new();
        stack.push(Value::Double(f64::NAN));
        handle(&mut stack, ScalarKind::Double, ScalarKind::Int).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 0);
    }
}
