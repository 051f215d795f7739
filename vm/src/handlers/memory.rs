//! Typed `PUSH`/`LOAD`/`STORE` (spec.md §4.9, the remaining slots of
//! `0x0000..=0x00BF`'s per-kind block not covered by `arithmetic`).

use crate::errors::{VmError, VmResult};
use crate::frame::LocalVariableStore;
use crate::stack::OperandStack;
use crate::value::Value;
use lumen_common::ScalarKind;

/// Parse a literal operand token into a typed value (spec.md §6: numeric
/// tokens are plain decimal text).
pub fn parse_literal(kind: ScalarKind, token: &str) -> VmResult<Value> {
    let bad = || VmError::Type { expected: kind.to_string(), found: token.to_string() };
    Ok(match kind {
        ScalarKind::Byte => Value::Byte(token.parse().map_err(|_| bad())?),
        ScalarKind::Short => Value::Short(token.parse().map_err(|_| bad())?),
        ScalarKind::Int => Value::Int(token.parse().map_err(|_| bad())?),
        ScalarKind::Long => Value::Long(token.parse().map_err(|_| bad())?),
        ScalarKind::Float => Value::Float(token.parse().map_err(|_| bad())?),
        ScalarKind::Double => Value::Double(token.parse().map_err(|_| bad())?),
        ScalarKind::Void | ScalarKind::Ref => return Err(bad()),
    })
}

pub fn push(stack: &mut OperandStack, kind: ScalarKind, token: &str) -> VmResult<()> {
    stack.push(parse_literal(kind, token)?);
    Ok(())
}

pub fn load(stack: &mut OperandStack, locals: &LocalVariableStore, slot: u64) -> VmResult<()> {
    let value = locals.get(slot).ok_or(VmError::UnsetSlot { slot })?;
    stack.push(value);
    Ok(())
}

pub fn store(stack: &mut OperandStack, locals: &mut LocalVariableStore, slot: u64) -> VmResult<()> {
    let value = stack.pop()?;
    locals.set(slot, value);
    Ok(())
}
