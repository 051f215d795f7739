//! Reference-kind opcodes (spec.md §4.1, `0x00E0..=0x00EF`): `Ref` sits
//! outside the typed numeric family (it has no width), so it gets its own
//! push/load/store trio instead of a `R_`-prefixed slot in that family.

use crate::errors::{VmError, VmResult};
use crate::frame::LocalVariableStore;
use crate::stack::OperandStack;
use crate::value::Value;

/// Undo `Constant::literal_token`'s `{:?}`-style quoting of a string
/// literal back into its raw content.
fn unescape(token: &str) -> VmResult<String> {
    let inner = token
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| VmError::Type { expected: "a quoted string literal".to_string(), found: token.to_string() })?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => out.push(other),
            None => return Err(VmError::Type { expected: "a complete escape".to_string(), found: token.to_string() }),
        }
    }
    Ok(out)
}

pub fn push(stack: &mut OperandStack, token: &str) -> VmResult<()> {
    stack.push(Value::string(unescape(token)?));
    Ok(())
}

pub fn load(stack: &mut OperandStack, locals: &LocalVariableStore, slot: u64) -> VmResult<()> {
    let value = locals.get(slot).ok_or(VmError::UnsetSlot { slot })?;
    value.as_handle()?;
    stack.push(value);
    Ok(())
}

pub fn store(stack: &mut OperandStack, locals: &mut LocalVariableStore, slot: u64) -> VmResult<()> {
    let value = stack.pop()?;
    value.as_handle()?;
    locals.set(slot, value);
    Ok(())
}
