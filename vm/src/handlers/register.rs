//! `MOV` (spec.md §4.9, `0x0300..=0x03FF`): a direct slot-to-slot copy that
//! never touches the operand stack, kind-agnostic since it only ever moves
//! whatever value a slot already holds.

use crate::errors::VmResult;
use crate::frame::LocalVariableStore;

pub fn mov(locals: &mut LocalVariableStore, dst: u64, src: u64) -> VmResult<()> {
    use crate::errors::VmError;
    let value = locals.get(src).ok_or(VmError::UnsetSlot { slot: src })?;
    locals.set(dst, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::GlobalSlots;
    use crate::value::Value;

    #[test]
    fn mov_copies_without_touching_the_stack() {
        let globals = GlobalSlots::new();
        let mut locals = LocalVariableStore::new(globals);
        locals.set(0, Value::Int(9));
        mov(&mut locals, 1, 0).unwrap();
        assert_eq!(locals.get(1).unwrap().as_i64().unwrap(), 9);
    }
}
