//! Untyped stack shuffling (spec.md §4.9, `0x0100..=0x01FF`): `POP`/`DUP`/
//! `SWAP` operate on whatever value is on top regardless of its kind.

use crate::errors::VmResult;
use crate::stack::OperandStack;

pub fn pop(stack: &mut OperandStack) -> VmResult<()> {
    stack.pop()?;
    Ok(())
}

pub fn dup(stack: &mut OperandStack) -> VmResult<()> {
    let top = stack.peek()?.clone();
    stack.push(top);
    Ok(())
}

pub fn swap(stack: &mut OperandStack) -> VmResult<()> {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(a);
    stack.push(b);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn dup_duplicates_the_top_value() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(3));
        dup(&mut stack).unwrap();
        assert_eq!(stack.size(), 2);
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 3);
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn swap_exchanges_the_top_two_values() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(1));
        stack.push(Value::Int(2));
        swap(&mut stack).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 1);
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 2);
    }
}
