//! Array family (spec.md §4.10.8, `0x1800..=0x18FF`). Operates on the
//! `RefObject::Array` payload behind a `Ref` value; booleans surface as
//! `I(1|0)` per spec.md's error/flag convention.

use crate::errors::{VmError, VmResult};
use crate::stack::OperandStack;
use crate::value::{RefObject, Value};

pub const ARR_LEN: u16 = 0x1800;
pub const ARR_GET: u16 = 0x1801;
pub const ARR_SET: u16 = 0x1802;
pub const ARR_PUSH: u16 = 0x1803;
pub const ARR_POP: u16 = 0x1804;
pub const ARR_INSERT: u16 = 0x1805;
pub const ARR_CLEAR: u16 = 0x1806;

fn index_error(index: i64) -> VmError {
    VmError::Type { expected: "an in-bounds array index".to_string(), found: index.to_string() }
}

pub fn len(stack: &mut OperandStack) -> VmResult<()> {
    let handle = stack.pop()?.as_handle()?;
    let n = match &*handle.borrow() {
        RefObject::Array(items) => items.len(),
        RefObject::Str(_) => return Err(VmError::Type { expected: "array".to_string(), found: "string".to_string() }),
    };
    stack.push(Value::Int(n as i32));
    Ok(())
}

pub fn get(stack: &mut OperandStack) -> VmResult<()> {
    let index = stack.pop()?.as_i64()?;
    let handle = stack.pop()?.as_handle()?;
    let value = match &*handle.borrow() {
        RefObject::Array(items) => items.get(index as usize).cloned().ok_or_else(|| index_error(index))?,
        RefObject::Str(_) => return Err(VmError::Type { expected: "array".to_string(), found: "string".to_string() }),
    };
    stack.push(value);
    Ok(())
}

pub fn set(stack: &mut OperandStack) -> VmResult<()> {
    let value = stack.pop()?;
    let index = stack.pop()?.as_i64()?;
    let handle = stack.pop()?.as_handle()?;
    match &mut *handle.borrow_mut() {
        RefObject::Array(items) => {
            let slot = items.get_mut(index as usize).ok_or_else(|| index_error(index))?;
            *slot = value;
        }
        RefObject::Str(_) => return Err(VmError::Type { expected: "array".to_string(), found: "string".to_string() }),
    }
    stack.push(Value::Int(0));
    Ok(())
}

pub fn push(stack: &mut OperandStack) -> VmResult<()> {
    let value = stack.pop()?;
    let handle = stack.pop()?.as_handle()?;
    match &mut *handle.borrow_mut() {
        RefObject::Array(items) => items.push(value),
        RefObject::Str(_) => return Err(VmError::Type { expected: "array".to_string(), found: "string".to_string() }),
    }
    stack.push(Value::Int(0));
    Ok(())
}

pub fn pop(stack: &mut OperandStack) -> VmResult<()> {
    let handle = stack.pop()?.as_handle()?;
    let value = match &mut *handle.borrow_mut() {
        RefObject::Array(items) => items.pop().ok_or_else(|| index_error(-1))?,
        RefObject::Str(_) => return Err(VmError::Type { expected: "array".to_string(), found: "string".to_string() }),
    };
    stack.push(value);
    Ok(())
}

pub fn insert(stack: &mut OperandStack) -> VmResult<()> {
    let value = stack.pop()?;
    let index = stack.pop()?.as_i64()?;
    let handle = stack.pop()?.as_handle()?;
    match &mut *handle.borrow_mut() {
        RefObject::Array(items) => {
            if index < 0 || index as usize > items.len() {
                return Err(index_error(index));
            }
            items.insert(index as usize, value);
        }
        RefObject::Str(_) => return Err(VmError::Type { expected: "array".to_string(), found: "string".to_string() }),
    }
    stack.push(Value::Int(0));
    Ok(())
}

pub fn clear(stack: &mut OperandStack) -> VmResult<()> {
    let handle = stack.pop()?.as_handle()?;
    match &mut *handle.borrow_mut() {
        RefObject::Array(items) => items.clear(),
        RefObject::Str(_) => return Err(VmError::Type { expected: "array".to_string(), found: "string".to_string() }),
    }
    stack.push(Value::Int(0));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_len_then_get_round_trips() {
        let mut stack = OperandStack::new();
        let arr = Value::array(vec![]);
        stack.push(arr.clone());
        stack.push(Value::Int(9));
        push(&mut stack).unwrap();
        stack.pop().unwrap();

        stack.push(arr.clone());
        len(&mut stack).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 1);

        stack.push(arr);
        stack.push(Value::Int(0));
        get(&mut stack).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 9);
    }

    #[test]
    fn get_out_of_bounds_is_an_error() {
        let mut stack = OperandStack::new();
        stack.push(Value::array(vec![]));
        stack.push(Value::Int(0));
        assert!(get(&mut stack).is_err());
    }

    #[test]
    fn pop_from_empty_array_is_an_error() {
        let mut stack = OperandStack::new();
        stack.push(Value::array(vec![]));
        assert!(pop(&mut stack).is_err());
    }
}
