//! Environment family (spec.md §4.10.1, `0x1000..=0x100F`).

use crate::errors::VmResult;
use crate::stack::OperandStack;
use crate::syscall::registry::EnvRegistry;
use crate::value::Value;

pub const GETENV: u16 = 0x1000;
pub const SETENV: u16 = 0x1001;
pub const UNSETENV: u16 = 0x1002;

pub fn getenv(stack: &mut OperandStack, env: &EnvRegistry) -> VmResult<()> {
    let key = stack.pop()?.as_string()?;
    stack.push(Value::string(env.get(&key).unwrap_or_default()));
    Ok(())
}

pub fn setenv(stack: &mut OperandStack, env: &EnvRegistry) -> VmResult<()> {
    let value = stack.pop()?.as_string()?;
    let key = stack.pop()?.as_string()?;
    env.set(&key, &value);
    stack.push(Value::Int(0));
    Ok(())
}

pub fn unsetenv(stack: &mut OperandStack, env: &EnvRegistry) -> VmResult<()> {
    let key = stack.pop()?.as_string()?;
    env.unset(&key);
    stack.push(Value::Int(0));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_the_overlay() {
        let env = EnvRegistry::new(false);
        let mut stack = OperandStack::new();
        stack.push(Value::string("GREETING"));
        stack.push(Value::string("hi"));
        setenv(&mut stack, &env).unwrap();
        stack.pop().unwrap();
        stack.push(Value::string("GREETING"));
        getenv(&mut stack, &env).unwrap();
        assert_eq!(stack.pop().unwrap().as_string().unwrap(), "hi");
    }
}
