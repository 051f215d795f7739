//! Process/time family (spec.md §4.10.7, codes `0x1700..=0x17FF` and
//! `0x1900..=0x19FF`).

use crate::errors::VmResult;
use crate::stack::OperandStack;
use crate::syscall::errno::ErrnoState;
use crate::value::Value;
use std::io::Read;
use std::time::Duration;

pub const SLEEP: u16 = 0x1700;
pub const ERRNO: u16 = 0x1701;
pub const ERRSTR: u16 = 0x1702;
pub const MEMINFO: u16 = 0x1703;
pub const RANDOM_BYTES: u16 = 0x1900;
pub const NCPU: u16 = 0x1901;

pub fn sleep(stack: &mut OperandStack) -> VmResult<()> {
    let millis = stack.pop()?.as_i64()?;
    std::thread::sleep(Duration::from_millis(millis.max(0) as u64));
    stack.push(Value::Int(0));
    Ok(())
}

pub fn errno(stack: &mut OperandStack, errnos: &ErrnoState) -> VmResult<()> {
    stack.push(Value::Int(errnos.code()));
    Ok(())
}

pub fn errstr(stack: &mut OperandStack, errnos: &ErrnoState) -> VmResult<()> {
    stack.push(Value::string(errnos.message()));
    Ok(())
}

/// Reports process-wide memory usage. No portable stdlib API exists for
/// this, so non-Linux hosts report zero rather than faking a number.
pub fn meminfo(stack: &mut OperandStack) -> VmResult<()> {
    let bytes = read_statm_bytes().unwrap_or(0);
    stack.push(Value::Long(bytes));
    Ok(())
}

#[cfg(target_os = "linux")]
fn read_statm_bytes() -> Option<i64> {
    let contents = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: i64 = contents.split_whitespace().nth(1)?.parse().ok()?;
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    Some(resident_pages * page_size as i64)
}

#[cfg(not(target_os = "linux"))]
fn read_statm_bytes() -> Option<i64> {
    None
}

pub fn random_bytes(stack: &mut OperandStack) -> VmResult<()> {
    let n = stack.pop()?.as_i64()? as usize;
    let mut buf = vec![0u8; n];
    std::fs::File::open("/dev/urandom")?.read_exact(&mut buf)?;
    stack.push(Value::array(buf.into_iter().map(|b| Value::Byte(b as i8)).collect()));
    Ok(())
}

pub fn ncpu(stack: &mut OperandStack) -> VmResult<()> {
    let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    stack.push(Value::Int(n as i32));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ncpu_reports_at_least_one() {
        let mut stack = OperandStack::new();
        ncpu(&mut stack).unwrap();
        assert!(stack.pop().unwrap().as_i64().unwrap() >= 1);
    }

    #[test]
    fn random_bytes_returns_requested_length() {
        let mut stack = OperandStack::new();
        stack.push(Value::Int(16));
        random_bytes(&mut stack).unwrap();
        let handle = stack.pop().unwrap().as_handle().unwrap();
        match &*handle.borrow() {
            crate::value::RefObject::Array(items) => assert_eq!(items.len(), 16),
            _ => panic!("expected an array"),
        }
    }
}
