//! File-descriptor family (spec.md §4.10.3, `0x1200..=0x12FF`). `STDIN_READ`/
//! `STDOUT_WRITE`/`STDERR_WRITE` are shortcuts over fd 0/1/2 using the same
//! `read`/`write` handlers, matching the teacher's `seen_process::pipe`
//! raw-fd-ownership pattern.

use crate::errors::{VmError, VmResult};
use crate::stack::OperandStack;
use crate::syscall::registry::{FDTable, FdEntry};
use crate::value::{RefObject, Value};
use std::fs::OpenOptions;
use std::os::unix::io::FromRawFd;

pub const OPEN: u16 = 0x1200;
pub const CLOSE: u16 = 0x1201;
pub const READ: u16 = 0x1202;
pub const WRITE: u16 = 0x1203;
pub const DUP: u16 = 0x1204;
pub const PIPE: u16 = 0x1205;
pub const STDIN_READ: u16 = 0x1206;
pub const STDOUT_WRITE: u16 = 0x1207;
pub const STDERR_WRITE: u16 = 0x1208;

pub const O_READ: i64 = 1;
pub const O_WRITE: i64 = 2;
pub const O_CREATE: i64 = 4;
pub const O_TRUNCATE: i64 = 8;
pub const O_APPEND: i64 = 16;

fn bytes_of(value: &Value) -> VmResult<Vec<u8>> {
    let handle = value.as_handle()?;
    match &*handle.borrow() {
        RefObject::Str(s) => Ok(s.as_bytes().to_vec()),
        RefObject::Array(items) => items
            .iter()
            .map(|v| v.as_i64().map(|b| b as u8))
            .collect::<VmResult<Vec<u8>>>(),
    }
}

pub fn open(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let flags = stack.pop()?.as_i64()?;
    let path = stack.pop()?.as_string()?;
    let mut options = OpenOptions::new();
    options.read(flags & O_READ != 0);
    options.write(flags & O_WRITE != 0);
    options.create(flags & O_CREATE != 0);
    options.truncate(flags & O_TRUNCATE != 0);
    options.append(flags & O_APPEND != 0);
    let file = options.open(path)?;
    let fd = fds.insert(FdEntry::File(file));
    stack.push(Value::Int(fd));
    Ok(())
}

pub fn close(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let fd = stack.pop()?.as_i64()? as i32;
    fds.remove(fd)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn read(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let n = stack.pop()?.as_i64()? as usize;
    let fd = stack.pop()?.as_i64()? as i32;
    let mut buf = vec![0u8; n];
    let got = fds.with(fd, |entry| entry.read(&mut buf))?;
    buf.truncate(got);
    stack.push(Value::array(buf.into_iter().map(|b| Value::Byte(b as i8)).collect()));
    Ok(())
}

pub fn write(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let data = stack.pop()?;
    let fd = stack.pop()?.as_i64()? as i32;
    let bytes = bytes_of(&data)?;
    let n = fds.with(fd, |entry| entry.write(&bytes))?;
    stack.push(Value::Int(n as i32));
    Ok(())
}

pub fn dup(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let fd = stack.pop()?.as_i64()? as i32;
    let raw = fds.raw_fd_of(fd)?;
    let new_raw = unsafe { libc::dup(raw) };
    if new_raw < 0 {
        return Err(VmError::Io(std::io::Error::last_os_error().to_string()));
    }
    let file = unsafe { std::fs::File::from_raw_fd(new_raw) };
    let new_fd = fds.insert(FdEntry::File(file));
    stack.push(Value::Int(new_fd));
    Ok(())
}

pub fn pipe(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let (read_end, write_end) = nix::unistd::pipe().map_err(|e| VmError::Io(e.to_string()))?;
    let read_file = unsafe { std::fs::File::from_raw_fd(std::os::fd::IntoRawFd::into_raw_fd(read_end)) };
    let write_file = unsafe { std::fs::File::from_raw_fd(std::os::fd::IntoRawFd::into_raw_fd(write_end)) };
    let rfd = fds.insert(FdEntry::PipeRead(read_file));
    let wfd = fds.insert(FdEntry::PipeWrite(write_file));
    stack.push(Value::array(vec![Value::Int(rfd), Value::Int(wfd)]));
    Ok(())
}

pub fn stdin_read(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let n = stack.pop()?.as_i64()?;
    stack.push(Value::Int(0));
    stack.push(Value::Int(n as i32));
    read(stack, fds)
}

pub fn stdout_write(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let data = stack.pop()?;
    stack.push(Value::Int(1));
    stack.push(data);
    write(stack, fds)
}

pub fn stderr_write(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    let data = stack.pop()?;
    stack.push(Value::Int(2));
    stack.push(data);
    write(stack, fds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_a_temp_file_round_trips() {
        let fds = FDTable::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let mut stack = OperandStack::new();
        stack.push(Value::string(path.to_string_lossy().into_owned()));
        stack.push(Value::Int(O_READ | O_WRITE | O_CREATE));
        open(&mut stack, &fds).unwrap();
        let fd = stack.pop().unwrap().as_i64().unwrap() as i32;
        stack.push(Value::Int(fd));
        stack.push(Value::string("hi"));
        write(&mut stack, &fds).unwrap();
        assert_eq!(stack.pop().unwrap().as_i64().unwrap(), 2);
    }
}
