//! File-system family (spec.md §4.10.2, `0x1100..=0x11FF`). Permissions are
//! best-effort: `CHMOD`/`FCHMOD` are no-ops on hosts without POSIX modes.

use crate::errors::VmResult;
use crate::stack::OperandStack;
use crate::syscall::registry::FDTable;
use crate::value::Value;

pub const MKDIR: u16 = 0x1100;
pub const RMDIR: u16 = 0x1101;
pub const CHDIR: u16 = 0x1102;
pub const GETCWD: u16 = 0x1103;
pub const CHMOD: u16 = 0x1104;
pub const FCHMOD: u16 = 0x1105;
pub const UNLINK: u16 = 0x1106;
pub const LINK: u16 = 0x1107;
pub const SYMLINK: u16 = 0x1108;

pub fn mkdir(stack: &mut OperandStack) -> VmResult<()> {
    let path = stack.pop()?.as_string()?;
    std::fs::create_dir_all(path)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn rmdir(stack: &mut OperandStack) -> VmResult<()> {
    let path = stack.pop()?.as_string()?;
    std::fs::remove_dir(path)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn chdir(stack: &mut OperandStack) -> VmResult<()> {
    let path = stack.pop()?.as_string()?;
    std::env::set_current_dir(path)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn getcwd(stack: &mut OperandStack) -> VmResult<()> {
    let cwd = std::env::current_dir()?;
    stack.push(Value::string(cwd.to_string_lossy().into_owned()));
    Ok(())
}

#[cfg(unix)]
fn chmod_path(path: &str, mode: u32) -> VmResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn chmod_path(_path: &str, _mode: u32) -> VmResult<()> {
    Ok(())
}

pub fn chmod(stack: &mut OperandStack) -> VmResult<()> {
    let mode = stack.pop()?.as_i64()? as u32;
    let path = stack.pop()?.as_string()?;
    chmod_path(&path, mode)?;
    stack.push(Value::Int(0));
    Ok(())
}

#[cfg(unix)]
pub fn fchmod(stack: &mut OperandStack, fds: &FDTable) -> VmResult<()> {
    use crate::errors::VmError;
    let mode = stack.pop()?.as_i64()? as u32;
    let fd = stack.pop()?.as_i64()? as i32;
    let raw = fds.raw_fd_of(fd)?;
    // SAFETY: `raw` is a live fd owned by FDTable for the duration of this call.
    let rc = unsafe { libc::fchmod(raw, mode as libc::mode_t) };
    if rc != 0 {
        return Err(VmError::Io(std::io::Error::last_os_error().to_string()));
    }
    stack.push(Value::Int(0));
    Ok(())
}

#[cfg(not(unix))]
pub fn fchmod(stack: &mut OperandStack, _fds: &FDTable) -> VmResult<()> {
    stack.pop()?;
    stack.pop()?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn unlink(stack: &mut OperandStack) -> VmResult<()> {
    let path = stack.pop()?.as_string()?;
    std::fs::remove_file(path)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn link(stack: &mut OperandStack) -> VmResult<()> {
    let new = stack.pop()?.as_string()?;
    let old = stack.pop()?.as_string()?;
    std::fs::hard_link(old, new)?;
    stack.push(Value::Int(0));
    Ok(())
}

#[cfg(unix)]
pub fn symlink(stack: &mut OperandStack) -> VmResult<()> {
    let linkpath = stack.pop()?.as_string()?;
    let target = stack.pop()?.as_string()?;
    std::os::unix::fs::symlink(target, linkpath)?;
    stack.push(Value::Int(0));
    Ok(())
}

#[cfg(not(unix))]
pub fn symlink(stack: &mut OperandStack) -> VmResult<()> {
    stack.pop()?;
    stack.pop()?;
    stack.push(Value::Int(0));
    Ok(())
}
