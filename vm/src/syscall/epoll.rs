//! Epoll multiplexing family (spec.md §4.10.4, `0x1300..=0x13FF`). Polls the
//! registered fds' raw descriptors via `nix::poll` rather than a true Linux
//! epoll instance, which keeps this portable across Unix hosts.

use crate::errors::{VmError, VmResult};
use crate::stack::OperandStack;
use crate::syscall::registry::{EpollRegistry, FDTable};
use crate::value::Value;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::os::fd::BorrowedFd;

pub const EPOLL_CREATE: u16 = 0x1300;
pub const EPOLL_CTL: u16 = 0x1301;
pub const EPOLL_WAIT: u16 = 0x1302;

pub const READ: u32 = 1;
pub const WRITE: u32 = 2;
pub const CONNECT: u32 = 4;

fn events_to_flags(events: u32) -> PollFlags {
    let mut flags = PollFlags::empty();
    if events & READ != 0 {
        flags |= PollFlags::POLLIN;
    }
    if events & (WRITE | CONNECT) != 0 {
        flags |= PollFlags::POLLOUT;
    }
    flags
}

fn flags_to_events(flags: PollFlags) -> u32 {
    let mut events = 0;
    if flags.intersects(PollFlags::POLLIN) {
        events |= READ;
    }
    if flags.intersects(PollFlags::POLLOUT) {
        events |= WRITE;
    }
    events
}

pub fn create(stack: &mut OperandStack, epoll: &EpollRegistry) -> VmResult<()> {
    stack.pop()?;
    stack.push(Value::Int(epoll.create()));
    Ok(())
}

pub fn ctl(stack: &mut OperandStack, epoll: &EpollRegistry) -> VmResult<()> {
    let events = stack.pop()?.as_i64()? as u32;
    let fd = stack.pop()?.as_i64()? as i32;
    let op = stack.pop()?.as_i64()? as i32;
    let epfd = stack.pop()?.as_i64()? as i32;
    epoll.ctl(epfd, op, fd, events)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn wait(stack: &mut OperandStack, epoll: &EpollRegistry, fds: &FDTable) -> VmResult<()> {
    let timeout_ms = stack.pop()?.as_i64()?;
    let max = stack.pop()?.as_i64()? as usize;
    let epfd = stack.pop()?.as_i64()? as i32;

    let interest = epoll.interest(epfd)?;
    let raws = interest
        .iter()
        .map(|&(fd, events)| fds.raw_fd_of(fd).map(|raw| (fd, raw, events)))
        .collect::<VmResult<Vec<_>>>()?;

    let mut poll_fds: Vec<PollFd> = raws
        .iter()
        .map(|&(_, raw, events)| {
            // SAFETY: `raw` stays open for the duration of this poll call;
            // FDTable is not mutated concurrently from this thread.
            let borrowed = unsafe { BorrowedFd::borrow_raw(raw) };
            PollFd::new(borrowed, events_to_flags(events))
        })
        .collect();

    let timeout = PollTimeout::try_from(timeout_ms.max(0) as u32).unwrap_or(PollTimeout::MAX);
    poll(&mut poll_fds, timeout).map_err(|e| VmError::Io(e.to_string()))?;

    let mut ready = Vec::new();
    for (i, pfd) in poll_fds.iter().enumerate() {
        if ready.len() >= max {
            break;
        }
        if let Some(revents) = pfd.revents() {
            if !revents.is_empty() {
                let (fd, _, _) = raws[i];
                ready.push(Value::array(vec![Value::Int(fd), Value::Int(flags_to_events(revents) as i32)]));
            }
        }
    }
    stack.push(Value::array(ready));
    Ok(())
}
