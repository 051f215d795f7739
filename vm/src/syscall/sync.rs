//! Synchronization family (spec.md §4.10.6, `0x1600..=0x16FF`).

use crate::errors::VmResult;
use crate::stack::OperandStack;
use crate::syscall::registry::{CancelToken, CondRegistry, MutexRegistry, RwlockRegistry, SemRegistry, WaitOutcome};
use crate::value::Value;

pub const MUTEX_NEW: u16 = 0x1600;
pub const MUTEX_LOCK: u16 = 0x1601;
pub const MUTEX_TRYLOCK: u16 = 0x1602;
pub const MUTEX_UNLOCK: u16 = 0x1603;
pub const COND_NEW: u16 = 0x1604;
pub const COND_WAIT: u16 = 0x1605;
pub const COND_SIGNAL: u16 = 0x1606;
pub const COND_BROADCAST: u16 = 0x1607;
pub const SEM_NEW: u16 = 0x1608;
pub const SEM_WAIT: u16 = 0x1609;
pub const SEM_POST: u16 = 0x160A;
pub const RWLOCK_NEW: u16 = 0x160B;
pub const RWLOCK_RDLOCK: u16 = 0x160C;
pub const RWLOCK_WRLOCK: u16 = 0x160D;
pub const RWLOCK_UNLOCK: u16 = 0x160E;

pub fn mutex_new(stack: &mut OperandStack, mutexes: &MutexRegistry) -> VmResult<()> {
    stack.push(Value::Long(mutexes.create()));
    Ok(())
}

pub fn mutex_lock(stack: &mut OperandStack, mutexes: &MutexRegistry, cancel: &CancelToken) -> VmResult<()> {
    let mid = stack.pop()?.as_i64()?;
    mutexes.lock(mid, cancel)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn mutex_trylock(stack: &mut OperandStack, mutexes: &MutexRegistry) -> VmResult<()> {
    let mid = stack.pop()?.as_i64()?;
    let acquired = mutexes.try_lock(mid)?;
    stack.push(Value::bool(acquired));
    Ok(())
}

pub fn mutex_unlock(stack: &mut OperandStack, mutexes: &MutexRegistry) -> VmResult<()> {
    let mid = stack.pop()?.as_i64()?;
    mutexes.unlock(mid)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn cond_new(stack: &mut OperandStack, conds: &CondRegistry) -> VmResult<()> {
    stack.push(Value::Long(conds.create()));
    Ok(())
}

pub fn cond_wait(
    stack: &mut OperandStack,
    conds: &CondRegistry,
    mutexes: &MutexRegistry,
    cancel: &CancelToken,
) -> VmResult<()> {
    let timeout_ms = stack.pop()?;
    let mid = stack.pop()?.as_i64()?;
    let cid = stack.pop()?.as_i64()?;
    let timeout = match timeout_ms {
        Value::Ref(_) => None,
        other => {
            let ms = other.as_i64()?;
            if ms < 0 { None } else { Some(ms as u64) }
        }
    };
    let reason = match conds.wait(cid, mutexes, mid, timeout, cancel)? {
        WaitOutcome::Signaled => 0,
        WaitOutcome::TimedOut => 1,
        WaitOutcome::Interrupted => -1,
    };
    stack.push(Value::Int(reason));
    Ok(())
}

pub fn cond_signal(stack: &mut OperandStack, conds: &CondRegistry) -> VmResult<()> {
    let cid = stack.pop()?.as_i64()?;
    conds.signal(cid)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn cond_broadcast(stack: &mut OperandStack, conds: &CondRegistry) -> VmResult<()> {
    let cid = stack.pop()?.as_i64()?;
    conds.broadcast(cid)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn sem_new(stack: &mut OperandStack, sems: &SemRegistry) -> VmResult<()> {
    let permits = stack.pop()?.as_i64()?;
    stack.push(Value::Long(sems.create(permits)));
    Ok(())
}

pub fn sem_wait(stack: &mut OperandStack, sems: &SemRegistry, cancel: &CancelToken) -> VmResult<()> {
    let sid = stack.pop()?.as_i64()?;
    sems.wait(sid, cancel)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn sem_post(stack: &mut OperandStack, sems: &SemRegistry) -> VmResult<()> {
    let sid = stack.pop()?.as_i64()?;
    sems.post(sid)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn rwlock_new(stack: &mut OperandStack, rwlocks: &RwlockRegistry) -> VmResult<()> {
    stack.push(Value::Long(rwlocks.create()));
    Ok(())
}

pub fn rwlock_rdlock(stack: &mut OperandStack, rwlocks: &RwlockRegistry) -> VmResult<()> {
    let rwl = stack.pop()?.as_i64()?;
    rwlocks.read_lock(rwl)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn rwlock_wrlock(stack: &mut OperandStack, rwlocks: &RwlockRegistry) -> VmResult<()> {
    let rwl = stack.pop()?.as_i64()?;
    rwlocks.write_lock(rwl)?;
    stack.push(Value::Int(0));
    Ok(())
}

pub fn rwlock_unlock(stack: &mut OperandStack, rwlocks: &RwlockRegistry) -> VmResult<()> {
    let rwl = stack.pop()?.as_i64()?;
    rwlocks.unlock(rwl)?;
    stack.push(Value::Int(0));
    Ok(())
}
