//! Process-wide resource registries (spec.md §3/§5): each allocates
//! monotonically increasing, never-reused integer IDs and is internally
//! mutex-protected so the syscall layer stays safe to call from more than
//! one dispatch thread sharing a `Vm`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, UdpSocket};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::errors::{VmError, VmResult};

fn unknown(registry: &'static str, id: i64) -> VmError {
    VmError::UnknownResource { registry, id }
}

/// How long a blocking wait sleeps between checks of a [`CancelToken`] (and,
/// for `COND_WAIT`'s timeout, of the deadline). Cancellation is cooperative
/// (spec.md §5), so there is no interrupt to wake a blocked wait early —
/// only a bound on how late it notices.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A process-wide cooperative cancellation flag (spec.md §5: "cancellation
/// is cooperative via host thread interruption"). Every clone shares the
/// same underlying flag, so a handle kept by one thread (e.g. a signal
/// handler, or the embedder driving a `Vm`) can cancel a wait blocked on
/// another. Mirrors the teacher's shared-state-behind-a-primitive pattern
/// in `seen_concurrency`, reduced to the one bit this layer needs.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An overlay over the OS environment (spec.md §4.10 family 1): reads fall
/// back to the process environment, writes only ever touch the overlay.
/// Grounded in the teacher's `seen_process::environment::Environment`.
#[derive(Debug, Default)]
pub struct EnvRegistry {
    overlay: Mutex<HashMap<String, String>>,
}

impl EnvRegistry {
    pub fn new(inherit: bool) -> Self {
        let overlay = if inherit { std::env::vars().collect() } else { HashMap::new() };
        Self { overlay: Mutex::new(overlay) }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(v) = self.overlay.lock().unwrap().get(key).cloned() {
            return Some(v);
        }
        std::env::var(key).ok()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.overlay.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn unset(&self, key: &str) {
        self.overlay.lock().unwrap().remove(key);
    }
}

/// Every descriptor-backed resource the program can hold: files, pipe ends,
/// and sockets all share one fd integer space, matching POSIX and letting
/// `EpollRegistry` poll any of them uniformly.
pub enum FdEntry {
    Stdin,
    Stdout,
    Stderr,
    File(File),
    PipeRead(File),
    PipeWrite(File),
    TcpListener(TcpListener),
    TcpStream(TcpStream),
    Udp(UdpSocket),
}

impl FdEntry {
    pub fn raw_fd(&self) -> RawFd {
        match self {
            FdEntry::Stdin => 0,
            FdEntry::Stdout => 1,
            FdEntry::Stderr => 2,
            FdEntry::File(f) | FdEntry::PipeRead(f) | FdEntry::PipeWrite(f) => f.as_raw_fd(),
            FdEntry::TcpListener(s) => s.as_raw_fd(),
            FdEntry::TcpStream(s) => s.as_raw_fd(),
            FdEntry::Udp(s) => s.as_raw_fd(),
        }
    }

    pub fn read(&mut self, buf: &mut [u8]) -> VmResult<usize> {
        match self {
            FdEntry::Stdin => Ok(std::io::stdin().read(buf)?),
            FdEntry::Stdout | FdEntry::Stderr | FdEntry::PipeWrite(_) | FdEntry::TcpListener(_) => {
                Err(VmError::Io("descriptor is not readable".to_string()))
            }
            FdEntry::File(f) | FdEntry::PipeRead(f) => Ok(f.read(buf)?),
            FdEntry::TcpStream(s) => Ok(s.read(buf)?),
            FdEntry::Udp(s) => Ok(s.recv(buf)?),
        }
    }

    pub fn write(&mut self, buf: &[u8]) -> VmResult<usize> {
        match self {
            FdEntry::Stdout => {
                let mut out = std::io::stdout();
                out.write_all(buf)?;
                out.flush()?;
                Ok(buf.len())
            }
            FdEntry::Stderr => {
                let mut err = std::io::stderr();
                err.write_all(buf)?;
                err.flush()?;
                Ok(buf.len())
            }
            FdEntry::Stdin | FdEntry::PipeRead(_) | FdEntry::TcpListener(_) => {
                Err(VmError::Io("descriptor is not writable".to_string()))
            }
            FdEntry::File(f) | FdEntry::PipeWrite(f) => {
                f.write_all(buf)?;
                Ok(buf.len())
            }
            FdEntry::TcpStream(s) => {
                s.write_all(buf)?;
                Ok(buf.len())
            }
            FdEntry::Udp(s) => Ok(s.send(buf)?),
        }
    }
}

/// fd 0/1/2 are pre-opened as stdin/stdout/stderr (spec.md §3).
pub struct FDTable {
    entries: Mutex<HashMap<i32, FdEntry>>,
    next_fd: Mutex<i32>,
}

impl Default for FDTable {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(0, FdEntry::Stdin);
        entries.insert(1, FdEntry::Stdout);
        entries.insert(2, FdEntry::Stderr);
        Self { entries: Mutex::new(entries), next_fd: Mutex::new(3) }
    }
}

impl FDTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: FdEntry) -> i32 {
        let mut next = self.next_fd.lock().unwrap();
        let fd = *next;
        *next += 1;
        self.entries.lock().unwrap().insert(fd, entry);
        fd
    }

    pub fn with<R>(&self, fd: i32, f: impl FnOnce(&mut FdEntry) -> VmResult<R>) -> VmResult<R> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.get_mut(&fd).ok_or_else(|| unknown("fd", fd as i64))?;
        f(entry)
    }

    pub fn remove(&self, fd: i32) -> VmResult<FdEntry> {
        self.entries.lock().unwrap().remove(&fd).ok_or_else(|| unknown("fd", fd as i64))
    }

    pub fn raw_fd_of(&self, fd: i32) -> VmResult<RawFd> {
        self.with(fd, |entry| Ok(entry.raw_fd()))
    }
}

/// Tracks `EPOLL_CTL`-registered interest sets per epoll instance, polled by
/// `EPOLL_WAIT` via `nix::poll` over the underlying raw fds (spec.md §4.10
/// family 4). A userspace readiness list rather than a true Linux epoll
/// instance, which keeps the syscall layer portable across Unix hosts.
#[derive(Default)]
pub struct EpollRegistry {
    instances: Mutex<HashMap<i32, HashMap<i32, u32>>>,
    next_id: Mutex<i32>,
}

impl EpollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> i32 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        self.instances.lock().unwrap().insert(id, HashMap::new());
        id
    }

    pub fn ctl(&self, epfd: i32, op: i32, fd: i32, events: u32) -> VmResult<()> {
        let mut instances = self.instances.lock().unwrap();
        let interest = instances.get_mut(&epfd).ok_or_else(|| unknown("epoll", epfd as i64))?;
        match op {
            1 => {
                interest.insert(fd, events);
            }
            2 => {
                interest.insert(fd, events);
            }
            3 => {
                interest.remove(&fd);
            }
            _ => return Err(VmError::Type { expected: "ADD|MOD|DEL".to_string(), found: op.to_string() }),
        }
        Ok(())
    }

    pub fn interest(&self, epfd: i32) -> VmResult<Vec<(i32, u32)>> {
        let instances = self.instances.lock().unwrap();
        let interest = instances.get(&epfd).ok_or_else(|| unknown("epoll", epfd as i64))?;
        Ok(interest.iter().map(|(&fd, &events)| (fd, events)).collect())
    }
}

/// One entry per mutex id: `owner`/`count` emulate re-entrant acquisition on
/// top of a non-reentrant host lock (spec.md §9 OQ3; see DESIGN.md).
struct MutexState {
    owner: Option<std::thread::ThreadId>,
    count: u32,
}

struct MutexResource {
    state: Mutex<MutexState>,
    cv: Condvar,
}

#[derive(Default)]
pub struct MutexRegistry {
    resources: Mutex<HashMap<i64, std::sync::Arc<MutexResource>>>,
    next_id: Mutex<i64>,
}

impl MutexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, mid: i64) -> VmResult<std::sync::Arc<MutexResource>> {
        self.resources.lock().unwrap().get(&mid).cloned().ok_or_else(|| unknown("mutex", mid))
    }

    pub fn create(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        let resource = MutexResource { state: Mutex::new(MutexState { owner: None, count: 0 }), cv: Condvar::new() };
        self.resources.lock().unwrap().insert(id, std::sync::Arc::new(resource));
        id
    }

    /// Blocks until acquired or `cancel` observes cancellation, in which
    /// case it returns [`VmError::Interrupted`] without touching `owner`/
    /// `count` (spec.md §5: "a syscall that was cancelled before acquiring
    /// its resource must leave the registry unchanged").
    pub fn lock(&self, mid: i64, cancel: &CancelToken) -> VmResult<()> {
        let resource = self.get(mid)?;
        let me = std::thread::current().id();
        let mut state = resource.state.lock().unwrap();
        loop {
            match state.owner {
                Some(owner) if owner == me => {
                    state.count += 1;
                    return Ok(());
                }
                None => {
                    state.owner = Some(me);
                    state.count = 1;
                    return Ok(());
                }
                Some(_) => {
                    if cancel.is_cancelled() {
                        return Err(VmError::Interrupted);
                    }
                    let (next, _) = resource.cv.wait_timeout(state, POLL_INTERVAL).unwrap();
                    state = next;
                }
            }
        }
    }

    /// Reports busy (`0`) on reentrant acquisition even though the owning
    /// thread could in principle recurse (spec.md §9 OQ3: `MUTEX_TRYLOCK`
    /// is explicit about this, unlike `MUTEX_LOCK`).
    pub fn try_lock(&self, mid: i64) -> VmResult<bool> {
        let resource = self.get(mid)?;
        let me = std::thread::current().id();
        let mut state = resource.state.lock().unwrap();
        match state.owner {
            Some(_) => Ok(false),
            None => {
                state.owner = Some(me);
                state.count = 1;
                Ok(true)
            }
        }
    }

    pub fn unlock(&self, mid: i64) -> VmResult<()> {
        let resource = self.get(mid)?;
        let me = std::thread::current().id();
        let mut state = resource.state.lock().unwrap();
        if state.owner != Some(me) {
            return Err(VmError::Type { expected: "held by calling thread".to_string(), found: "not held".to_string() });
        }
        state.count -= 1;
        if state.count == 0 {
            state.owner = None;
            resource.cv.notify_one();
        }
        Ok(())
    }

    /// Used by `COND_WAIT` to release then reacquire the mutex around the
    /// condvar wait (spec.md §4.10 family 6).
    pub fn release_for_wait(&self, mid: i64) -> VmResult<()> {
        self.unlock(mid)
    }

    /// Always blocks to completion regardless of `cancel`'s state: once the
    /// condvar wait itself has ended (signaled, timed out, or cancelled),
    /// `COND_WAIT` must still give the mutex back before returning, the
    /// same way `pthread_cond_wait` reacquires unconditionally.
    pub fn reacquire_after_wait(&self, mid: i64) -> VmResult<()> {
        self.lock(mid, &CancelToken::new())
    }
}

struct CondResource {
    lock: Mutex<()>,
    cv: Condvar,
}

#[derive(Default)]
pub struct CondRegistry {
    resources: Mutex<HashMap<i64, std::sync::Arc<CondResource>>>,
    next_id: Mutex<i64>,
}

/// `COND_WAIT`'s result code (spec.md §4.10 family 6).
pub enum WaitOutcome {
    Signaled,
    TimedOut,
    Interrupted,
}

impl CondRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, cid: i64) -> VmResult<std::sync::Arc<CondResource>> {
        self.resources.lock().unwrap().get(&cid).cloned().ok_or_else(|| unknown("cond", cid))
    }

    pub fn create(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        let resource = CondResource { lock: Mutex::new(()), cv: Condvar::new() };
        self.resources.lock().unwrap().insert(id, std::sync::Arc::new(resource));
        id
    }

    /// Releases `mid`, waits for a signal/timeout/cancellation, then
    /// reacquires `mid` regardless of how the wait ended (spec.md §4.10
    /// family 6: `COND_WAIT` always gives the mutex back, the same way
    /// `pthread_cond_wait` does). Polls in slices no longer than
    /// `POLL_INTERVAL` so `cancel` and the real deadline are both checked
    /// without needing the condvar itself to be interruptible.
    pub fn wait(
        &self,
        cid: i64,
        mutexes: &MutexRegistry,
        mid: i64,
        timeout_ms: Option<u64>,
        cancel: &CancelToken,
    ) -> VmResult<WaitOutcome> {
        let resource = self.get(cid)?;
        mutexes.release_for_wait(mid)?;
        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        let mut guard = resource.lock.lock().unwrap();
        let outcome = loop {
            if cancel.is_cancelled() {
                break WaitOutcome::Interrupted;
            }
            let slice = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        break WaitOutcome::TimedOut;
                    }
                    (d - now).min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };
            let (next, timed_out) = resource.cv.wait_timeout(guard, slice).unwrap();
            guard = next;
            if !timed_out.timed_out() {
                break WaitOutcome::Signaled;
            }
        };
        mutexes.reacquire_after_wait(mid)?;
        Ok(outcome)
    }

    pub fn signal(&self, cid: i64) -> VmResult<()> {
        self.get(cid)?.cv.notify_one();
        Ok(())
    }

    pub fn broadcast(&self, cid: i64) -> VmResult<()> {
        self.get(cid)?.cv.notify_all();
        Ok(())
    }
}

struct SemResource {
    permits: Mutex<i64>,
    cv: Condvar,
}

#[derive(Default)]
pub struct SemRegistry {
    resources: Mutex<HashMap<i64, std::sync::Arc<SemResource>>>,
    next_id: Mutex<i64>,
}

impl SemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, sid: i64) -> VmResult<std::sync::Arc<SemResource>> {
        self.resources.lock().unwrap().get(&sid).cloned().ok_or_else(|| unknown("semaphore", sid))
    }

    pub fn create(&self, permits: i64) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        let resource = SemResource { permits: Mutex::new(permits), cv: Condvar::new() };
        self.resources.lock().unwrap().insert(id, std::sync::Arc::new(resource));
        id
    }

    /// Blocks until a permit is available or `cancel` observes cancellation,
    /// in which case it returns [`VmError::Interrupted`] without
    /// decrementing `permits`.
    pub fn wait(&self, sid: i64, cancel: &CancelToken) -> VmResult<()> {
        let resource = self.get(sid)?;
        let mut permits = resource.permits.lock().unwrap();
        while *permits <= 0 {
            if cancel.is_cancelled() {
                return Err(VmError::Interrupted);
            }
            let (next, _) = resource.cv.wait_timeout(permits, POLL_INTERVAL).unwrap();
            permits = next;
        }
        *permits -= 1;
        Ok(())
    }

    pub fn post(&self, sid: i64) -> VmResult<()> {
        let resource = self.get(sid)?;
        let mut permits = resource.permits.lock().unwrap();
        *permits += 1;
        resource.cv.notify_one();
        Ok(())
    }
}

/// Readers/writers tracked explicitly since a held `RwLockReadGuard`/
/// `RwLockWriteGuard` cannot outlive one syscall handler call.
struct RwState {
    readers: u32,
    writer: bool,
}

struct RwlockResource {
    state: Mutex<RwState>,
    cv: Condvar,
}

#[derive(Default)]
pub struct RwlockRegistry {
    resources: Mutex<HashMap<i64, std::sync::Arc<RwlockResource>>>,
    next_id: Mutex<i64>,
}

impl RwlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, rwl: i64) -> VmResult<std::sync::Arc<RwlockResource>> {
        self.resources.lock().unwrap().get(&rwl).cloned().ok_or_else(|| unknown("rwlock", rwl))
    }

    pub fn create(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        let resource = RwlockResource { state: Mutex::new(RwState { readers: 0, writer: false }), cv: Condvar::new() };
        self.resources.lock().unwrap().insert(id, std::sync::Arc::new(resource));
        id
    }

    pub fn read_lock(&self, rwl: i64) -> VmResult<()> {
        let resource = self.get(rwl)?;
        let mut state = resource.state.lock().unwrap();
        while state.writer {
            state = resource.cv.wait(state).unwrap();
        }
        state.readers += 1;
        Ok(())
    }

    pub fn write_lock(&self, rwl: i64) -> VmResult<()> {
        let resource = self.get(rwl)?;
        let mut state = resource.state.lock().unwrap();
        while state.writer || state.readers > 0 {
            state = resource.cv.wait(state).unwrap();
        }
        state.writer = true;
        Ok(())
    }

    /// A single `UNLOCK` releases whichever side the caller last acquired:
    /// if the lock is held for writing that side is released first, else
    /// one reader is released.
    pub fn unlock(&self, rwl: i64) -> VmResult<()> {
        let resource = self.get(rwl)?;
        let mut state = resource.state.lock().unwrap();
        if state.writer {
            state.writer = false;
        } else if state.readers > 0 {
            state.readers -= 1;
        }
        resource.cv.notify_all();
        Ok(())
    }
}
