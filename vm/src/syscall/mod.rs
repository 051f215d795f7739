//! The OS-facing syscall layer (spec.md §4.10): eight families addressed by
//! fixed 16-bit codes, fanned out from `SYSCALL`'s single operand.

pub mod array;
pub mod env;
pub mod epoll;
pub mod errno;
pub mod fd;
pub mod fs;
pub mod process;
pub mod registry;
pub mod socket;
pub mod sync;

use crate::config::VmConfig;
use crate::errors::{VmError, VmResult};
use crate::stack::OperandStack;
use registry::{CancelToken, CondRegistry, EnvRegistry, EpollRegistry, FDTable, MutexRegistry, RwlockRegistry, SemRegistry};

/// Every process-wide registry a syscall handler might need, plus the
/// errno/errstr state syscalls report failures through (spec.md §5: "these
/// registries are process-wide... shared across every VM invocation in the
/// same process").
#[derive(Default)]
pub struct Syscalls {
    pub env: EnvRegistry,
    pub fds: FDTable,
    pub epoll: EpollRegistry,
    pub mutexes: MutexRegistry,
    pub conds: CondRegistry,
    pub sems: SemRegistry,
    pub rwlocks: RwlockRegistry,
    pub errno: errno::ErrnoState,
    pub cancel: CancelToken,
}

impl Syscalls {
    pub fn new(config: &VmConfig) -> Self {
        Self { env: EnvRegistry::new(config.inherit_env), ..Self::default() }
    }

    /// A clone of the process-wide cancellation flag (spec.md §5): any
    /// holder can cancel `MUTEX_LOCK`/`COND_WAIT`/`SEM_WAIT` currently
    /// blocked on these registries.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

/// Routes a syscall code to its handler. Unrecognized codes are
/// `UnknownSyscall`, which `is_catchable` reports as a dispatch-level
/// failure rather than an errno-reported one (spec.md §7).
pub fn dispatch(syscalls: &Syscalls, stack: &mut OperandStack, code: u16) -> VmResult<()> {
    match code {
        env::GETENV => env::getenv(stack, &syscalls.env),
        env::SETENV => env::setenv(stack, &syscalls.env),
        env::UNSETENV => env::unsetenv(stack, &syscalls.env),

        fs::MKDIR => fs::mkdir(stack),
        fs::RMDIR => fs::rmdir(stack),
        fs::CHDIR => fs::chdir(stack),
        fs::GETCWD => fs::getcwd(stack),
        fs::CHMOD => fs::chmod(stack),
        fs::FCHMOD => fs::fchmod(stack, &syscalls.fds),
        fs::UNLINK => fs::unlink(stack),
        fs::LINK => fs::link(stack),
        fs::SYMLINK => fs::symlink(stack),

        fd::OPEN => fd::open(stack, &syscalls.fds),
        fd::CLOSE => fd::close(stack, &syscalls.fds),
        fd::READ => fd::read(stack, &syscalls.fds),
        fd::WRITE => fd::write(stack, &syscalls.fds),
        fd::DUP => fd::dup(stack, &syscalls.fds),
        fd::PIPE => fd::pipe(stack, &syscalls.fds),
        fd::STDIN_READ => fd::stdin_read(stack, &syscalls.fds),
        fd::STDOUT_WRITE => fd::stdout_write(stack, &syscalls.fds),
        fd::STDERR_WRITE => fd::stderr_write(stack, &syscalls.fds),

        epoll::EPOLL_CREATE => epoll::create(stack, &syscalls.epoll),
        epoll::EPOLL_CTL => epoll::ctl(stack, &syscalls.epoll),
        epoll::EPOLL_WAIT => epoll::wait(stack, &syscalls.epoll, &syscalls.fds),

        socket::SOCKET => socket::socket(stack, &syscalls.fds),
        socket::BIND => socket::bind(stack, &syscalls.fds),
        socket::LISTEN => socket::listen(stack, &syscalls.fds),
        socket::ACCEPT => socket::accept(stack, &syscalls.fds),
        socket::CONNECT => socket::connect(stack, &syscalls.fds),
        socket::SEND => socket::send(stack, &syscalls.fds),
        socket::RECV => socket::recv(stack, &syscalls.fds),
        socket::SENDTO => socket::sendto(stack, &syscalls.fds),
        socket::RECVFROM => socket::recvfrom(stack, &syscalls.fds),
        socket::SHUTDOWN => socket::shutdown(stack, &syscalls.fds),

        sync::MUTEX_NEW => sync::mutex_new(stack, &syscalls.mutexes),
        sync::MUTEX_LOCK => sync::mutex_lock(stack, &syscalls.mutexes, &syscalls.cancel),
        sync::MUTEX_TRYLOCK => sync::mutex_trylock(stack, &syscalls.mutexes),
        sync::MUTEX_UNLOCK => sync::mutex_unlock(stack, &syscalls.mutexes),
        sync::COND_NEW => sync::cond_new(stack, &syscalls.conds),
        sync::COND_WAIT => sync::cond_wait(stack, &syscalls.conds, &syscalls.mutexes, &syscalls.cancel),
        sync::COND_SIGNAL => sync::cond_signal(stack, &syscalls.conds),
        sync::COND_BROADCAST => sync::cond_broadcast(stack, &syscalls.conds),
        sync::SEM_NEW => sync::sem_new(stack, &syscalls.sems),
        sync::SEM_WAIT => sync::sem_wait(stack, &syscalls.sems, &syscalls.cancel),
        sync::SEM_POST => sync::sem_post(stack, &syscalls.sems),
        sync::RWLOCK_NEW => sync::rwlock_new(stack, &syscalls.rwlocks),
        sync::RWLOCK_RDLOCK => sync::rwlock_rdlock(stack, &syscalls.rwlocks),
        sync::RWLOCK_WRLOCK => sync::rwlock_wrlock(stack, &syscalls.rwlocks),
        sync::RWLOCK_UNLOCK => sync::rwlock_unlock(stack, &syscalls.rwlocks),

        process::SLEEP => process::sleep(stack),
        process::ERRNO => process::errno(stack, &syscalls.errno),
        process::ERRSTR => process::errstr(stack, &syscalls.errno),
        process::MEMINFO => process::meminfo(stack),
        process::RANDOM_BYTES => process::random_bytes(stack),
        process::NCPU => process::ncpu(stack),

        array::ARR_LEN => array::len(stack),
        array::ARR_GET => array::get(stack),
        array::ARR_SET => array::set(stack),
        array::ARR_PUSH => array::push(stack),
        array::ARR_POP => array::pop(stack),
        array::ARR_INSERT => array::insert(stack),
        array::ARR_CLEAR => array::clear(stack),

        other => Err(VmError::UnknownSyscall { code: other }),
    }
}
