//! VM-level errors (spec.md §7). A fatal error in a regular opcode aborts
//! the program with a formatted stderr message; the same categories raised
//! from inside a syscall instead set `errno`/`errstr` and push `-1` (see
//! `crate::syscall`).

use lumen_common::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmError {
    #[error("operand of kind {found} cannot be used where {expected} was expected")]
    Type { expected: String, found: String },

    #[error("call to undefined address {address}")]
    UnknownAddress { address: usize },

    #[error("read of slot {slot} before it was ever stored")]
    UnsetSlot { slot: u64 },

    #[error("unregistered syscall code {code}")]
    UnknownSyscall { code: u16 },

    #[error("integer divide/mod by zero")]
    DivideByZero,

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("RET on the root frame's call stack")]
    ReturnBelowRoot,

    #[error("unknown resource id {id} in {registry}")]
    UnknownResource { registry: &'static str, id: i64 },

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("unparseable image line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    #[error("unsupported opcode {opcode}")]
    UnsupportedOpcode { opcode: u32 },

    #[error("blocking call observed cancellation")]
    Interrupted,
}

impl VmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VmError::Type { .. } => ErrorKind::Type,
            VmError::UnknownAddress { .. } | VmError::UnknownSyscall { .. } | VmError::UnsetSlot { .. } => {
                ErrorKind::Resolution
            }
            VmError::DivideByZero => ErrorKind::Arithmetic,
            VmError::StackUnderflow | VmError::ReturnBelowRoot => ErrorKind::Stack,
            VmError::UnknownResource { .. } => ErrorKind::Resource,
            VmError::Io(_) => ErrorKind::Io,
            VmError::Syntax { .. } | VmError::UnsupportedOpcode { .. } => ErrorKind::Syntax,
            VmError::Interrupted => ErrorKind::Interrupted,
        }
    }

    /// Render the normative one-line failure (spec.md §7) at a given
    /// program counter and opcode mnemonic.
    pub fn at(&self, pc: usize, opcode: &str) -> String {
        lumen_common::format_failure(self.kind(), &self.to_string(), Some((pc, opcode)))
    }
}

impl From<std::io::Error> for VmError {
    fn from(err: std::io::Error) -> Self {
        VmError::Io(err.to_string())
    }
}

pub type VmResult<T> = Result<T, VmError>;
