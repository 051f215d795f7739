//! Process-wide `errno`/`errstr` (spec.md §4.10/§7): a syscall-level
//! failure in one of the catchable categories is recorded here and answered
//! with a pushed `-1` instead of aborting the program.

use crate::errors::VmError;
use lumen_common::ErrorKind;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct ErrnoState {
    inner: Mutex<(i32, String)>,
}

fn code_of(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Type => 1,
        ErrorKind::Resolution => 2,
        ErrorKind::Arithmetic => 3,
        ErrorKind::Stack => 4,
        ErrorKind::Resource => 5,
        ErrorKind::Io => 6,
        ErrorKind::Syntax => 7,
        ErrorKind::Interrupted => 8,
    }
}

impl ErrnoState {
    pub fn record(&self, err: &VmError) {
        let mut guard = self.inner.lock().unwrap();
        *guard = (code_of(err.kind()), err.to_string());
    }

    pub fn code(&self) -> i32 {
        self.inner.lock().unwrap().0
    }

    pub fn message(&self) -> String {
        self.inner.lock().unwrap().1.clone()
    }
}

/// Whether a syscall-level failure of this category is caught and reported
/// via `errno`/`-1` (spec.md §7) rather than aborting the program. Only
/// `SyntaxError` (malformed image) and an unregistered syscall code itself
/// are dispatch-level failures that still propagate as fatal.
pub fn is_catchable(err: &VmError) -> bool {
    !matches!(err, VmError::UnknownSyscall { .. } | VmError::Syntax { .. } | VmError::UnsupportedOpcode { .. })
}
