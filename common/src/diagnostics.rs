//! Shared user-visible failure formatting (spec.md §7): "one line per error,
//! in the form `<kind>: <message> [at pc=N opcode=OP]`, emitted to stderr".

use std::fmt;

/// The error taxonomy of spec.md §7, shared so both `ir` and `vm` errors
/// report under a common set of kind names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Type,
    Resolution,
    Arithmetic,
    Stack,
    Resource,
    Io,
    Syntax,
    Interrupted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Type => "TypeError",
            ErrorKind::Resolution => "ResolutionError",
            ErrorKind::Arithmetic => "ArithmeticError",
            ErrorKind::Stack => "StackError",
            ErrorKind::Resource => "ResourceError",
            ErrorKind::Io => "IoError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Interrupted => "Interrupted",
        };
        write!(f, "{}", name)
    }
}

/// Render the normative one-line failure message. `site` is `Some((pc,
/// opcode_mnemonic))` when the failure occurred while executing an
/// instruction; generation-time failures pass `None`.
pub fn format_failure(kind: ErrorKind, message: &str, site: Option<(usize, &str)>) -> String {
    match site {
        Some((pc, opcode)) => format!("{}: {} [at pc={} opcode={}]", kind, message, pc, opcode),
        None => format!("{}: {}", kind, message),
    }
}
