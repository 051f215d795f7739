//! Errors raised while lowering IR to the bytecode image. Generation errors
//! abort the whole build with a single diagnostic per error (spec.md §7).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("function '{name}' registered more than once")]
    DuplicateFunction { name: String },

    #[error("call to undefined function '{name}'")]
    UnknownFunction { name: String },

    #[error("reference to undefined global '{name}'")]
    UnknownGlobal { name: String },

    #[error("no generator registered for instruction kind '{kind}'")]
    UnhandledInstructionKind { kind: String },

    #[error("register {register} used before it was assigned a slot")]
    UnassignedRegister { register: String },

    #[error("label '{label}' referenced but never defined")]
    UndefinedLabel { label: String },

    #[error("label '{label}' defined more than once")]
    DuplicateLabel { label: String },

    #[error("call to '{callee}' passes {actual} argument(s), but it declares {expected}")]
    ArityMismatch { callee: String, expected: usize, actual: usize },

    #[error("value of kind {found} cannot be used where {expected} was expected")]
    KindMismatch { expected: String, found: String },
}

pub type CodegenResult<T> = Result<T, CodegenError>;
