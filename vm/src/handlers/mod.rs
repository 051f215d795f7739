//! Per-opcode-family handlers (spec.md §4.9). `dispatch` owns `pc` and the
//! call stack; everything here is a pure function over the operand stack
//! and/or the current frame's locals.

pub mod arithmetic;
pub mod compare;
pub mod conversion;
pub mod memory;
pub mod reference;
pub mod register;
pub mod stack_ops;
