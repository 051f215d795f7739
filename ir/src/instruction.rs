//! IR instruction variants (spec.md §3).

use crate::value::Register;
use lumen_common::{ArithOp, Comparator, Constant};
use std::fmt;

/// A symbolic jump target. Resolved to an absolute address by
/// [`crate::builder::ProgramBuilder::build`]; never observed at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub u32);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".L{}", self.0)
    }
}

/// Either arm of `BinaryOp`: an arithmetic/bitwise op or a comparator.
/// Kept distinct from [`lumen_common::Opcode`] because the IR level has not
/// yet chosen a scalar kind — that happens during generation, by widening
/// the operand slots' recorded kinds (spec.md §4.4), not by a kind carried
/// on the instruction itself. Carrying a redundant kind tag here would let
/// it silently disagree with the slot map, which is the sticky, single
/// source of truth for a register's type (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Arith(ArithOp),
    Compare(Comparator),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    LoadConst { dst: Register, constant: ConstKey },
    Move { dst: Register, src: Register },
    BinaryOp { op: BinOp, dst: Register, lhs: Register, rhs: Register },
    UnaryOp { op: ArithOp, dst: Register, src: Register },
    Jump { label: LabelId },
    CondJump { cmp: Comparator, lhs: Register, rhs: Register, label: LabelId },
    Label { id: LabelId },
    Call { dst: Option<Register>, callee: String, args: Vec<Register> },
    Return { value: Option<Register> },
}

/// `Constant` does not implement `Eq`/`Hash` (it carries floats), so IR
/// instructions reference constants indirectly through a small interned key
/// stored alongside the function body. Mirrors the teacher's pattern of
/// keeping instruction enums `Hash`-able for use in maps (e.g.
/// `ControlFlowGraph` lookups) by pushing non-`Eq` payloads out of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstKey(pub u32);

/// Per-function pool of constants referenced by [`ConstKey`].
#[derive(Debug, Default, Clone)]
pub struct ConstPool {
    values: Vec<Constant>,
}

impl ConstPool {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn intern(&mut self, constant: Constant) -> ConstKey {
        let key = ConstKey(self.values.len() as u32);
        self.values.push(constant);
        key
    }

    pub fn get(&self, key: ConstKey) -> &Constant {
        &self.values[key.0 as usize]
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::LoadConst { dst, constant } => write!(f, "{} = const {:?}", dst, constant),
            Instruction::Move { dst, src } => write!(f, "{} = {}", dst, src),
            Instruction::BinaryOp { op, dst, lhs, rhs } => write!(f, "{} = {} {:?} {}", dst, lhs, op, rhs),
            Instruction::UnaryOp { op, dst, src } => write!(f, "{} = {:?} {}", dst, op, src),
            Instruction::Jump { label } => write!(f, "jump {}", label),
            Instruction::CondJump { cmp, lhs, rhs, label } => {
                write!(f, "if {} {:?} {} goto {}", lhs, cmp, rhs, label)
            }
            Instruction::Label { id } => write!(f, "{}:", id),
            Instruction::Call { dst, callee, args } => {
                if let Some(dst) = dst {
                    write!(f, "{} = call {}({:?})", dst, callee, args)
                } else {
                    write!(f, "call {}({:?})", callee, args)
                }
            }
            Instruction::Return { value } => match value {
                Some(v) => write!(f, "return {}", v),
                None => write!(f, "return"),
            },
        }
    }
}
