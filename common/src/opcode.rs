//! The frozen opcode space (spec.md §4.1): a 32-bit integer space of which
//! only `0x0000..=0x04FF` is defined, partitioned by leading byte into
//! typed arithmetic/compare, conversions, reference ops, stack ops, flow,
//! register moves, and system calls.

use crate::kind::ScalarKind;
use std::fmt;

/// The six scalar kinds that participate in the typed opcode families, in
/// the fixed order used to compute numeric opcodes.
const KIND_ORDER: [ScalarKind; 6] = [
    ScalarKind::Byte,
    ScalarKind::Short,
    ScalarKind::Int,
    ScalarKind::Long,
    ScalarKind::Float,
    ScalarKind::Double,
];

fn kind_index(kind: ScalarKind) -> Option<usize> {
    KIND_ORDER.iter().position(|&k| k == kind)
}

/// An arithmetic or bitwise op within a typed family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Inc,
    And,
    Or,
    Xor,
}

impl ArithOp {
    /// Bitwise ops are only defined for integral kinds (spec.md §4.9).
    pub fn is_bitwise(self) -> bool {
        matches!(self, ArithOp::And | ArithOp::Or | ArithOp::Xor)
    }

    pub fn is_unary(self) -> bool {
        matches!(self, ArithOp::Neg | ArithOp::Inc)
    }

    fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "ADD",
            ArithOp::Sub => "SUB",
            ArithOp::Mul => "MUL",
            ArithOp::Div => "DIV",
            ArithOp::Mod => "MOD",
            ArithOp::Neg => "NEG",
            ArithOp::Inc => "INC",
            ArithOp::And => "AND",
            ArithOp::Or => "OR",
            ArithOp::Xor => "XOR",
        }
    }
}

/// A relational comparator, used both by `BinaryOp(compare)` (which always
/// stores `I(0|1)`) and by the typed compare-and-branch opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparator {
    fn mnemonic(self) -> &'static str {
        match self {
            Comparator::Eq => "CE",
            Comparator::Ne => "CNE",
            Comparator::Gt => "CG",
            Comparator::Ge => "CGE",
            Comparator::Lt => "CL",
            Comparator::Le => "CLE",
        }
    }

    pub fn holds<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            Comparator::Eq => lhs == rhs,
            Comparator::Ne => lhs != rhs,
            Comparator::Gt => lhs > rhs,
            Comparator::Ge => lhs >= rhs,
            Comparator::Lt => lhs < rhs,
            Comparator::Le => lhs <= rhs,
        }
    }
}

/// Fixed order of the 19 per-kind operation slots; each kind reserves 32
/// consecutive opcodes (only 19 are populated) so `0x0000..=0x00BF` covers
/// all six kinds with room to spare, matching the range spec.md §4.1 gives
/// typed arithmetic & compare.
const SLOTS_PER_KIND: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TypedSlot {
    Arith(ArithOp),
    Push,
    Load,
    Store,
    Compare(Comparator),
}

const TYPED_SLOT_ORDER: [TypedSlot; 19] = [
    TypedSlot::Arith(ArithOp::Add),
    TypedSlot::Arith(ArithOp::Sub),
    TypedSlot::Arith(ArithOp::Mul),
    TypedSlot::Arith(ArithOp::Div),
    TypedSlot::Arith(ArithOp::Mod),
    TypedSlot::Arith(ArithOp::Neg),
    TypedSlot::Arith(ArithOp::Inc),
    TypedSlot::Arith(ArithOp::And),
    TypedSlot::Arith(ArithOp::Or),
    TypedSlot::Arith(ArithOp::Xor),
    TypedSlot::Push,
    TypedSlot::Load,
    TypedSlot::Store,
    TypedSlot::Compare(Comparator::Eq),
    TypedSlot::Compare(Comparator::Ne),
    TypedSlot::Compare(Comparator::Gt),
    TypedSlot::Compare(Comparator::Ge),
    TypedSlot::Compare(Comparator::Lt),
    TypedSlot::Compare(Comparator::Le),
];

fn slot_index(slot: TypedSlot) -> u32 {
    TYPED_SLOT_ORDER.iter().position(|&s| s == slot).unwrap() as u32
}

/// All 30 `(from, to)` scalar conversion pairs, in a fixed enumeration order
/// used to number `0x00C0..=0x00DF`.
fn conversion_pairs() -> Vec<(ScalarKind, ScalarKind)> {
    let mut pairs = Vec::with_capacity(30);
    for &from in &KIND_ORDER {
        for &to in &KIND_ORDER {
            if from != to {
                pairs.push((from, to));
            }
        }
    }
    pairs
}

/// A decoded opcode: the meaning behind the numeric value stored in the
/// image. `Opcode::encode`/`Opcode::decode` are the only place the numeric
/// layout of spec.md §4.1 is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Arith(ScalarKind, ArithOp),
    Push(ScalarKind),
    Load(ScalarKind),
    Store(ScalarKind),
    Compare(ScalarKind, Comparator),
    Convert(ScalarKind, ScalarKind),
    RefPush,
    RefLoad,
    RefStore,
    Pop,
    Dup,
    Swap,
    Jump,
    Call,
    Ret,
    Mov,
    Halt,
    Syscall,
}

impl Opcode {
    pub fn encode(self) -> u32 {
        match self {
            Opcode::Arith(kind, op) => {
                kind_index(kind).unwrap() as u32 * SLOTS_PER_KIND + slot_index(TypedSlot::Arith(op))
            }
            Opcode::Push(kind) => kind_index(kind).unwrap() as u32 * SLOTS_PER_KIND + slot_index(TypedSlot::Push),
            Opcode::Load(kind) => kind_index(kind).unwrap() as u32 * SLOTS_PER_KIND + slot_index(TypedSlot::Load),
            Opcode::Store(kind) => kind_index(kind).unwrap() as u32 * SLOTS_PER_KIND + slot_index(TypedSlot::Store),
            Opcode::Compare(kind, cmp) => {
                kind_index(kind).unwrap() as u32 * SLOTS_PER_KIND + slot_index(TypedSlot::Compare(cmp))
            }
            Opcode::Convert(from, to) => {
                let index = conversion_pairs()
                    .iter()
                    .position(|&p| p == (from, to))
                    .expect("X2X conversions are never encoded");
                0x00C0 + index as u32
            }
            Opcode::RefPush => 0x00E0,
            Opcode::RefLoad => 0x00E1,
            Opcode::RefStore => 0x00E2,
            Opcode::Pop => 0x0100,
            Opcode::Dup => 0x0101,
            Opcode::Swap => 0x0102,
            Opcode::Jump => 0x0200,
            Opcode::Call => 0x0201,
            Opcode::Ret => 0x0202,
            Opcode::Mov => 0x0300,
            Opcode::Halt => 0x0400,
            Opcode::Syscall => 0x0401,
        }
    }

    pub fn decode(code: u32) -> Option<Opcode> {
        match code {
            0x0000..=0x00BF => {
                let kind_idx = (code / SLOTS_PER_KIND) as usize;
                let slot_idx = (code % SLOTS_PER_KIND) as usize;
                let kind = *KIND_ORDER.get(kind_idx)?;
                let slot = *TYPED_SLOT_ORDER.get(slot_idx)?;
                Some(match slot {
                    TypedSlot::Arith(op) => Opcode::Arith(kind, op),
                    TypedSlot::Push => Opcode::Push(kind),
                    TypedSlot::Load => Opcode::Load(kind),
                    TypedSlot::Store => Opcode::Store(kind),
                    TypedSlot::Compare(cmp) => Opcode::Compare(kind, cmp),
                })
            }
            0x00C0..=0x00DF => {
                let (from, to) = *conversion_pairs().get((code - 0x00C0) as usize)?;
                Some(Opcode::Convert(from, to))
            }
            0x00E0 => Some(Opcode::RefPush),
            0x00E1 => Some(Opcode::RefLoad),
            0x00E2 => Some(Opcode::RefStore),
            0x0100 => Some(Opcode::Pop),
            0x0101 => Some(Opcode::Dup),
            0x0102 => Some(Opcode::Swap),
            0x0200 => Some(Opcode::Jump),
            0x0201 => Some(Opcode::Call),
            0x0202 => Some(Opcode::Ret),
            0x0300 => Some(Opcode::Mov),
            0x0400 => Some(Opcode::Halt),
            0x0401 => Some(Opcode::Syscall),
            _ => None,
        }
    }

    /// Mnemonic used in disassembly and diagnostics, e.g. `I_ADD`, `D2I`,
    /// `L_CGE`, `CALL`.
    pub fn mnemonic(self) -> String {
        match self {
            Opcode::Arith(kind, op) => format!("{}_{}", kind.tag(), op.mnemonic()),
            Opcode::Push(kind) => format!("{}_PUSH", kind.tag()),
            Opcode::Load(kind) => format!("{}_LOAD", kind.tag()),
            Opcode::Store(kind) => format!("{}_STORE", kind.tag()),
            Opcode::Compare(kind, cmp) => format!("{}_{}", kind.tag(), cmp.mnemonic()),
            Opcode::Convert(from, to) => format!("{}2{}", from.tag(), to.tag()),
            Opcode::RefPush => "R_PUSH".to_string(),
            Opcode::RefLoad => "R_LOAD".to_string(),
            Opcode::RefStore => "R_STORE".to_string(),
            Opcode::Pop => "POP".to_string(),
            Opcode::Dup => "DUP".to_string(),
            Opcode::Swap => "SWAP".to_string(),
            Opcode::Jump => "JUMP".to_string(),
            Opcode::Call => "CALL".to_string(),
            Opcode::Ret => "RET".to_string(),
            Opcode::Mov => "MOV".to_string(),
            Opcode::Halt => "HALT".to_string(),
            Opcode::Syscall => "SYSCALL".to_string(),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_typed_opcode_round_trips() {
        for &kind in &KIND_ORDER {
            for &op in &[
                ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div, ArithOp::Mod,
                ArithOp::Neg, ArithOp::Inc, ArithOp::And, ArithOp::Or, ArithOp::Xor,
            ] {
                let oc = Opcode::Arith(kind, op);
                assert_eq!(Opcode::decode(oc.encode()), Some(oc));
                assert!(oc.encode() <= 0x00BF);
            }
            for &cmp in &[Comparator::Eq, Comparator::Ne, Comparator::Gt, Comparator::Ge, Comparator::Lt, Comparator::Le] {
                let oc = Opcode::Compare(kind, cmp);
                assert_eq!(Opcode::decode(oc.encode()), Some(oc));
            }
            assert_eq!(Opcode::decode(Opcode::Push(kind).encode()), Some(Opcode::Push(kind)));
            assert_eq!(Opcode::decode(Opcode::Load(kind).encode()), Some(Opcode::Load(kind)));
            assert_eq!(Opcode::decode(Opcode::Store(kind).encode()), Some(Opcode::Store(kind)));
        }
    }

    #[test]
    fn every_conversion_round_trips_and_excludes_identity() {
        for &from in &KIND_ORDER {
            for &to in &KIND_ORDER {
                if from == to {
                    continue;
                }
                let oc = Opcode::Convert(from, to);
                assert_eq!(Opcode::decode(oc.encode()), Some(oc));
                assert!((0x00C0..=0x00DF).contains(&oc.encode()));
            }
        }
    }

    #[test]
    fn flow_and_system_opcodes_are_in_their_documented_ranges() {
        assert!((0x0100..=0x01FF).contains(&Opcode::Pop.encode()));
        assert!((0x0200..=0x02FF).contains(&Opcode::Call.encode()));
        assert!((0x0300..=0x03FF).contains(&Opcode::Mov.encode()));
        assert!((0x0400..=0x04FF).contains(&Opcode::Halt.encode()));
    }

    #[test]
    fn unknown_codes_decode_to_none() {
        assert_eq!(Opcode::decode(0x04FF), None);
        assert_eq!(Opcode::decode(0x0500), None);
    }
}
