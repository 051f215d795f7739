//! The slot allocator (spec.md §4.2): maps IR virtual registers to dense
//! per-function slot indices, with parameters occupying the first slots in
//! declaration order. No liveness analysis, no slot reuse — this trivially
//! preserves debuggability and avoids write-after-write hazards in the
//! generator, at the cost of a slot per register rather than a minimal set.

use crate::function::IRFunction;
use crate::instruction::{BinOp, Instruction};
use crate::value::Register;
use indexmap::IndexMap;
use lumen_common::ScalarKind;

/// An injective `Register -> slot index` mapping for one function, plus the
/// initial type prefix assigned to each parameter slot.
#[derive(Debug, Default, Clone)]
pub struct SlotMap {
    slots: IndexMap<Register, u64>,
    param_kinds: IndexMap<u64, ScalarKind>,
}

impl SlotMap {
    pub fn slot_of(&self, register: Register) -> Option<u64> {
        self.slots.get(&register).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The type prefix recorded for a parameter slot at allocation time, if
    /// any. Non-parameter slots get their prefix from the first instruction
    /// that writes them, tracked separately by the program builder (spec.md
    /// §4.3, `set_slot_type`/`slot_type`).
    pub fn initial_kind_of(&self, slot: u64) -> Option<ScalarKind> {
        self.param_kinds.get(&slot).copied()
    }
}

/// Walk every operand position an `Instruction` can *define* (write), in a
/// fixed order, so allocation is deterministic regardless of how the
/// generator itself later reads the instruction.
fn defined_register(instruction: &Instruction) -> Option<Register> {
    match instruction {
        Instruction::LoadConst { dst, .. } => Some(*dst),
        Instruction::Move { dst, .. } => Some(*dst),
        Instruction::BinaryOp { dst, .. } => Some(*dst),
        Instruction::UnaryOp { dst, .. } => Some(*dst),
        Instruction::Call { dst, .. } => *dst,
        Instruction::Jump { .. }
        | Instruction::CondJump { .. }
        | Instruction::Label { .. }
        | Instruction::Return { .. } => None,
    }
}

/// Every register an instruction reads, needed only so a register that is
/// read before any defining instruction in this walk (e.g. a parameter used
/// directly) still gets a slot assigned; parameters are handled up front so
/// in practice this only matters for malformed IR, where the allocator still
/// must assign *some* slot rather than panic.
fn used_registers(instruction: &Instruction) -> Vec<Register> {
    match instruction {
        Instruction::LoadConst { .. } => vec![],
        Instruction::Move { src, .. } => vec![*src],
        Instruction::BinaryOp { lhs, rhs, op: _, dst: _ } => vec![*lhs, *rhs],
        Instruction::UnaryOp { src, .. } => vec![*src],
        Instruction::Jump { .. } | Instruction::Label { .. } => vec![],
        Instruction::CondJump { lhs, rhs, .. } => vec![*lhs, *rhs],
        Instruction::Call { args, .. } => args.clone(),
        Instruction::Return { value } => value.iter().copied().collect(),
    }
}

pub fn allocate_slots(function: &IRFunction, param_kinds: &[ScalarKind]) -> SlotMap {
    let mut map = SlotMap::default();
    let mut next_slot: u64 = 0;

    for (i, &param) in function.params.iter().enumerate() {
        map.slots.insert(param, next_slot);
        if let Some(&kind) = param_kinds.get(i) {
            map.param_kinds.insert(next_slot, kind);
        }
        next_slot += 1;
    }

    let mut assign = |reg: Register, map: &mut SlotMap, next_slot: &mut u64| {
        if !map.slots.contains_key(&reg) {
            map.slots.insert(reg, *next_slot);
            *next_slot += 1;
        }
    };

    for instruction in &function.body {
        for used in used_registers(instruction) {
            assign(used, &mut map, &mut next_slot);
        }
        if let Some(def) = defined_register(instruction) {
            assign(def, &mut map, &mut next_slot);
        }
    }

    map
}

/// Used only by `BinOp` match arms elsewhere; re-exported here so callers
/// that already import `slots` don't need a second `use` for the common
/// pattern of "is this arm a compare or an arith op".
pub fn is_compare(op: BinOp) -> bool {
    matches!(op, BinOp::Compare(_))
}
