//! Instruction generators (spec.md §4.4): one handler per IR instruction
//! kind, registered once in a constant registry and looked up by the kind of
//! instruction being lowered — the Rust analogue of the reflective
//! class-to-handler lookup the design notes (spec.md §9) call out for
//! replacement with a fixed, perfect map.

use crate::builder::ProgramBuilder;
use crate::error::{CodegenError, CodegenResult};
use crate::function::IRFunction;
use crate::instruction::{BinOp, ConstPool, Instruction, LabelId};
use crate::module::GlobalFunctionTable;
use crate::slots::SlotMap;
use lumen_common::{promote, ArithOp, Opcode, ScalarKind};
use std::collections::HashMap;

/// Mints labels for control flow synthesized by the generator itself (e.g.
/// lowering a value-producing compare into a branch), disjoint from any
/// label id already used in the function's own IR.
pub struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    pub fn starting_above(function: &IRFunction) -> Self {
        let max_existing = function
            .body
            .iter()
            .filter_map(|instr| match instr {
                Instruction::Label { id } => Some(id.0),
                Instruction::Jump { label } => Some(label.0),
                Instruction::CondJump { label, .. } => Some(label.0),
                _ => None,
            })
            .max();
        Self { next: max_existing.map(|n| n + 1).unwrap_or(0) }
    }

    pub fn fresh(&mut self) -> LabelId {
        let id = LabelId(self.next);
        self.next += 1;
        id
    }
}

pub struct GenCtx<'a> {
    pub builder: &'a mut ProgramBuilder,
    pub slots: &'a SlotMap,
    pub consts: &'a ConstPool,
    pub functions: &'a GlobalFunctionTable,
    pub function_name: &'a str,
    pub labels: &'a mut LabelAllocator,
}

impl<'a> GenCtx<'a> {
    fn slot_of(&self, register: crate::value::Register) -> CodegenResult<u64> {
        self.slots
            .slot_of(register)
            .ok_or_else(|| CodegenError::UnassignedRegister { register: register.to_string() })
    }

    /// The sticky kind recorded for a slot: whatever the builder last saw
    /// written there, falling back to the slot allocator's initial
    /// parameter-kind assignment (spec.md §3: "the prefix is sticky").
    fn kind_of_slot(&self, slot: u64) -> CodegenResult<ScalarKind> {
        self.builder
            .slot_type(slot)
            .or_else(|| self.slots.initial_kind_of(slot))
            .ok_or(CodegenError::UnassignedRegister { register: format!("slot {}", slot) })
    }

    /// `<kind>_LOAD lhs`, inserting a conversion if `kind` is narrower than
    /// `target` (spec.md §4.4: "Emit `<kind>_LOAD lhs`, inserting a
    /// conversion if needed").
    fn load_widened(&mut self, slot: u64, kind: ScalarKind, target: ScalarKind) {
        self.emit_load(slot, kind);
        if kind != target {
            self.builder.emit(Opcode::Convert(kind, target), vec![]);
        }
    }

    /// `Ref` has no slot in the typed arithmetic/compare kind order (spec.md
    /// §4.1 reserves `0x00E0..=0x00EF` for it instead), so loads/stores/
    /// pushes of a reference-kind slot or constant route through `R_LOAD`/
    /// `R_STORE`/`R_PUSH` rather than the typed family.
    fn emit_load(&mut self, slot: u64, kind: ScalarKind) {
        if kind == ScalarKind::Ref {
            self.builder.emit(Opcode::RefLoad, vec![slot.to_string()]);
        } else {
            self.builder.emit(Opcode::Load(kind), vec![slot.to_string()]);
        }
    }

    fn emit_store(&mut self, slot: u64, kind: ScalarKind) {
        if kind == ScalarKind::Ref {
            self.builder.emit(Opcode::RefStore, vec![slot.to_string()]);
        } else {
            self.builder.emit(Opcode::Store(kind), vec![slot.to_string()]);
        }
    }

    fn emit_push_literal(&mut self, kind: ScalarKind, token: String) {
        if kind == ScalarKind::Ref {
            self.builder.emit(Opcode::RefPush, vec![token]);
        } else {
            self.builder.emit(Opcode::Push(kind), vec![token]);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum InstrKind {
    LoadConst,
    Move,
    BinaryOp,
    UnaryOp,
    Jump,
    CondJump,
    Label,
    Call,
    Return,
}

fn kind_of(instruction: &Instruction) -> InstrKind {
    match instruction {
        Instruction::LoadConst { .. } => InstrKind::LoadConst,
        Instruction::Move { .. } => InstrKind::Move,
        Instruction::BinaryOp { .. } => InstrKind::BinaryOp,
        Instruction::UnaryOp { .. } => InstrKind::UnaryOp,
        Instruction::Jump { .. } => InstrKind::Jump,
        Instruction::CondJump { .. } => InstrKind::CondJump,
        Instruction::Label { .. } => InstrKind::Label,
        Instruction::Call { .. } => InstrKind::Call,
        Instruction::Return { .. } => InstrKind::Return,
    }
}

type GeneratorFn = fn(&mut GenCtx, &Instruction) -> CodegenResult<()>;

/// Built once and immutable thereafter (spec.md §4.4).
pub struct GeneratorRegistry {
    handlers: HashMap<InstrKind, GeneratorFn>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        let mut handlers: HashMap<InstrKind, GeneratorFn> = HashMap::new();
        handlers.insert(InstrKind::LoadConst, gen_load_const);
        handlers.insert(InstrKind::Move, gen_move);
        handlers.insert(InstrKind::BinaryOp, gen_binary_op);
        handlers.insert(InstrKind::UnaryOp, gen_unary_op);
        handlers.insert(InstrKind::Jump, gen_jump);
        handlers.insert(InstrKind::CondJump, gen_cond_jump);
        handlers.insert(InstrKind::Label, gen_label);
        handlers.insert(InstrKind::Call, gen_call);
        handlers.insert(InstrKind::Return, gen_return);
        Self { handlers }
    }

    pub fn generate(&self, ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
        let kind = kind_of(instruction);
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| CodegenError::UnhandledInstructionKind { kind: format!("{:?}", kind) })?;
        handler(ctx, instruction)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn gen_load_const(ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
    let Instruction::LoadConst { dst, constant } = instruction else { unreachable!() };
    let constant = ctx.consts.get(*constant);
    let kind = constant.kind();
    ctx.emit_push_literal(kind, constant.literal_token());
    let dst_slot = ctx.slot_of(*dst)?;
    ctx.emit_store(dst_slot, kind);
    ctx.builder.set_slot_type(dst_slot, kind);
    Ok(())
}

fn gen_move(ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
    let Instruction::Move { dst, src } = instruction else { unreachable!() };
    let src_slot = ctx.slot_of(*src)?;
    let kind = ctx.kind_of_slot(src_slot)?;
    ctx.emit_load(src_slot, kind);
    let dst_slot = ctx.slot_of(*dst)?;
    ctx.emit_store(dst_slot, kind);
    ctx.builder.set_slot_type(dst_slot, kind);
    Ok(())
}

fn gen_binary_op(ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
    let Instruction::BinaryOp { op, dst, lhs, rhs } = instruction else { unreachable!() };
    let lhs_slot = ctx.slot_of(*lhs)?;
    let rhs_slot = ctx.slot_of(*rhs)?;
    let lhs_kind = ctx.kind_of_slot(lhs_slot)?;
    let rhs_kind = ctx.kind_of_slot(rhs_slot)?;
    let widened = promote(lhs_kind, rhs_kind);
    if widened == ScalarKind::Ref {
        return Err(CodegenError::KindMismatch {
            expected: "a numeric kind".to_string(),
            found: widened.to_string(),
        });
    }

    match op {
        BinOp::Arith(arith) => {
            if arith.is_bitwise() && !widened.is_integral() {
                return Err(CodegenError::KindMismatch {
                    expected: "an integral kind".to_string(),
                    found: widened.to_string(),
                });
            }
            ctx.load_widened(lhs_slot, lhs_kind, widened);
            ctx.load_widened(rhs_slot, rhs_kind, widened);
            ctx.builder.emit(Opcode::Arith(widened, *arith), vec![]);
            let dst_slot = ctx.slot_of(*dst)?;
            ctx.builder.emit(Opcode::Store(widened), vec![dst_slot.to_string()]);
            ctx.builder.set_slot_type(dst_slot, widened);
        }
        BinOp::Compare(cmp) => {
            // There is no value-producing compare opcode (spec.md §4.9 only
            // defines compare-*and-branch*), so a compare used as a value is
            // synthesized: branch on the comparator, then push the literal
            // 0 or 1 on whichever side was taken, matching spec.md §4.4's
            // "result is always stored as I(0|1)".
            ctx.load_widened(lhs_slot, lhs_kind, widened);
            ctx.load_widened(rhs_slot, rhs_kind, widened);
            let on_true = ctx.labels.fresh();
            let end = ctx.labels.fresh();
            ctx.builder.emit_cond_jump(Opcode::Compare(widened, *cmp), on_true);
            ctx.builder.emit(Opcode::Push(ScalarKind::Int), vec!["0".to_string()]);
            ctx.builder.emit_jump(end);
            ctx.builder.emit_label(on_true)?;
            ctx.builder.emit(Opcode::Push(ScalarKind::Int), vec!["1".to_string()]);
            ctx.builder.emit_label(end)?;
            let dst_slot = ctx.slot_of(*dst)?;
            ctx.builder.emit(Opcode::Store(ScalarKind::Int), vec![dst_slot.to_string()]);
            ctx.builder.set_slot_type(dst_slot, ScalarKind::Int);
        }
    }
    Ok(())
}

fn gen_unary_op(ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
    let Instruction::UnaryOp { op, dst, src } = instruction else { unreachable!() };
    if *op != ArithOp::Neg {
        return Err(CodegenError::KindMismatch {
            expected: "NEG".to_string(),
            found: format!("{:?}", op),
        });
    }
    let src_slot = ctx.slot_of(*src)?;
    let kind = ctx.kind_of_slot(src_slot)?;
    if kind == ScalarKind::Ref {
        return Err(CodegenError::KindMismatch {
            expected: "a numeric kind".to_string(),
            found: kind.to_string(),
        });
    }
    ctx.builder.emit(Opcode::Load(kind), vec![src_slot.to_string()]);
    ctx.builder.emit(Opcode::Arith(kind, ArithOp::Neg), vec![]);
    let dst_slot = ctx.slot_of(*dst)?;
    ctx.builder.emit(Opcode::Store(kind), vec![dst_slot.to_string()]);
    ctx.builder.set_slot_type(dst_slot, kind);
    Ok(())
}

fn gen_jump(ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
    let Instruction::Jump { label } = instruction else { unreachable!() };
    ctx.builder.emit_jump(*label);
    Ok(())
}

fn gen_cond_jump(ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
    let Instruction::CondJump { cmp, lhs, rhs, label } = instruction else { unreachable!() };
    let lhs_slot = ctx.slot_of(*lhs)?;
    let rhs_slot = ctx.slot_of(*rhs)?;
    let lhs_kind = ctx.kind_of_slot(lhs_slot)?;
    let rhs_kind = ctx.kind_of_slot(rhs_slot)?;
    let widened = promote(lhs_kind, rhs_kind);
    if widened == ScalarKind::Ref {
        return Err(CodegenError::KindMismatch {
            expected: "a numeric kind".to_string(),
            found: widened.to_string(),
        });
    }
    ctx.load_widened(lhs_slot, lhs_kind, widened);
    ctx.load_widened(rhs_slot, rhs_kind, widened);
    ctx.builder.emit_cond_jump(Opcode::Compare(widened, *cmp), *label);
    Ok(())
}

fn gen_label(ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
    let Instruction::Label { id } = instruction else { unreachable!() };
    ctx.builder.emit_label(*id)
}

fn gen_call(ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
    let Instruction::Call { dst, callee, args } = instruction else { unreachable!() };
    let param_kinds = ctx.functions.param_types(callee)?.to_vec();
    if param_kinds.len() != args.len() {
        return Err(CodegenError::ArityMismatch {
            callee: callee.clone(),
            expected: param_kinds.len(),
            actual: args.len(),
        });
    }
    for &arg in args {
        let slot = ctx.slot_of(arg)?;
        let kind = ctx.kind_of_slot(slot)?;
        ctx.emit_load(slot, kind);
    }
    ctx.builder.emit_call(callee, args.len());
    if let Some(dst) = dst {
        let return_kind = ctx.functions.return_type(callee)?;
        let dst_slot = ctx.slot_of(*dst)?;
        ctx.emit_store(dst_slot, return_kind);
        ctx.builder.set_slot_type(dst_slot, return_kind);
    }
    Ok(())
}

fn gen_return(ctx: &mut GenCtx, instruction: &Instruction) -> CodegenResult<()> {
    let Instruction::Return { value } = instruction else { unreachable!() };
    let declared = ctx.functions.return_type(ctx.function_name)?;
    if let Some(value) = value {
        let slot = ctx.slot_of(*value)?;
        let produced = ctx.kind_of_slot(slot)?;
        ctx.emit_load(slot, produced);
        if produced != declared && produced.is_numeric() && declared.is_numeric() {
            ctx.builder.emit(Opcode::Convert(produced, declared), vec![]);
        }
    }
    if ctx.function_name == "main" {
        ctx.builder.emit(Opcode::Halt, vec![]);
    } else {
        ctx.builder.emit(Opcode::Ret, vec![]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::ConstKey;
    use crate::value::Register;
    use lumen_common::{Comparator, Constant};
    use pretty_assertions::assert_eq;

    fn ctx_for<'a>(
        builder: &'a mut ProgramBuilder,
        slots: &'a SlotMap,
        consts: &'a ConstPool,
        functions: &'a GlobalFunctionTable,
        labels: &'a mut LabelAllocator,
    ) -> GenCtx<'a> {
        GenCtx { builder, slots, consts, functions, function_name: "f", labels }
    }

    #[test]
    fn arithmetic_widens_to_the_wider_operand_kind() {
        let r0 = Register(0);
        let r1 = Register(1);
        let r2 = Register(2);
        let mut func = IRFunction::new("f", vec![r0, r1]);
        let instr = Instruction::BinaryOp {
            op: BinOp::Arith(ArithOp::Add),
            dst: r2,
            lhs: r0,
            rhs: r1,
        };
        func.push(instr.clone());
        let slots = crate::slots::allocate_slots(&func, &[ScalarKind::Int, ScalarKind::Long]);
        let consts = ConstPool::new();
        let mut functions = GlobalFunctionTable::new();
        functions.register("f", ScalarKind::Long, vec![ScalarKind::Int, ScalarKind::Long]).unwrap();
        let mut labels = LabelAllocator::starting_above(&func);
        let mut builder = ProgramBuilder::new();
        builder.begin_function("f");
        let mut ctx = ctx_for(&mut builder, &slots, &consts, &functions, &mut labels);
        gen_binary_op(&mut ctx, &instr).unwrap();
        assert_eq!(builder.slot_type(2), Some(ScalarKind::Long));
    }

    #[test]
    fn value_compare_synthesizes_a_branch_that_stores_zero_or_one() {
        let r0 = Register(0);
        let r1 = Register(1);
        let r2 = Register(2);
        let mut func = IRFunction::new("f", vec![r0, r1]);
        let instr = Instruction::BinaryOp {
            op: BinOp::Compare(Comparator::Lt),
            dst: r2,
            lhs: r0,
            rhs: r1,
        };
        func.push(instr.clone());
        let slots = crate::slots::allocate_slots(&func, &[ScalarKind::Int, ScalarKind::Int]);
        let consts = ConstPool::new();
        let mut functions = GlobalFunctionTable::new();
        functions.register("f", ScalarKind::Int, vec![ScalarKind::Int, ScalarKind::Int]).unwrap();
        let mut labels = LabelAllocator::starting_above(&func);
        let mut builder = ProgramBuilder::new();
        builder.begin_function("f");
        let mut ctx = ctx_for(&mut builder, &slots, &consts, &functions, &mut labels);
        gen_binary_op(&mut ctx, &instr).unwrap();
        builder.end_function().unwrap();
        let program = builder.build().unwrap();
        assert_eq!(program.instructions[0].opcode, Opcode::Load(ScalarKind::Int).encode());
        assert_eq!(program.instructions[2].opcode, Opcode::Compare(ScalarKind::Int, Comparator::Lt).encode());
    }

    #[test]
    fn call_with_wrong_argument_count_is_rejected() {
        let r0 = Register(0);
        let func = IRFunction::new("f", vec![r0]);
        let slots = crate::slots::allocate_slots(&func, &[ScalarKind::Int]);
        let consts = ConstPool::new();
        let mut functions = GlobalFunctionTable::new();
        functions.register("f", ScalarKind::Void, vec![ScalarKind::Int]).unwrap();
        functions.register("g", ScalarKind::Int, vec![ScalarKind::Int, ScalarKind::Int]).unwrap();
        let mut labels = LabelAllocator::starting_above(&func);
        let mut builder = ProgramBuilder::new();
        builder.begin_function("f");
        let mut ctx = ctx_for(&mut builder, &slots, &consts, &functions, &mut labels);
        let instr = Instruction::Call { dst: None, callee: "g".to_string(), args: vec![r0] };
        let err = gen_call(&mut ctx, &instr).unwrap_err();
        assert!(matches!(err, CodegenError::ArityMismatch { .. }));
    }

    #[test]
    fn bitwise_op_on_a_floating_kind_is_rejected() {
        let r0 = Register(0);
        let r1 = Register(1);
        let r2 = Register(2);
        let mut func = IRFunction::new("f", vec![r0, r1]);
        let instr = Instruction::BinaryOp { op: BinOp::Arith(ArithOp::And), dst: r2, lhs: r0, rhs: r1 };
        func.push(instr.clone());
        let slots = crate::slots::allocate_slots(&func, &[ScalarKind::Double, ScalarKind::Double]);
        let consts = ConstPool::new();
        let mut functions = GlobalFunctionTable::new();
        functions.register("f", ScalarKind::Double, vec![ScalarKind::Double, ScalarKind::Double]).unwrap();
        let mut labels = LabelAllocator::starting_above(&func);
        let mut builder = ProgramBuilder::new();
        builder.begin_function("f");
        let mut ctx = ctx_for(&mut builder, &slots, &consts, &functions, &mut labels);
        let err = gen_binary_op(&mut ctx, &instr).unwrap_err();
        assert!(matches!(err, CodegenError::KindMismatch { .. }));
    }

    #[test]
    fn load_const_records_the_constants_kind_on_the_destination_slot() {
        let r0 = Register(0);
        let mut func = IRFunction::new("f", vec![]);
        let key = func.consts.intern(Constant::Double(2.5));
        let instr = Instruction::LoadConst { dst: r0, constant: key };
        func.push(instr.clone());
        let slots = crate::slots::allocate_slots(&func, &[]);
        let mut functions = GlobalFunctionTable::new();
        functions.register("f", ScalarKind::Double, vec![]).unwrap();
        let mut labels = LabelAllocator::starting_above(&func);
        let mut builder = ProgramBuilder::new();
        builder.begin_function("f");
        let consts = func.consts.clone();
        let mut ctx = ctx_for(&mut builder, &slots, &consts, &functions, &mut labels);
        gen_load_const(&mut ctx, &instr).unwrap();
        assert_eq!(builder.slot_type(0), Some(ScalarKind::Double));
        let _ = ConstKey(0);
    }
}
