//! The program builder (spec.md §4.3): accumulates emitted instructions per
//! function, tracks slot types, resolves jump labels and call targets to
//! absolute addresses, and assembles the final linear program.

use crate::error::CodegenError;
use crate::instruction::LabelId;
use indexmap::IndexMap;
use lumen_common::{Opcode, ScalarKind};
use std::fmt;

/// One instruction in the linear image: an opcode plus its textual operand
/// tokens (spec.md §3, `VM Instruction`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmInstruction {
    pub opcode: u32,
    pub operands: Vec<String>,
}

impl fmt::Display for VmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

/// An ordered, immutable sequence of `VmInstruction`s with a known `main`
/// entry at index 0 (spec.md §3, `Program`).
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instructions: Vec<VmInstruction>,
}

impl Program {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for instruction in &self.instructions {
            out.push_str(&instruction.to_string());
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    instructions: Vec<VmInstruction>,
    function_addrs: IndexMap<String, usize>,
    call_fixups: Vec<(usize, String)>,
    // Label scope is per function: jumps never cross a function boundary,
    // so labels and their fixups are resolved at `end_function` rather than
    // carried to the final, whole-program `build`.
    labels: IndexMap<LabelId, usize>,
    label_fixups: Vec<(usize, LabelId)>,
    current_slot_types: IndexMap<u64, ScalarKind>,
    current_function: Option<String>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_function(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.function_addrs.insert(name.clone(), self.instructions.len());
        self.current_function = Some(name);
        self.current_slot_types.clear();
        self.labels.clear();
        self.label_fixups.clear();
    }

    /// Resolves this function's label fixups, then appends its terminator:
    /// `HALT` for `main`, `RET` otherwise (spec.md §4.3). A generator that
    /// already emitted its own terminator leaves the appended one
    /// unreachable, which is harmless.
    pub fn end_function(&mut self) -> Result<(), CodegenError> {
        for (instr_index, label) in std::mem::take(&mut self.label_fixups) {
            let address = self
                .labels
                .get(&label)
                .copied()
                .ok_or_else(|| CodegenError::UndefinedLabel { label: label.to_string() })?;
            self.instructions[instr_index].operands[0] = address.to_string();
        }

        let is_main = self.current_function.as_deref() == Some("main");
        if is_main {
            self.emit(Opcode::Halt, vec![]);
        } else {
            self.emit(Opcode::Ret, vec![]);
        }
        self.current_function = None;
        Ok(())
    }

    pub fn emit(&mut self, opcode: Opcode, operands: Vec<String>) -> usize {
        let address = self.instructions.len();
        self.instructions.push(VmInstruction { opcode: opcode.encode(), operands });
        address
    }

    pub fn emit_label(&mut self, id: LabelId) -> Result<(), CodegenError> {
        if self.labels.insert(id, self.instructions.len()).is_some() {
            return Err(CodegenError::DuplicateLabel { label: id.to_string() });
        }
        Ok(())
    }

    /// Emit `JUMP ?` with a placeholder target, fixed up at
    /// [`Self::end_function`].
    pub fn emit_jump(&mut self, label: LabelId) -> usize {
        let address = self.emit(Opcode::Jump, vec!["?".to_string()]);
        self.label_fixups.push((address, label));
        address
    }

    /// Emit a typed conditional compare-and-branch with a placeholder
    /// target, fixed up at [`Self::end_function`].
    pub fn emit_cond_jump(&mut self, opcode: Opcode, label: LabelId) -> usize {
        let address = self.emit(opcode, vec!["?".to_string()]);
        self.label_fixups.push((address, label));
        address
    }

    /// Emit `CALL ? nArgs` with a placeholder target resolved to the
    /// callee's entry address at [`Self::build`] (the callee may not have
    /// been emitted yet).
    pub fn emit_call(&mut self, callee: &str, n_args: usize) -> usize {
        let address = self.emit(Opcode::Call, vec!["?".to_string(), n_args.to_string()]);
        self.call_fixups.push((address, callee.to_string()));
        address
    }

    pub fn set_slot_type(&mut self, slot: u64, kind: ScalarKind) {
        self.current_slot_types.insert(slot, kind);
    }

    pub fn slot_type(&self, slot: u64) -> Option<ScalarKind> {
        self.current_slot_types.get(&slot).copied()
    }

    /// Resolve every call placeholder to its callee's entry address; fails
    /// if the callee was never emitted.
    pub fn build(mut self) -> Result<Program, CodegenError> {
        for (instr_index, callee) in &self.call_fixups {
            let address = self
                .function_addrs
                .get(callee)
                .copied()
                .ok_or_else(|| CodegenError::UnknownFunction { name: callee.clone() })?;
            self.instructions[*instr_index].operands[0] = address.to_string();
        }
        Ok(Program { instructions: self.instructions })
    }

    pub fn function_entry(&self, name: &str) -> Option<usize> {
        self.function_addrs.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::LabelId;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn forward_jump_resolves_to_the_label_address() {
        let mut builder = ProgramBuilder::new();
        builder.begin_function("main");
        let end = LabelId(0);
        builder.emit_jump(end);
        builder.emit(Opcode::Pop, vec![]);
        builder.emit_label(end).unwrap();
        builder.end_function().unwrap();
        let program = builder.build().unwrap();
        assert_eq!(program.instructions[0].operands[0], "2");
    }

    #[test]
    fn undefined_label_fails_at_end_of_function() {
        let mut builder = ProgramBuilder::new();
        builder.begin_function("main");
        builder.emit_jump(LabelId(99));
        assert!(matches!(builder.end_function(), Err(CodegenError::UndefinedLabel { .. })));
    }

    #[test]
    fn duplicate_label_is_rejected_immediately() {
        let mut builder = ProgramBuilder::new();
        builder.begin_function("main");
        builder.emit_label(LabelId(0)).unwrap();
        let err = builder.emit_label(LabelId(0)).unwrap_err();
        assert!(matches!(err, CodegenError::DuplicateLabel { .. }));
    }

    #[test]
    fn label_ids_do_not_leak_across_functions() {
        let mut builder = ProgramBuilder::new();
        builder.begin_function("f");
        builder.emit_label(LabelId(0)).unwrap();
        builder.end_function().unwrap();
        builder.begin_function("g");
        // Reusing LabelId(0) in a different function must not collide with f's.
        builder.emit_label(LabelId(0)).unwrap();
        builder.end_function().unwrap();
    }

    #[test]
    fn call_to_a_function_emitted_later_is_fixed_up() {
        let mut builder = ProgramBuilder::new();
        builder.begin_function("main");
        builder.emit_call("helper", 0);
        builder.end_function().unwrap();
        builder.begin_function("helper");
        builder.end_function().unwrap();
        let program = builder.build().unwrap();
        assert_eq!(program.instructions[0].operands[0], "2");
    }

    #[test]
    fn main_gets_halt_others_get_ret() {
        let mut builder = ProgramBuilder::new();
        builder.begin_function("main");
        builder.end_function().unwrap();
        builder.begin_function("f");
        builder.end_function().unwrap();
        let program = builder.build().unwrap();
        assert_eq!(program.instructions[0].opcode, Opcode::Halt.encode());
        assert_eq!(program.instructions[1].opcode, Opcode::Ret.encode());
    }

    #[test_case("main", Opcode::Halt.encode(); "main gets halt")]
    #[test_case("helper", Opcode::Ret.encode(); "a non-main function gets ret")]
    #[test_case("main_menu", Opcode::Ret.encode(); "only an exact match of main is special-cased")]
    fn terminator_is_chosen_by_exact_function_name(name: &str, expected_opcode: u32) {
        let mut builder = ProgramBuilder::new();
        builder.begin_function(name);
        builder.end_function().unwrap();
        let program = builder.build().unwrap();
        assert_eq!(program.instructions[0].opcode, expected_opcode);
    }
}
