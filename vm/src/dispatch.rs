//! The dispatch loop (spec.md §4.8): decode, execute, advance `pc`, until
//! `HALT` or a root-frame `RET` reports `PROGRAM_END`.

use crate::config::VmConfig;
use crate::errors::{VmError, VmResult};
use crate::frame::{CallStack, GlobalSlots, StackFrame};
use crate::handlers::{arithmetic, compare, conversion, memory, reference, register, stack_ops};
use crate::image::Image;
use crate::stack::OperandStack;
use crate::syscall::{self, Syscalls};
use lumen_common::Opcode;
use std::sync::Arc;

/// Owns every piece of mutable VM state for one program run: the operand
/// stack, the call stack, the shared global slots, and the process-wide
/// syscall registries (spec.md §3/§5).
pub struct Vm {
    image: Image,
    stack: OperandStack,
    calls: CallStack,
    globals: Arc<GlobalSlots>,
    syscalls: Syscalls,
    config: VmConfig,
}

impl Vm {
    pub fn new(image: Image, config: VmConfig) -> Self {
        let globals = GlobalSlots::new();
        let calls = CallStack::new(globals.clone());
        let syscalls = Syscalls::new(&config);
        Self { image, stack: OperandStack::new(), calls, globals, syscalls, config }
    }

    /// A cooperative cancellation handle (spec.md §5) for this run: calling
    /// `.cancel()` on it interrupts a `MUTEX_LOCK`/`COND_WAIT`/`SEM_WAIT`
    /// currently blocked inside [`Vm::run`] from another thread.
    pub fn cancel_token(&self) -> crate::syscall::registry::CancelToken {
        self.syscalls.cancel_token()
    }

    fn operand(instruction_operands: &[String], index: usize) -> VmResult<&str> {
        instruction_operands
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| VmError::Syntax { line: 0, reason: "missing operand".to_string() })
    }

    fn operand_u64(operands: &[String], index: usize) -> VmResult<u64> {
        Self::operand(operands, index)?
            .parse()
            .map_err(|_| VmError::Syntax { line: 0, reason: "operand is not a slot index".to_string() })
    }

    fn operand_usize(operands: &[String], index: usize) -> VmResult<usize> {
        Self::operand(operands, index)?
            .parse()
            .map_err(|_| VmError::Syntax { line: 0, reason: "operand is not an address".to_string() })
    }

    /// Runs to completion, returning the value (if any) left on top of the
    /// operand stack by the root frame's `HALT`/`RET` (spec.md §8). A
    /// fatal error is rendered as the normative one-line failure message
    /// (spec.md §7) rather than returned as a raw [`VmError`], since that
    /// is the only point in the loop where the failing `pc`/opcode is known.
    pub fn run(&mut self) -> Result<Option<crate::value::Value>, String> {
        let mut pc: usize = 0;
        loop {
            let step_result = self.execute_one(pc);
            match step_result {
                Ok(Some(next)) => pc = next,
                Ok(None) => break,
                Err(message) => return Err(message),
            }
        }
        Ok(self.stack.peek().ok().cloned())
    }

    fn execute_one(&mut self, pc: usize) -> Result<Option<usize>, String> {
        let instruction = self
            .image
            .instructions
            .get(pc)
            .ok_or(VmError::UnknownAddress { address: pc })
            .map_err(|err| err.at(pc, "?"))?
            .clone();
        let opcode = Opcode::decode(instruction.opcode)
            .ok_or(VmError::UnsupportedOpcode { opcode: instruction.opcode })
            .map_err(|err| err.at(pc, &format!("0x{:04X}", instruction.opcode)))?;

        if self.config.trace {
            log::trace!("pc={pc} opcode={} operands={:?}", opcode.mnemonic(), instruction.operands);
        }

        self.step(pc, opcode, &instruction.operands).map_err(|err| {
            let message = err.at(pc, &opcode.mnemonic());
            log::error!("{message}");
            message
        })
    }

    /// Executes one instruction, returning the next `pc` or `None` when the
    /// program has ended (spec.md §4.8's `PROGRAM_END`).
    fn step(&mut self, pc: usize, opcode: Opcode, operands: &[String]) -> VmResult<Option<usize>> {
        match opcode {
            Opcode::Arith(kind, op) => {
                arithmetic::handle(&mut self.stack, kind, op)?;
                Ok(Some(pc + 1))
            }
            Opcode::Push(kind) => {
                memory::push(&mut self.stack, kind, Self::operand(operands, 0)?)?;
                Ok(Some(pc + 1))
            }
            Opcode::Load(_kind) => {
                let slot = Self::operand_u64(operands, 0)?;
                memory::load(&mut self.stack, &self.calls.peek().locals, slot)?;
                Ok(Some(pc + 1))
            }
            Opcode::Store(_kind) => {
                let slot = Self::operand_u64(operands, 0)?;
                memory::store(&mut self.stack, &mut self.calls.peek_mut().locals, slot)?;
                Ok(Some(pc + 1))
            }
            Opcode::Compare(kind, cmp) => {
                let target = Self::operand_usize(operands, 0)?;
                let taken = compare::holds(&mut self.stack, kind, cmp)?;
                Ok(Some(if taken { target } else { pc + 1 }))
            }
            Opcode::Convert(from, to) => {
                conversion::handle(&mut self.stack, from, to)?;
                Ok(Some(pc + 1))
            }
            Opcode::RefPush => {
                reference::push(&mut self.stack, Self::operand(operands, 0)?)?;
                Ok(Some(pc + 1))
            }
            Opcode::RefLoad => {
                let slot = Self::operand_u64(operands, 0)?;
                reference::load(&mut self.stack, &self.calls.peek().locals, slot)?;
                Ok(Some(pc + 1))
            }
            Opcode::RefStore => {
                let slot = Self::operand_u64(operands, 0)?;
                reference::store(&mut self.stack, &mut self.calls.peek_mut().locals, slot)?;
                Ok(Some(pc + 1))
            }
            Opcode::Pop => {
                stack_ops::pop(&mut self.stack)?;
                Ok(Some(pc + 1))
            }
            Opcode::Dup => {
                stack_ops::dup(&mut self.stack)?;
                Ok(Some(pc + 1))
            }
            Opcode::Swap => {
                stack_ops::swap(&mut self.stack)?;
                Ok(Some(pc + 1))
            }
            Opcode::Jump => {
                let target = Self::operand_usize(operands, 0)?;
                Ok(Some(target))
            }
            Opcode::Call => {
                let target = Self::operand_usize(operands, 0)?;
                let n_args = Self::operand_usize(operands, 1)?;
                let mut args = Vec::with_capacity(n_args);
                for _ in 0..n_args {
                    args.push(self.stack.pop()?);
                }
                args.reverse();
                let mut frame = StackFrame::new(pc + 1, format!("<fn@{target}>"), self.globals.clone());
                for (slot, value) in args.into_iter().enumerate() {
                    frame.locals.set(slot as u64, value);
                }
                self.calls.push(frame);
                Ok(Some(target))
            }
            Opcode::Ret => match self.calls.pop() {
                Ok(mut frame) => {
                    frame.locals.clear();
                    Ok(Some(frame.return_pc))
                }
                Err(VmError::ReturnBelowRoot) => Ok(None),
                Err(other) => Err(other),
            },
            Opcode::Mov => {
                let dst = Self::operand_u64(operands, 0)?;
                let src = Self::operand_u64(operands, 1)?;
                register::mov(&mut self.calls.peek_mut().locals, dst, src)?;
                Ok(Some(pc + 1))
            }
            Opcode::Halt => Ok(None),
            Opcode::Syscall => {
                let code: u16 = Self::operand(operands, 0)?
                    .parse()
                    .map_err(|_| VmError::Syntax { line: 0, reason: "syscall operand is not a code".to_string() })?;
                match syscall::dispatch(&self.syscalls, &mut self.stack, code) {
                    Ok(()) => {}
                    Err(err) if syscall::errno::is_catchable(&err) => {
                        self.syscalls.errno.record(&err);
                        self.stack.push(crate::value::Value::Int(-1));
                    }
                    Err(err) => return Err(err),
                }
                Ok(Some(pc + 1))
            }
        }
    }
}
