//! End-to-end scenarios run through the full dispatch loop (spec.md §8):
//! hand-assembled images rather than `lumen_ir` output, since this crate
//! only depends on the frozen opcode encoding, not the code generator.

use lumen_common::{ArithOp, Comparator, Opcode, ScalarKind, GLOBAL_SLOT_BASE};
use lumen_vm::image::Instruction;
use lumen_vm::syscall::{epoll, fd};
use lumen_vm::{Image, Vm, VmConfig};

fn instr(opcode: Opcode, operands: &[&str]) -> Instruction {
    Instruction { opcode: opcode.encode(), operands: operands.iter().map(|s| s.to_string()).collect() }
}

fn run(instructions: Vec<Instruction>) -> Result<Option<i64>, String> {
    let image = Image { instructions };
    let mut vm = Vm::new(image, VmConfig::default());
    vm.run().map(|v| v.map(|value| value.as_i64().expect("numeric result")))
}

/// spec.md §8 scenario 1: `f(a,b) { return a+b }` called with `(2,3)`
/// leaves `5` on the caller's operand stack.
#[test]
fn add_and_return() {
    let instructions = vec![
        instr(Opcode::Push(ScalarKind::Int), &["2"]), // 0
        instr(Opcode::Push(ScalarKind::Int), &["3"]), // 1
        instr(Opcode::Call, &["4", "2"]),             // 2: call f at 4 with 2 args
        instr(Opcode::Halt, &[]),                     // 3
        instr(Opcode::Load(ScalarKind::Int), &["0"]), // 4: f entry
        instr(Opcode::Load(ScalarKind::Int), &["1"]), // 5
        instr(Opcode::Arith(ScalarKind::Int, ArithOp::Add), &[]), // 6
        instr(Opcode::Store(ScalarKind::Int), &["2"]), // 7
        instr(Opcode::Load(ScalarKind::Int), &["2"]), // 8
        instr(Opcode::Ret, &[]),                      // 9
    ];
    assert_eq!(run(instructions).unwrap(), Some(5));
}

/// spec.md §8 scenario 2: `g(a:i32, b:i64) { return a+b }` called with
/// `(2, 9_999_999_999L)` yields `10_000_000_001L`.
#[test]
fn integer_long_widening() {
    let instructions = vec![
        instr(Opcode::Push(ScalarKind::Int), &["2"]),             // 0
        instr(Opcode::Push(ScalarKind::Long), &["9999999999"]),   // 1
        instr(Opcode::Call, &["4", "2"]),                         // 2
        instr(Opcode::Halt, &[]),                                 // 3
        instr(Opcode::Load(ScalarKind::Int), &["0"]),             // 4: g entry, a
        instr(Opcode::Convert(ScalarKind::Int, ScalarKind::Long), &[]), // 5: I2L
        instr(Opcode::Load(ScalarKind::Long), &["1"]),            // 6: b
        instr(Opcode::Arith(ScalarKind::Long, ArithOp::Add), &[]), // 7
        instr(Opcode::Store(ScalarKind::Long), &["2"]),           // 8
        instr(Opcode::Load(ScalarKind::Long), &["2"]),            // 9
        instr(Opcode::Ret, &[]),                                  // 10
    ];
    assert_eq!(run(instructions).unwrap(), Some(10_000_000_001));
}

/// spec.md §8 scenario 3: `h() { return 1/0 }` terminates with an
/// `ArithmeticError` rendered at the failing instruction.
#[test]
fn div_by_zero_aborts_with_an_arithmetic_error() {
    let instructions = vec![
        instr(Opcode::Push(ScalarKind::Int), &["1"]),
        instr(Opcode::Push(ScalarKind::Int), &["0"]),
        instr(Opcode::Arith(ScalarKind::Int, ArithOp::Div), &[]),
        instr(Opcode::Halt, &[]),
    ];
    let err = run(instructions).unwrap_err();
    assert!(err.contains("ArithmeticError"), "{err}");
    assert!(err.contains("pc=2"), "{err}");
    assert!(err.contains("I_DIV"), "{err}");
}

/// spec.md §8 scenario 4: a while-loop counter incrementing to 10 returns
/// `10`.
#[test]
fn loop_counts_to_ten() {
    let instructions = vec![
        instr(Opcode::Push(ScalarKind::Int), &["0"]),             // 0
        instr(Opcode::Store(ScalarKind::Int), &["0"]),            // 1
        instr(Opcode::Load(ScalarKind::Int), &["0"]),             // 2: loop top
        instr(Opcode::Push(ScalarKind::Int), &["10"]),            // 3
        instr(Opcode::Compare(ScalarKind::Int, Comparator::Eq), &["10"]), // 4: -> end
        instr(Opcode::Load(ScalarKind::Int), &["0"]),             // 5
        instr(Opcode::Push(ScalarKind::Int), &["1"]),             // 6
        instr(Opcode::Arith(ScalarKind::Int, ArithOp::Add), &[]), // 7
        instr(Opcode::Store(ScalarKind::Int), &["0"]),            // 8
        instr(Opcode::Jump, &["2"]),                              // 9
        instr(Opcode::Load(ScalarKind::Int), &["0"]),             // 10: end
        instr(Opcode::Halt, &[]),                                 // 11
    ];
    assert_eq!(run(instructions).unwrap(), Some(10));
}

/// spec.md §8 scenario 5: a global slot written by one sequence of
/// instructions (standing in for module A's initializer) is visible to a
/// later load (standing in for module B reading `A.k`).
#[test]
fn cross_module_global_is_shared_through_the_global_slot_region() {
    let slot = GLOBAL_SLOT_BASE.to_string();
    let instructions = vec![
        instr(Opcode::Push(ScalarKind::Int), &["42"]),
        instr(Opcode::Store(ScalarKind::Int), &[&slot]),
        instr(Opcode::Load(ScalarKind::Int), &[&slot]),
        instr(Opcode::Halt, &[]),
    ];
    assert_eq!(run(instructions).unwrap(), Some(42));
}

/// spec.md §8 scenario 6: a readable descriptor shows up in `EPOLL_WAIT`.
/// Uses a pipe's read end rather than the process's real stdin, which would
/// make the test depend on how the test harness itself redirects fd 0; the
/// mechanics `EPOLL_CTL`/`EPOLL_WAIT` exercise are identical either way.
#[test]
fn epoll_wait_reports_a_readable_pipe() {
    const ADD: &str = "1";
    const READ_EVENT: &str = "1";

    let syscall = |code: u16| instr(Opcode::Syscall, &[&code.to_string()]);
    let push_int = |v: &str| instr(Opcode::Push(ScalarKind::Int), &[v]);
    let push_str = |v: &str| instr(Opcode::RefPush, &[v]);

    let instructions = vec![
        syscall(fd::PIPE),                              // 0: -> [rfd, wfd]
        instr(Opcode::RefStore, &["0"]),                 // 1: slot0 = [rfd, wfd]
        push_int("0"),                                   // 2: EPOLL_CREATE flags
        syscall(epoll::EPOLL_CREATE),                    // 3: -> epfd
        instr(Opcode::Store(ScalarKind::Int), &["1"]),  // 4: slot1 = epfd
        // write "hello\n" to the write end (slot0[1])
        instr(Opcode::RefLoad, &["0"]),
        push_int("1"),
        syscall(lumen_vm::syscall::array::ARR_GET),      // -> wfd
        push_str("\"hello\\n\""),
        syscall(fd::WRITE),
        instr(Opcode::Pop, &[]),                         // discard the byte count
        // EPOLL_CTL epfd ADD rfd READ
        instr(Opcode::Load(ScalarKind::Int), &["1"]),
        push_int(ADD),
        instr(Opcode::RefLoad, &["0"]),
        push_int("0"),
        syscall(lumen_vm::syscall::array::ARR_GET),      // -> rfd
        push_int(READ_EVENT),
        syscall(epoll::EPOLL_CTL),
        instr(Opcode::Pop, &[]),
        // EPOLL_WAIT epfd 8 1000
        instr(Opcode::Load(ScalarKind::Int), &["1"]),
        push_int("8"),
        push_int("1000"),
        syscall(epoll::EPOLL_WAIT),
        instr(Opcode::Halt, &[]),
    ];

    let image = Image { instructions };
    let mut vm = Vm::new(image, VmConfig::default());
    let result = vm.run().unwrap().expect("a value was left on the stack");
    let handle = result.as_handle().unwrap();
    let ready = handle.borrow();
    let lumen_vm::value::RefObject::Array(events) = &*ready else {
        panic!("EPOLL_WAIT must return an array");
    };
    assert_eq!(events.len(), 1, "exactly the pipe's read end should be ready");
    let lumen_vm::value::RefObject::Array(entry) = &*events[0].as_handle().unwrap().borrow() else {
        panic!("each ready event is itself a [fd, events] array");
    };
    assert_eq!(entry[1].as_i64().unwrap(), 1, "READ bit should be set");
}
