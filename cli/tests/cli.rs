//! End-to-end checks of the `lumen` binary itself (spec.md §6): image path
//! in, exit code and stderr/stdout out. Hand-encoded images, the same way
//! `vm/tests/scenarios.rs` builds them, since this crate has no dependency
//! on `lumen_ir`.

use pretty_assertions::assert_eq;
use std::io::Write;
use std::process::Command;

fn lumen() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lumen"))
}

fn image_file(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

/// `RefPush "ok\n"`, `Syscall STDOUT_WRITE`, `Pop`, `Halt` — writes `ok\n` to
/// the process's real stdout and exits 0.
#[test]
fn a_well_formed_image_runs_and_writes_to_stdout() {
    let image = image_file("224 \"ok\\n\"\n1025 4615\n256\n1024\n");
    let output = lumen().arg(image.path()).output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "ok\n");
    assert!(output.stderr.is_empty());
}

/// `RefPush "hello world"` carries a literal space inside the quoted
/// operand; the image tokenizer must keep it as one token rather than
/// splitting it into two operands.
#[test]
fn a_string_operand_containing_a_space_runs_and_writes_it_whole() {
    let image = image_file("224 \"hello world\"\n1025 4615\n256\n1024\n");
    let output = lumen().arg(image.path()).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "hello world");
    assert!(output.stderr.is_empty());
}

#[test]
fn disassemble_prints_mnemonics_instead_of_running() {
    let image = image_file("224 \"ok\\n\"\n1025 4615\n256\n1024\n");
    let output = lumen().arg("--disassemble").arg(image.path()).output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("R_PUSH"), "{text}");
    assert!(text.contains("SYSCALL"), "{text}");
    assert!(text.contains("HALT"), "{text}");
    assert!(output.stderr.is_empty(), "disassemble must not execute the image");
}

#[test]
fn a_missing_image_path_exits_nonzero_with_a_message_on_stderr() {
    let output = lumen().arg("/no/such/image.lum").output().unwrap();
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn a_fatal_vm_error_exits_nonzero_with_the_normative_message() {
    // I_PUSH 1, I_PUSH 0, I_DIV, HALT
    let image = image_file("74 1\n74 0\n67\n1024\n");
    let output = lumen().arg(image.path()).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("ArithmeticError"), "{stderr}");
}
