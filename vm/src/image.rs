//! The textual image format (spec.md §4.1/§6): one instruction per line,
//! whitespace-separated tokens, first token the decimal opcode, `#`-prefixed
//! lines are comments. The entry point is always instruction 0.

use crate::errors::{VmError, VmResult};
use lumen_common::Opcode;
use std::fmt;

/// Splits a line into whitespace-separated tokens, except that a `"`-quoted
/// run (as `Constant::literal_token`'s `{:?}`-style quoting produces for a
/// string constant) is kept as one token regardless of any whitespace it
/// contains — `split_whitespace` alone would cut `"hello world"` into two.
fn tokenize(line: &str, line_no: usize) -> VmResult<Vec<String>> {
    let unterminated = || VmError::Syntax { line: line_no + 1, reason: "unterminated string literal".to_string() };
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut end = None;
            let mut escaped = false;
            while let Some((i, ch)) = chars.next() {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    end = Some(i + ch.len_utf8());
                    break;
                }
            }
            let end = end.ok_or_else(unterminated)?;
            tokens.push(line[start..end].to_string());
        } else {
            let mut end = start + c.len_utf8();
            chars.next();
            while let Some(&(i, ch)) = chars.peek() {
                if ch.is_whitespace() || ch == '"' {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            tokens.push(line[start..end].to_string());
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: u32,
    pub operands: Vec<String>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// The loaded, immutable program (spec.md §3, `Program`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub instructions: Vec<Instruction>,
}

impl Image {
    pub fn parse(text: &str) -> VmResult<Self> {
        let mut instructions = Vec::new();
        for (line_no, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = tokenize(line, line_no)?.into_iter();
            let opcode = tokens
                .next()
                .and_then(|t| t.parse::<u32>().ok())
                .ok_or_else(|| VmError::Syntax { line: line_no + 1, reason: "missing or non-numeric opcode".to_string() })?;
            let operands: Vec<String> = tokens.collect();
            instructions.push(Instruction { opcode, operands });
        }
        Ok(Self { instructions })
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for instruction in &self.instructions {
            out.push_str(&instruction.to_string());
            out.push('\n');
        }
        out
    }

    /// A mnemonic disassembly, one line per instruction, used by
    /// `--disassemble` and by tests; not the normative on-wire form
    /// (spec.md §6 — that's `to_text`), but every structured type in this
    /// codebase carries a human-readable companion rendering.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (pc, instruction) in self.instructions.iter().enumerate() {
            let mnemonic = Opcode::decode(instruction.opcode)
                .map(|op| op.mnemonic())
                .unwrap_or_else(|| format!("0x{:04X}", instruction.opcode));
            out.push_str(&format!("{pc:>5}: {mnemonic}"));
            for operand in &instruction.operands {
                out.push(' ');
                out.push_str(operand);
            }
            out.push('\n');
        }
        out
    }
}
