//! `IRFunction` (spec.md §3): name, ordered parameters, ordered body. The
//! return type is not stored here — it lives in the `GlobalFunctionTable`
//! (spec.md §4.6), which is the single place a function's signature is
//! recorded and queried from.

use crate::instruction::{ConstPool, Instruction};
use crate::value::Register;

#[derive(Debug, Clone)]
pub struct IRFunction {
    pub name: String,
    pub params: Vec<Register>,
    pub body: Vec<Instruction>,
    pub consts: ConstPool,
}

impl IRFunction {
    pub fn new(name: impl Into<String>, params: Vec<Register>) -> Self {
        Self {
            name: name.into(),
            params,
            body: Vec::new(),
            consts: ConstPool::new(),
        }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.body.push(instruction);
    }
}
