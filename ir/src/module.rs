//! Function/global tables (spec.md §4.6): process-wide registries binding
//! function names to signatures and global variables to reserved slot
//! indices, populated before code generation begins.

use crate::error::CodegenError;
use crate::function::IRFunction;
use indexmap::IndexMap;
use lumen_common::{global_index_to_slot, ScalarKind};

#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub return_kind: ScalarKind,
    pub param_kinds: Vec<ScalarKind>,
}

/// `name -> (returnKind, paramKinds[])`. `register` must be called exactly
/// once per function; a second registration under the same name is a hard
/// error (spec.md §4.6).
#[derive(Debug, Default)]
pub struct GlobalFunctionTable {
    signatures: IndexMap<String, FunctionSignature>,
}

impl GlobalFunctionTable {
    pub fn new() -> Self {
        Self { signatures: IndexMap::new() }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        return_kind: ScalarKind,
        param_kinds: Vec<ScalarKind>,
    ) -> Result<(), CodegenError> {
        let name = name.into();
        if self.signatures.contains_key(&name) {
            return Err(CodegenError::DuplicateFunction { name });
        }
        self.signatures.insert(name, FunctionSignature { return_kind, param_kinds });
        Ok(())
    }

    pub fn param_types(&self, name: &str) -> Result<&[ScalarKind], CodegenError> {
        self.signatures
            .get(name)
            .map(|sig| sig.param_kinds.as_slice())
            .ok_or_else(|| CodegenError::UnknownFunction { name: name.to_string() })
    }

    pub fn return_type(&self, name: &str) -> Result<ScalarKind, CodegenError> {
        self.signatures
            .get(name)
            .map(|sig| sig.return_kind)
            .ok_or_else(|| CodegenError::UnknownFunction { name: name.to_string() })
    }
}

/// Binds global variable names to reserved slot indices in the global slot
/// region (spec.md §3: `BASE = 10^6`). Indices are assigned densely and
/// never reused, mirroring the slot allocator's "no reuse" policy (spec.md
/// §4.2).
#[derive(Debug, Default)]
pub struct GlobalVarTable {
    slots: IndexMap<String, u64>,
    next_index: u64,
}

impl GlobalVarTable {
    pub fn new() -> Self {
        Self { slots: IndexMap::new(), next_index: 0 }
    }

    /// Reserve a slot for `name` if it doesn't already have one; returns the
    /// absolute slot number (`BASE + index`).
    pub fn declare(&mut self, name: impl Into<String>) -> u64 {
        let name = name.into();
        if let Some(&index) = self.slots.get(&name) {
            return global_index_to_slot(index);
        }
        let index = self.next_index;
        self.next_index += 1;
        self.slots.insert(name, index);
        global_index_to_slot(index)
    }

    pub fn slot_of(&self, name: &str) -> Result<u64, CodegenError> {
        self.slots
            .get(name)
            .map(|&index| global_index_to_slot(index))
            .ok_or_else(|| CodegenError::UnknownGlobal { name: name.to_string() })
    }
}

/// The whole compilation unit: every function to lower, plus the tables
/// that must be fully populated before generation starts.
#[derive(Debug, Default)]
pub struct IRProgram {
    pub functions: Vec<IRFunction>,
    pub function_table: GlobalFunctionTable,
    pub globals: GlobalVarTable,
}

impl IRProgram {
    pub fn new() -> Self {
        Self::default()
    }
}
