//! `lumen_ir`: the code generator (spec.md §4) that lowers a typed IR
//! program into the linear bytecode image the virtual machine executes.
//! The pipeline per function is: allocate slots, then hand each instruction
//! to the generator registry in order, accumulating into a program builder
//! that resolves labels and call targets.

pub mod builder;
pub mod error;
pub mod function;
pub mod generator;
pub mod instruction;
pub mod module;
pub mod slots;
pub mod value;

pub use builder::{Program, ProgramBuilder, VmInstruction};
pub use error::{CodegenError, CodegenResult};
pub use function::IRFunction;
pub use generator::{GenCtx, GeneratorRegistry, LabelAllocator};
pub use instruction::{BinOp, ConstKey, ConstPool, Instruction, LabelId};
pub use module::{FunctionSignature, GlobalFunctionTable, GlobalVarTable, IRProgram};
pub use slots::{allocate_slots, SlotMap};
pub use value::{Register, RegisterAllocator};

/// Lower one function's body into `builder`, which must not already have an
/// open function (a prior call's `end_function` must have run first).
pub fn compile_function(
    builder: &mut ProgramBuilder,
    registry: &GeneratorRegistry,
    function: &IRFunction,
    functions: &GlobalFunctionTable,
) -> CodegenResult<()> {
    log::debug!("lowering function {} ({} instructions)", function.name, function.body.len());
    let param_kinds = functions.param_types(&function.name)?.to_vec();
    let slots = allocate_slots(function, &param_kinds);
    let mut labels = LabelAllocator::starting_above(function);

    builder.begin_function(function.name.clone());
    let mut ctx = GenCtx {
        builder,
        slots: &slots,
        consts: &function.consts,
        functions,
        function_name: &function.name,
        labels: &mut labels,
    };
    for instruction in &function.body {
        registry.generate(&mut ctx, instruction)?;
    }
    builder.end_function()
}

/// Lower every function of `program` into one linear image, with `main`'s
/// entry at address 0 (spec.md §3).
pub fn compile_program(program: &IRProgram) -> CodegenResult<Program> {
    let registry = GeneratorRegistry::new();
    let mut builder = ProgramBuilder::new();
    for function in &program.functions {
        if let Err(err) = compile_function(&mut builder, &registry, function, &program.function_table) {
            log::error!("codegen failed in {}: {err}", function.name);
            return Err(err);
        }
    }
    builder.build()
}
