#![allow(dead_code)]

use velox::ir::{BasicBlock, Function, Instruction, Module, Terminator};
use velox::CompileError;

/// Compile and verify, panicking with the rendered diagnostic on failure.
pub fn compile(source: &str) -> Module {
    let module = match velox::compile(source, None) {
        Ok(module) => module,
        Err(err) => panic!("compilation failed:\n{}", err.render(source)),
    };
    if let Err(err) = module.verify() {
        panic!("module failed verification: {err}\n{module}");
    }
    module
}

pub fn compile_err(source: &str) -> CompileError {
    match velox::compile(source, None) {
        Ok(module) => panic!("expected a compile error, got:\n{module}"),
        Err(err) => err,
    }
}

pub fn function<'m>(module: &'m Module, name: &str) -> &'m Function {
    module
        .function(name)
        .unwrap_or_else(|| panic!("no function `{name}` in module:\n{module}"))
}

pub fn block<'f>(function: &'f Function, label: &str) -> &'f BasicBlock {
    function
        .block_by_label(label)
        .unwrap_or_else(|| panic!("no block `{label}` in `{}`:\n{function}", function.name))
}

pub fn instructions(function: &Function) -> impl Iterator<Item = &Instruction> {
    function.blocks.iter().flat_map(|b| b.instructions.iter())
}

/// Label of the block an unconditional branch goes to.
pub fn branch_target(function: &Function, block: &BasicBlock) -> Option<String> {
    match block.terminator.as_ref()? {
        Terminator::Br(target) => Some(function.block(*target).label.clone()),
        _ => None,
    }
}
