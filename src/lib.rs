//! velox: a compiler front end for a small C-like language.
//!
//! Source text flows through [`scanner`] → [`parser`] → [`codegen`] and comes
//! out as an [`ir::Module`], whose `Display` impl is LLVM assembly ready for
//! `llc`. The [`toolchain`] and [`artifacts`] modules support the driver binary.

pub mod artifacts;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod ir;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod toolchain;

pub use error::{CompileError, CompileResult};
pub use scanner::tokenize;

/// Tokenize and parse a whole program.
pub fn parse(source: &str) -> CompileResult<ast::Program> {
    parser::parse(tokenize(source)?)
}

/// Compile source text into an IR module, optionally tagged with a target triple.
pub fn compile(source: &str, target_triple: Option<&str>) -> CompileResult<ir::Module> {
    let program = parse(source)?;
    codegen::lower(&program, target_triple)
}
