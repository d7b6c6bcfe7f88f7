//! Crate root: wires together the compilation pipeline.
//!
//! One class goes in, one VM instruction stream comes out. The stages:
//! - `tokenizer` pulls typed tokens out of the source on demand.
//! - `symbol_table` tracks class and subroutine scope declarations.
//! - `vm_writer` renders stack-machine operations as VM text.
//! - `engine` parses the class and drives the other three, emitting code as
//!   each production is recognised.
//! - `error` centralises the diagnostics shared by the other modules.
//! - `driver` maps input paths onto compiled `.vm` files.

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod logger;
pub mod symbol_table;
pub mod tokenizer;
pub mod vm_writer;

pub use config::{CompileOptions, LookupMode};
pub use error::{CompileError, CompileResult};

/// Compile one class into VM code with the default (strict) options.
pub fn compile(source: &str) -> CompileResult<String> {
  compile_with(source, CompileOptions::default())
}

/// Compile one class into VM code. Either the complete instruction stream is
/// returned or the first error; there is no partial output.
pub fn compile_with(source: &str, options: CompileOptions) -> CompileResult<String> {
  engine::CompilationEngine::new(source, options).compile_class()
}
