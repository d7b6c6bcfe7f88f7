//! Compiler options shared by the library entry points and the CLI.

use clap::ValueEnum;

/// How variable references that resolve in neither scope are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LookupMode {
  /// Reject the reference with an undeclared-identifier error.
  #[default]
  Strict,
  /// Fall back to sentinel values: reads push `constant 0`, stores are
  /// discarded into `temp 0`.
  Permissive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
  pub lookup: LookupMode,
}

impl CompileOptions {
  pub fn permissive() -> Self {
    Self {
      lookup: LookupMode::Permissive,
    }
  }
}
