//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics stay lightweight: every error is anchored at a byte offset in
//! the class source and rendered with the offending line and a caret under the
//! column, in the style of chibicc. Errors are fail-fast; the first one aborts
//! compilation of the class and no instruction stream is returned.

use std::fmt;

use snafu::Snafu;

use crate::symbol_table::Scope;

pub type CompileResult<T> = Result<T, CompileError>;

/// Position of a diagnostic inside the source, with the rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  pub line: usize,
  pub column: usize,
  pub snippet: String,
}

impl Location {
  /// Resolve a byte offset into a 1-based line/column pair and a caret marker.
  pub fn locate(source: &str, loc: usize) -> Self {
    let mut safe_loc = loc.min(source.len());
    while !source.is_char_boundary(safe_loc) {
      safe_loc -= 1;
    }

    let line_start = source[..safe_loc].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |i| safe_loc + i);
    let line = source[..line_start].matches('\n').count() + 1;
    let column = source[line_start..safe_loc].chars().count() + 1;

    let text = source[line_start..line_end].trim_end_matches('\r');
    let marker = format!("{}^", " ".repeat(column - 1));
    Self {
      line,
      column,
      snippet: format!("{text}\n{marker}"),
    }
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{position}: {message}\n{}", position.snippet))]
  Lex { position: Location, message: String },

  #[snafu(display(
    "{position}: expected {expected}, but got \"{found}\"\n{}",
    position.snippet
  ))]
  Syntax {
    position: Location,
    expected: String,
    found: String,
  },

  #[snafu(display(
    "{position}: '{name}' is already defined in {scope} scope\n{}",
    position.snippet
  ))]
  DuplicateDefinition {
    position: Location,
    name: String,
    scope: Scope,
  },

  /// A count or value does not fit the 16-bit target.
  #[snafu(display("{position}: {message}\n{}", position.snippet))]
  Limit { position: Location, message: String },

  #[snafu(display("{position}: undeclared identifier '{name}'\n{}", position.snippet))]
  UndeclaredIdentifier { position: Location, name: String },
}

impl CompileError {
  /// Lexical error anchored at a byte offset in the source.
  pub fn lex(source: &str, loc: usize, message: impl Into<String>) -> Self {
    Self::Lex {
      position: Location::locate(source, loc),
      message: message.into(),
    }
  }

  /// Grammar mismatch: `expected` is what the production wanted, `found` the
  /// text of the token actually present.
  pub fn syntax(
    source: &str,
    loc: usize,
    expected: impl Into<String>,
    found: impl Into<String>,
  ) -> Self {
    Self::Syntax {
      position: Location::locate(source, loc),
      expected: expected.into(),
      found: found.into(),
    }
  }

  pub fn duplicate(source: &str, loc: usize, name: impl Into<String>, scope: Scope) -> Self {
    Self::DuplicateDefinition {
      position: Location::locate(source, loc),
      name: name.into(),
      scope,
    }
  }

  pub fn limit(source: &str, loc: usize, message: impl Into<String>) -> Self {
    Self::Limit {
      position: Location::locate(source, loc),
      message: message.into(),
    }
  }

  pub fn undeclared(source: &str, loc: usize, name: impl Into<String>) -> Self {
    Self::UndeclaredIdentifier {
      position: Location::locate(source, loc),
      name: name.into(),
    }
  }

  pub fn position(&self) -> &Location {
    match self {
      Self::Lex { position, .. }
      | Self::Syntax { position, .. }
      | Self::DuplicateDefinition { position, .. }
      | Self::Limit { position, .. }
      | Self::UndeclaredIdentifier { position, .. } => position,
    }
  }
}
