//! Two-scope symbol table: class scope for `static`/`field` and subroutine
//! scope for arguments and locals.
//!
//! Indices are dense per kind, assigned in declaration order starting at 0.
//! Lookups search the subroutine scope first, then the class scope.

use indexmap::IndexMap;
use snafu::Snafu;

use crate::vm_writer::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
  Static,
  Field,
  Argument,
  Local,
}

impl Kind {
  pub fn scope(self) -> Scope {
    match self {
      Self::Static | Self::Field => Scope::Class,
      Self::Argument | Self::Local => Scope::Subroutine,
    }
  }

  /// Runtime segment a variable of this kind lives in. Fields are addressed
  /// through `this`, anchored by `pointer 0`.
  pub fn segment(self) -> Segment {
    match self {
      Self::Static => Segment::Static,
      Self::Field => Segment::This,
      Self::Argument => Segment::Argument,
      Self::Local => Segment::Local,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  Class,
  Subroutine,
}

impl std::fmt::Display for Scope {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Class => f.write_str("class"),
      Self::Subroutine => f.write_str("subroutine"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
  pub ty: String,
  pub kind: Kind,
  pub index: u16,
}

#[derive(Debug, Snafu)]
pub enum DefineError {
  #[snafu(display("'{name}' is already defined in {scope} scope"))]
  Duplicate { name: String, scope: Scope },

  #[snafu(display("too many {kind:?} variables, at most {} per kind", u16::MAX))]
  TooMany { kind: Kind },
}

#[derive(Debug, Default)]
pub struct SymbolTable {
  class_scope: IndexMap<String, Symbol>,
  subroutine_scope: IndexMap<String, Symbol>,
  /// Next free index, by `Kind as usize`.
  counts: [u16; 4],
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Drop every argument and local. Must run once per subroutine before any
  /// of its symbols are defined.
  pub fn start_subroutine(&mut self) {
    self.subroutine_scope.clear();
    self.counts[Kind::Argument as usize] = 0;
    self.counts[Kind::Local as usize] = 0;
  }

  /// Record `name` in the scope implied by `kind` and return its index.
  pub fn define(&mut self, name: &str, ty: &str, kind: Kind) -> Result<u16, DefineError> {
    let index = self.var_count(kind);
    let Some(next) = index.checked_add(1) else {
      return TooManySnafu { kind }.fail();
    };
    let table = self.scope_mut(kind.scope());
    if table.contains_key(name) {
      return DuplicateSnafu {
        name,
        scope: kind.scope(),
      }
      .fail();
    }
    table.insert(
      name.to_string(),
      Symbol {
        ty: ty.to_string(),
        kind,
        index,
      },
    );
    self.counts[kind as usize] = next;
    Ok(index)
  }

  pub fn var_count(&self, kind: Kind) -> u16 {
    self.counts[kind as usize]
  }

  pub fn lookup(&self, name: &str) -> Option<&Symbol> {
    self
      .subroutine_scope
      .get(name)
      .or_else(|| self.class_scope.get(name))
  }

  /// `None` when the name is declared in neither scope.
  pub fn kind_of(&self, name: &str) -> Option<Kind> {
    self.lookup(name).map(|symbol| symbol.kind)
  }

  /// Declared type, or the empty string for unknown names.
  pub fn type_of(&self, name: &str) -> &str {
    self.lookup(name).map_or("", |symbol| symbol.ty.as_str())
  }

  /// Running index, or 0 for unknown names.
  pub fn index_of(&self, name: &str) -> u16 {
    self.lookup(name).map_or(0, |symbol| symbol.index)
  }

  fn scope_mut(&mut self, scope: Scope) -> &mut IndexMap<String, Symbol> {
    match scope {
      Scope::Class => &mut self.class_scope,
      Scope::Subroutine => &mut self.subroutine_scope,
    }
  }
}
