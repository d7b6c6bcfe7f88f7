//! Single-pass recursive-descent compiler for one class.
//!
//! Each grammar production is a method that consumes its tokens, records
//! declarations in the symbol table and emits VM code as soon as the construct
//! is recognised. No syntax tree is ever built: the grammar has no operator
//! precedence and needs no forward references, so code can be written in
//! source order. Every production is selected by the current token, except
//! terms that start with an identifier, which look one raw character ahead.

use tracing::{debug, warn};

use crate::config::{CompileOptions, LookupMode};
use crate::error::{CompileError, CompileResult};
use crate::symbol_table::{DefineError, Kind, SymbolTable};
use crate::tokenizer::{Keyword, Token, TokenKind, Tokenizer};
use crate::vm_writer::{Command, Segment, VmWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
  Constructor,
  Function,
  Method,
}

/// Binary operators of the expression grammar. All of them share a single
/// precedence level and are applied left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  And,
  Or,
  Lt,
  Gt,
  Eq,
}

impl BinaryOp {
  fn from_symbol(symbol: char) -> Option<Self> {
    let op = match symbol {
      '+' => Self::Add,
      '-' => Self::Sub,
      '*' => Self::Mul,
      '/' => Self::Div,
      '&' => Self::And,
      '|' => Self::Or,
      '<' => Self::Lt,
      '>' => Self::Gt,
      '=' => Self::Eq,
      _ => return None,
    };
    Some(op)
  }
}

/// Per-subroutine label suffixes for `while` and `if` statements.
#[derive(Debug, Default)]
struct LabelCounters {
  while_count: u32,
  if_count: u32,
}

impl LabelCounters {
  fn next_while(&mut self) -> u32 {
    let n = self.while_count;
    self.while_count += 1;
    n
  }

  fn next_if(&mut self) -> u32 {
    let n = self.if_count;
    self.if_count += 1;
    n
  }
}

#[derive(Debug, Clone, Copy)]
enum Access {
  Read,
  Write,
}

pub struct CompilationEngine<'a> {
  tokenizer: Tokenizer<'a>,
  symbols: SymbolTable,
  writer: VmWriter,
  options: CompileOptions,
  current: Token,
  class_name: String,
  labels: LabelCounters,
}

impl<'a> CompilationEngine<'a> {
  pub fn new(source: &'a str, options: CompileOptions) -> Self {
    Self {
      tokenizer: Tokenizer::new(source),
      symbols: SymbolTable::new(),
      writer: VmWriter::new(),
      options,
      current: Token::eof(0),
      class_name: String::new(),
      labels: LabelCounters::default(),
    }
  }

  /// `class Name { classVarDec* subroutineDec* }`
  ///
  /// Consumes the whole source and returns the instruction stream. Anything
  /// after the closing brace is rejected.
  pub fn compile_class(mut self) -> CompileResult<String> {
    self.bump()?;
    self.eat_keyword(Keyword::Class)?;
    let (name, _) = self.identifier("a class name")?;
    self.class_name = name;
    self.labels = LabelCounters::default();
    debug!(class = %self.class_name, "compiling class");

    self.eat_symbol('{')?;
    while self.current.is_keyword(Keyword::Static) || self.current.is_keyword(Keyword::Field) {
      self.compile_class_var_dec()?;
    }
    while let Some(kind) = self.subroutine_kind() {
      self.compile_subroutine(kind)?;
    }
    self.eat_symbol('}')?;

    if self.current.kind != TokenKind::Eof {
      return Err(self.expected("end of input"));
    }
    Ok(self.writer.finish())
  }

  fn compile_class_var_dec(&mut self) -> CompileResult<()> {
    let kind = if self.current.is_keyword(Keyword::Static) {
      Kind::Static
    } else {
      Kind::Field
    };
    self.bump()?;
    let ty = self.parse_type(false)?;
    self.compile_var_names(&ty, kind)
  }

  /// `varName (',' varName)* ';'`, all sharing one declared type.
  fn compile_var_names(&mut self, ty: &str, kind: Kind) -> CompileResult<()> {
    loop {
      let (name, loc) = self.identifier("a variable name")?;
      self.define(&name, ty, kind, loc)?;
      if !self.current.is_symbol(',') {
        break;
      }
      self.bump()?;
    }
    self.eat_symbol(';')
  }

  fn subroutine_kind(&self) -> Option<SubroutineKind> {
    match self.current.kind {
      TokenKind::Keyword(Keyword::Constructor) => Some(SubroutineKind::Constructor),
      TokenKind::Keyword(Keyword::Function) => Some(SubroutineKind::Function),
      TokenKind::Keyword(Keyword::Method) => Some(SubroutineKind::Method),
      _ => None,
    }
  }

  fn compile_subroutine(&mut self, kind: SubroutineKind) -> CompileResult<()> {
    let loc = self.current.loc;
    self.bump()?;
    self.parse_type(true)?;
    let (name, _) = self.identifier("a subroutine name")?;

    self.symbols.start_subroutine();
    self.labels = LabelCounters::default();
    if kind == SubroutineKind::Method {
      let class_name = self.class_name.clone();
      self.define("this", &class_name, Kind::Argument, loc)?;
    }
    debug!(subroutine = %name, ?kind, "compiling subroutine");

    self.eat_symbol('(')?;
    self.compile_parameter_list()?;
    self.eat_symbol(')')?;
    self.compile_subroutine_body(&name, kind)
  }

  /// `((type varName) (',' type varName)*)?`, without the parentheses.
  fn compile_parameter_list(&mut self) -> CompileResult<()> {
    if self.current.is_symbol(')') {
      return Ok(());
    }
    loop {
      let ty = self.parse_type(false)?;
      let (name, loc) = self.identifier("a parameter name")?;
      self.define(&name, &ty, Kind::Argument, loc)?;
      if !self.current.is_symbol(',') {
        return Ok(());
      }
      self.bump()?;
    }
  }

  fn compile_subroutine_body(&mut self, name: &str, kind: SubroutineKind) -> CompileResult<()> {
    self.eat_symbol('{')?;
    while self.current.is_keyword(Keyword::Var) {
      self.bump()?;
      let ty = self.parse_type(false)?;
      self.compile_var_names(&ty, Kind::Local)?;
    }

    // Locals are all known now, so the header can carry the final count.
    let function_name = format!("{}.{name}", self.class_name);
    self
      .writer
      .function(&function_name, self.symbols.var_count(Kind::Local));
    match kind {
      SubroutineKind::Constructor => {
        self
          .writer
          .push(Segment::Constant, self.symbols.var_count(Kind::Field));
        self.writer.call("Memory.alloc", 1);
        self.writer.pop(Segment::Pointer, 0);
      }
      SubroutineKind::Method => {
        self.writer.push(Segment::Argument, 0);
        self.writer.pop(Segment::Pointer, 0);
      }
      SubroutineKind::Function => {}
    }

    self.compile_statements()?;
    self.eat_symbol('}')
  }

  fn compile_statements(&mut self) -> CompileResult<()> {
    loop {
      let keyword = match self.current.kind {
        TokenKind::Keyword(keyword) => keyword,
        _ => return Ok(()),
      };
      match keyword {
        Keyword::Let => self.compile_let()?,
        Keyword::If => self.compile_if()?,
        Keyword::While => self.compile_while()?,
        Keyword::Do => self.compile_do()?,
        Keyword::Return => self.compile_return()?,
        _ => return Ok(()),
      }
    }
  }

  /// `let varName ('[' expression ']')? '=' expression ';'`
  fn compile_let(&mut self) -> CompileResult<()> {
    self.eat_keyword(Keyword::Let)?;
    let (name, loc) = self.identifier("a variable name")?;

    if self.current.is_symbol('[') {
      self.push_variable(&name, loc)?;
      self.bump()?;
      self.compile_expression()?;
      self.eat_symbol(']')?;
      self.writer.arithmetic(Command::Add);

      self.eat_symbol('=')?;
      self.compile_expression()?;
      // The right-hand side may itself move `pointer 1`, so the target
      // address is only installed once its value is parked in `temp 0`.
      self.writer.pop(Segment::Temp, 0);
      self.writer.pop(Segment::Pointer, 1);
      self.writer.push(Segment::Temp, 0);
      self.writer.pop(Segment::That, 0);
    } else {
      self.eat_symbol('=')?;
      self.compile_expression()?;
      let (segment, index) = self.variable(&name, loc, Access::Write)?;
      self.writer.pop(segment, index);
    }

    self.eat_symbol(';')
  }

  /// `if '(' expression ')' '{' statements '}' ('else' '{' statements '}')?`
  fn compile_if(&mut self) -> CompileResult<()> {
    let n = self.labels.next_if();
    let if_true = format!("IF_TRUE{n}");
    let if_false = format!("IF_FALSE{n}");

    self.eat_keyword(Keyword::If)?;
    self.eat_symbol('(')?;
    self.compile_expression()?;
    self.eat_symbol(')')?;
    self.writer.if_goto(&if_true);
    self.writer.goto(&if_false);
    self.writer.label(&if_true);

    self.eat_symbol('{')?;
    self.compile_statements()?;
    self.eat_symbol('}')?;

    if self.current.is_keyword(Keyword::Else) {
      let if_end = format!("IF_END{n}");
      self.writer.goto(&if_end);
      self.writer.label(&if_false);
      self.bump()?;
      self.eat_symbol('{')?;
      self.compile_statements()?;
      self.eat_symbol('}')?;
      self.writer.label(&if_end);
    } else {
      self.writer.label(&if_false);
    }
    Ok(())
  }

  /// `while '(' expression ')' '{' statements '}'`
  fn compile_while(&mut self) -> CompileResult<()> {
    let n = self.labels.next_while();
    let top = format!("WHILE_EXP{n}");
    let end = format!("WHILE_END{n}");

    self.eat_keyword(Keyword::While)?;
    self.writer.label(&top);
    self.eat_symbol('(')?;
    self.compile_expression()?;
    self.eat_symbol(')')?;
    self.writer.arithmetic(Command::Not);
    self.writer.if_goto(&end);

    self.eat_symbol('{')?;
    self.compile_statements()?;
    self.eat_symbol('}')?;
    self.writer.goto(&top);
    self.writer.label(&end);
    Ok(())
  }

  /// `do subroutineCall ';'`. The callee always leaves one value behind,
  /// which is dropped.
  fn compile_do(&mut self) -> CompileResult<()> {
    self.eat_keyword(Keyword::Do)?;
    let (name, loc) = self.identifier("a subroutine name")?;
    self.compile_subroutine_call(&name, loc)?;
    self.writer.pop(Segment::Temp, 0);
    self.eat_symbol(';')
  }

  /// `return expression? ';'`. A bare return still pushes a dummy value.
  fn compile_return(&mut self) -> CompileResult<()> {
    self.eat_keyword(Keyword::Return)?;
    if self.current.is_symbol(';') {
      self.writer.push(Segment::Constant, 0);
    } else {
      self.compile_expression()?;
    }
    self.eat_symbol(';')?;
    self.writer.ret();
    Ok(())
  }

  /// `term (op term)*`, each operator emitted right after its right operand.
  fn compile_expression(&mut self) -> CompileResult<()> {
    self.compile_term()?;
    while let Some(op) = self.binary_op() {
      self.bump()?;
      self.compile_term()?;
      match op {
        BinaryOp::Add => self.writer.arithmetic(Command::Add),
        BinaryOp::Sub => self.writer.arithmetic(Command::Sub),
        BinaryOp::Mul => self.writer.call("Math.multiply", 2),
        BinaryOp::Div => self.writer.call("Math.divide", 2),
        BinaryOp::And => self.writer.arithmetic(Command::And),
        BinaryOp::Or => self.writer.arithmetic(Command::Or),
        BinaryOp::Lt => self.writer.arithmetic(Command::Lt),
        BinaryOp::Gt => self.writer.arithmetic(Command::Gt),
        BinaryOp::Eq => self.writer.arithmetic(Command::Eq),
      }
    }
    Ok(())
  }

  fn binary_op(&self) -> Option<BinaryOp> {
    match self.current.kind {
      TokenKind::Symbol(symbol) => BinaryOp::from_symbol(symbol),
      _ => None,
    }
  }

  fn compile_term(&mut self) -> CompileResult<()> {
    let token = self.current.clone();
    match token.kind {
      TokenKind::IntegerConstant(value) => {
        self.writer.push(Segment::Constant, value);
        self.bump()
      }
      TokenKind::StringConstant(text) => {
        self.compile_string(&text, token.loc)?;
        self.bump()
      }
      TokenKind::Keyword(Keyword::True) => {
        self.writer.push(Segment::Constant, 0);
        self.writer.arithmetic(Command::Not);
        self.bump()
      }
      TokenKind::Keyword(Keyword::False | Keyword::Null) => {
        self.writer.push(Segment::Constant, 0);
        self.bump()
      }
      TokenKind::Keyword(Keyword::This) => {
        self.writer.push(Segment::Pointer, 0);
        self.bump()
      }
      TokenKind::Identifier(_) => self.compile_identifier_term(),
      TokenKind::Symbol('(') => {
        self.bump()?;
        self.compile_expression()?;
        self.eat_symbol(')')
      }
      TokenKind::Symbol('-') => {
        self.bump()?;
        self.compile_term()?;
        self.writer.arithmetic(Command::Neg);
        Ok(())
      }
      TokenKind::Symbol('~') => {
        self.bump()?;
        self.compile_term()?;
        self.writer.arithmetic(Command::Not);
        Ok(())
      }
      _ => Err(self.expected("a term")),
    }
  }

  /// `varName | varName '[' expression ']' | subroutineCall`, told apart by
  /// the raw character after the identifier.
  fn compile_identifier_term(&mut self) -> CompileResult<()> {
    let next = if self.tokenizer.has_more() {
      self.tokenizer.peek_char()
    } else {
      None
    };
    let (name, loc) = self.identifier("an identifier")?;

    match next {
      Some('[') => {
        self.push_variable(&name, loc)?;
        self.eat_symbol('[')?;
        self.compile_expression()?;
        self.eat_symbol(']')?;
        self.writer.arithmetic(Command::Add);
        self.writer.pop(Segment::Pointer, 1);
        self.writer.push(Segment::That, 0);
        Ok(())
      }
      Some('(' | '.') => self.compile_subroutine_call(&name, loc),
      _ => self.push_variable(&name, loc),
    }
  }

  /// Lowered to `String.new` followed by one `appendChar` per character.
  fn compile_string(&mut self, text: &str, loc: usize) -> CompileResult<()> {
    let too_long =
      || CompileError::lex(self.tokenizer.source(), loc, "string constant is too long");
    let len = u16::try_from(text.chars().count()).map_err(|_| too_long())?;
    let codes = text
      .chars()
      .map(|ch| u16::try_from(u32::from(ch)))
      .collect::<Result<Vec<_>, _>>()
      .map_err(|_| {
        CompileError::lex(
          self.tokenizer.source(),
          loc,
          "string constant holds a character outside the 16-bit range",
        )
      })?;

    self.writer.push(Segment::Constant, len);
    self.writer.call("String.new", 1);
    for code in codes {
      self.writer.push(Segment::Constant, code);
      self.writer.call("String.appendChar", 2);
    }
    Ok(())
  }

  /// Called with the leading name already consumed. Three forms:
  /// `sub(...)` on `this`, `var.sub(...)` on an object, `Class.sub(...)`.
  fn compile_subroutine_call(&mut self, name: &str, loc: usize) -> CompileResult<()> {
    if self.current.is_symbol('(') {
      self.writer.push(Segment::Pointer, 0);
      let args = self.compile_expression_list()?;
      let callee = format!("{}.{name}", self.class_name);
      let count = self.arg_count(args, 1, loc)?;
      self.writer.call(&callee, count);
      return Ok(());
    }

    if !self.current.is_symbol('.') {
      return Err(self.expected("'(' or '.'"));
    }
    self.bump()?;
    let (method, _) = self.identifier("a subroutine name")?;

    let (callee, receiver) = match self.symbols.lookup(name) {
      Some(symbol) => {
        self.writer.push(symbol.kind.segment(), symbol.index);
        (format!("{}.{method}", symbol.ty), 1)
      }
      None => (format!("{name}.{method}"), 0),
    };
    let args = self.compile_expression_list()?;
    let count = self.arg_count(args, receiver, loc)?;
    self.writer.call(&callee, count);
    Ok(())
  }

  /// Explicit arguments plus the implicit receiver, as a VM argument count.
  fn arg_count(&self, args: usize, receiver: usize, loc: usize) -> CompileResult<u16> {
    args
      .checked_add(receiver)
      .and_then(|total| u16::try_from(total).ok())
      .ok_or_else(|| {
        CompileError::limit(
          self.tokenizer.source(),
          loc,
          format!("call passes more than {} arguments", u16::MAX),
        )
      })
  }

  /// `'(' (expression (',' expression)*)? ')'`, returning the argument count.
  fn compile_expression_list(&mut self) -> CompileResult<usize> {
    self.eat_symbol('(')?;
    let mut count = 0;
    if !self.current.is_symbol(')') {
      self.compile_expression()?;
      count += 1;
      while self.current.is_symbol(',') {
        self.bump()?;
        self.compile_expression()?;
        count += 1;
      }
    }
    self.eat_symbol(')')?;
    Ok(count)
  }

  fn push_variable(&mut self, name: &str, loc: usize) -> CompileResult<()> {
    let (segment, index) = self.variable(name, loc, Access::Read)?;
    self.writer.push(segment, index);
    Ok(())
  }

  fn variable(&self, name: &str, loc: usize, access: Access) -> CompileResult<(Segment, u16)> {
    if let Some(symbol) = self.symbols.lookup(name) {
      return Ok((symbol.kind.segment(), symbol.index));
    }
    match self.options.lookup {
      LookupMode::Strict => Err(CompileError::undeclared(self.tokenizer.source(), loc, name)),
      LookupMode::Permissive => {
        warn!(name, ?access, "undeclared identifier, using sentinel");
        Ok(match access {
          Access::Read => (Segment::Constant, 0),
          Access::Write => (Segment::Temp, 0),
        })
      }
    }
  }

  fn define(&mut self, name: &str, ty: &str, kind: Kind, loc: usize) -> CompileResult<()> {
    self
      .symbols
      .define(name, ty, kind)
      .map(|_| ())
      .map_err(|err| match err {
        DefineError::Duplicate { name, scope } => {
          CompileError::duplicate(self.tokenizer.source(), loc, name, scope)
        }
        err @ DefineError::TooMany { .. } => {
          CompileError::limit(self.tokenizer.source(), loc, err.to_string())
        }
      })
  }

  /// `int | char | boolean | ClassName`, plus `void` for return types.
  fn parse_type(&mut self, allow_void: bool) -> CompileResult<String> {
    let ty = match &self.current.kind {
      TokenKind::Keyword(keyword @ (Keyword::Int | Keyword::Char | Keyword::Boolean)) => {
        keyword.to_string()
      }
      TokenKind::Keyword(Keyword::Void) if allow_void => "void".to_string(),
      TokenKind::Identifier(name) => name.clone(),
      _ => return Err(self.expected("a type")),
    };
    self.bump()?;
    Ok(ty)
  }

  fn identifier(&mut self, what: &str) -> CompileResult<(String, usize)> {
    let TokenKind::Identifier(name) = &self.current.kind else {
      return Err(self.expected(what));
    };
    let name = name.clone();
    let loc = self.current.loc;
    self.bump()?;
    Ok((name, loc))
  }

  fn eat_symbol(&mut self, symbol: char) -> CompileResult<()> {
    if !self.current.is_symbol(symbol) {
      return Err(self.expected(&format!("'{symbol}'")));
    }
    self.bump()
  }

  fn eat_keyword(&mut self, keyword: Keyword) -> CompileResult<()> {
    if !self.current.is_keyword(keyword) {
      return Err(self.expected(&format!("'{keyword}'")));
    }
    self.bump()
  }

  fn bump(&mut self) -> CompileResult<()> {
    self.current = self.tokenizer.advance_or_eof()?;
    Ok(())
  }

  fn expected(&self, what: &str) -> CompileError {
    CompileError::syntax(
      self.tokenizer.source(),
      self.current.loc,
      what,
      self.current.describe(),
    )
  }
}
