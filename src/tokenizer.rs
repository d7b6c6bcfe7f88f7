//! Lexical analysis: turns the raw class source into a lazy stream of tokens.
//!
//! The tokenizer is pull-based. `has_more` skips whitespace and both comment
//! forms, `advance` classifies and commits the next lexeme, and `peek_char`
//! exposes one raw character of lookahead so the engine can tell `name`,
//! `name[`, `name(` and `name.` apart without backtracking.

use std::fmt;

use crate::error::{CompileError, CompileResult};

/// The fixed punctuation set of the language.
pub const SYMBOLS: [char; 19] = [
  '{', '}', '(', ')', '[', ']', '.', ',', ';', '+', '-', '*', '/', '&', '|', '<', '>', '=', '~',
];

/// Largest integer constant the 16-bit target accepts.
pub const MAX_INT: u16 = 32767;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
  Class,
  Method,
  Function,
  Constructor,
  Int,
  Boolean,
  Char,
  Void,
  Var,
  Static,
  Field,
  Let,
  Do,
  If,
  Else,
  While,
  Return,
  True,
  False,
  Null,
  This,
}

impl Keyword {
  /// Case-sensitive match against the reserved words.
  pub fn lookup(word: &str) -> Option<Self> {
    let keyword = match word {
      "class" => Self::Class,
      "method" => Self::Method,
      "function" => Self::Function,
      "constructor" => Self::Constructor,
      "int" => Self::Int,
      "boolean" => Self::Boolean,
      "char" => Self::Char,
      "void" => Self::Void,
      "var" => Self::Var,
      "static" => Self::Static,
      "field" => Self::Field,
      "let" => Self::Let,
      "do" => Self::Do,
      "if" => Self::If,
      "else" => Self::Else,
      "while" => Self::While,
      "return" => Self::Return,
      "true" => Self::True,
      "false" => Self::False,
      "null" => Self::Null,
      "this" => Self::This,
      _ => return None,
    };
    Some(keyword)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Class => "class",
      Self::Method => "method",
      Self::Function => "function",
      Self::Constructor => "constructor",
      Self::Int => "int",
      Self::Boolean => "boolean",
      Self::Char => "char",
      Self::Void => "void",
      Self::Var => "var",
      Self::Static => "static",
      Self::Field => "field",
      Self::Let => "let",
      Self::Do => "do",
      Self::If => "if",
      Self::Else => "else",
      Self::While => "while",
      Self::Return => "return",
      Self::True => "true",
      Self::False => "false",
      Self::Null => "null",
      Self::This => "this",
    }
  }
}

impl fmt::Display for Keyword {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
  Keyword(Keyword),
  Symbol(char),
  Identifier(String),
  IntegerConstant(u16),
  StringConstant(String),
  /// Marker the engine sees once the source is exhausted.
  Eof,
}

/// A classified lexeme together with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize) -> Self {
    Self { kind, loc, len }
  }

  pub fn eof(loc: usize) -> Self {
    Self::new(TokenKind::Eof, loc, 0)
  }

  pub fn is_symbol(&self, symbol: char) -> bool {
    self.kind == TokenKind::Symbol(symbol)
  }

  pub fn is_keyword(&self, keyword: Keyword) -> bool {
    self.kind == TokenKind::Keyword(keyword)
  }

  /// Human-friendly description used in diagnostics.
  pub fn describe(&self) -> String {
    match &self.kind {
      TokenKind::Keyword(keyword) => keyword.to_string(),
      TokenKind::Symbol(symbol) => symbol.to_string(),
      TokenKind::Identifier(name) => name.clone(),
      TokenKind::IntegerConstant(value) => value.to_string(),
      TokenKind::StringConstant(text) => format!("\"{text}\""),
      TokenKind::Eof => "EOF".to_string(),
    }
  }
}

pub struct Tokenizer<'a> {
  source: &'a str,
  pos: usize,
  unterminated_comment: Option<usize>,
  failed: bool,
}

impl<'a> Tokenizer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      pos: 0,
      unterminated_comment: None,
      failed: false,
    }
  }

  pub fn source(&self) -> &'a str {
    self.source
  }

  /// Skip trivia and report whether another token follows. Repeated calls
  /// without an intervening `advance` are no-ops.
  pub fn has_more(&mut self) -> bool {
    self.skip_trivia();
    self.pos < self.source.len()
  }

  /// Next raw, unclassified character. Only meaningful right after
  /// `has_more` returned true.
  pub fn peek_char(&self) -> Option<char> {
    self.source[self.pos..].chars().next()
  }

  /// Classify the next lexeme and commit past it.
  pub fn advance(&mut self) -> CompileResult<Token> {
    if !self.has_more() {
      if let Some(start) = self.unterminated_comment.take() {
        return Err(CompileError::lex(
          self.source,
          start,
          "unterminated block comment",
        ));
      }
      return Err(CompileError::lex(
        self.source,
        self.source.len(),
        "unexpected end of input",
      ));
    }

    let start = self.pos;
    let Some(c) = self.peek_char() else {
      return Err(CompileError::lex(
        self.source,
        start,
        "unexpected end of input",
      ));
    };

    if SYMBOLS.contains(&c) {
      self.pos += 1;
      return Ok(Token::new(TokenKind::Symbol(c), start, 1));
    }

    if c == '"' {
      return self.string_constant(start);
    }

    if c.is_ascii_digit() {
      let text = self.take_while(|ch| ch.is_ascii_digit());
      let value = text
        .parse::<u16>()
        .ok()
        .filter(|value| *value <= MAX_INT)
        .ok_or_else(|| {
          CompileError::lex(
            self.source,
            start,
            format!("integer constant {text} is out of range 0..={MAX_INT}"),
          )
        })?;
      return Ok(Token::new(
        TokenKind::IntegerConstant(value),
        start,
        text.len(),
      ));
    }

    if c.is_ascii_alphabetic() || c == '_' {
      let word = self.take_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
      let kind = match Keyword::lookup(word) {
        Some(keyword) => TokenKind::Keyword(keyword),
        None => TokenKind::Identifier(word.to_string()),
      };
      return Ok(Token::new(kind, start, word.len()));
    }

    Err(CompileError::lex(
      self.source,
      start,
      format!("invalid character '{c}'"),
    ))
  }

  /// Like `advance`, but yields an `Eof` token once the source is exhausted
  /// instead of failing. An unterminated trailing comment is still an error.
  pub fn advance_or_eof(&mut self) -> CompileResult<Token> {
    if self.has_more() || self.unterminated_comment.is_some() {
      self.advance()
    } else {
      Ok(Token::eof(self.source.len()))
    }
  }

  fn skip_trivia(&mut self) {
    loop {
      let rest = &self.source[self.pos..];
      let trimmed = rest.trim_start();
      self.pos += rest.len() - trimmed.len();

      if trimmed.starts_with("//") {
        self.pos = match trimmed.find('\n') {
          Some(end) => self.pos + end + 1,
          None => self.source.len(),
        };
        continue;
      }

      if trimmed.starts_with("/*") {
        match trimmed[2..].find("*/") {
          Some(end) => self.pos += end + 4,
          None => {
            self.unterminated_comment = Some(self.pos);
            self.pos = self.source.len();
          }
        }
        continue;
      }

      break;
    }
  }

  fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
    let start = self.pos;
    let rest = &self.source[start..];
    let len = rest
      .char_indices()
      .find(|&(_, ch)| !accept(ch))
      .map_or(rest.len(), |(i, _)| i);
    self.pos += len;
    &self.source[start..start + len]
  }

  fn string_constant(&mut self, start: usize) -> CompileResult<Token> {
    let body = &self.source[start + 1..];
    for (i, ch) in body.char_indices() {
      match ch {
        '"' => {
          self.pos = start + 1 + i + 1;
          let kind = TokenKind::StringConstant(body[..i].to_string());
          return Ok(Token::new(kind, start, i + 2));
        }
        '\n' => {
          return Err(CompileError::lex(
            self.source,
            start,
            "newline in string constant",
          ));
        }
        _ => {}
      }
    }
    Err(CompileError::lex(
      self.source,
      start,
      "unterminated string constant",
    ))
  }
}

/// Stops after the first error; a failed lexeme is never retried.
impl Iterator for Tokenizer<'_> {
  type Item = CompileResult<Token>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed || !(self.has_more() || self.unterminated_comment.is_some()) {
      return None;
    }
    let token = self.advance();
    self.failed = token.is_err();
    Some(token)
  }
}

/// Render every token of `source` as the `<tokens>` XML listing.
pub fn tokens_xml(source: &str) -> CompileResult<String> {
  let mut xml = String::from("<tokens>\n");
  for token in Tokenizer::new(source) {
    let token = token?;
    let (tag, text) = match token.kind {
      TokenKind::Keyword(keyword) => ("keyword", keyword.to_string()),
      TokenKind::Symbol(symbol) => ("symbol", symbol.to_string()),
      TokenKind::Identifier(name) => ("identifier", name),
      TokenKind::IntegerConstant(value) => ("integerConstant", value.to_string()),
      TokenKind::StringConstant(text) => ("stringConstant", text),
      TokenKind::Eof => continue,
    };
    xml.push_str(&format!("<{tag}> {} </{tag}>\n", escape_xml(&text)));
  }
  xml.push_str("</tokens>\n");
  Ok(xml)
}

fn escape_xml(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for ch in text.chars() {
    match ch {
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '&' => escaped.push_str("&amp;"),
      _ => escaped.push(ch),
    }
  }
  escaped
}
