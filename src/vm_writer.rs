//! Code emission: renders stack-machine operations as VM text.
//!
//! Every operation appends exactly one line. The output is append-only and no
//! range checking happens here; segment/index validity is up to the caller.

use std::fmt;

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
  Constant,
  Argument,
  Local,
  Static,
  This,
  That,
  Pointer,
  Temp,
}

impl fmt::Display for Segment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Constant => "constant",
      Self::Argument => "argument",
      Self::Local => "local",
      Self::Static => "static",
      Self::This => "this",
      Self::That => "that",
      Self::Pointer => "pointer",
      Self::Temp => "temp",
    };
    f.write_str(name)
  }
}

/// Arithmetic and logical commands native to the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Add,
  Sub,
  Neg,
  Eq,
  Gt,
  Lt,
  And,
  Or,
  Not,
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Add => "add",
      Self::Sub => "sub",
      Self::Neg => "neg",
      Self::Eq => "eq",
      Self::Gt => "gt",
      Self::Lt => "lt",
      Self::And => "and",
      Self::Or => "or",
      Self::Not => "not",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Default)]
pub struct VmWriter {
  out: String,
}

impl VmWriter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, segment: Segment, index: u16) {
    self.line(format_args!("push {segment} {index}"));
  }

  pub fn pop(&mut self, segment: Segment, index: u16) {
    self.line(format_args!("pop {segment} {index}"));
  }

  pub fn arithmetic(&mut self, command: Command) {
    self.line(format_args!("{command}"));
  }

  pub fn label(&mut self, name: &str) {
    self.line(format_args!("label {name}"));
  }

  pub fn goto(&mut self, name: &str) {
    self.line(format_args!("goto {name}"));
  }

  pub fn if_goto(&mut self, name: &str) {
    self.line(format_args!("if-goto {name}"));
  }

  pub fn call(&mut self, function_name: &str, arg_count: u16) {
    self.line(format_args!("call {function_name} {arg_count}"));
  }

  pub fn function(&mut self, function_name: &str, local_count: u16) {
    self.line(format_args!("function {function_name} {local_count}"));
  }

  pub fn ret(&mut self) {
    self.line(format_args!("return"));
  }

  pub fn finish(self) -> String {
    self.out
  }

  fn line(&mut self, instruction: fmt::Arguments<'_>) {
    let instruction = instruction.to_string();
    trace!(instruction = instruction.as_str(), "emit");
    self.out.push_str(&instruction);
    self.out.push('\n');
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn renders_every_instruction_form() {
    let mut writer = VmWriter::new();
    writer.function("Main.main", 2);
    writer.push(Segment::Constant, 7);
    writer.pop(Segment::Local, 1);
    writer.push(Segment::Argument, 0);
    writer.pop(Segment::Pointer, 0);
    writer.push(Segment::That, 0);
    writer.pop(Segment::Temp, 0);
    writer.push(Segment::Static, 3);
    writer.push(Segment::This, 2);
    writer.arithmetic(Command::Add);
    writer.arithmetic(Command::Not);
    writer.label("WHILE_EXP0");
    writer.if_goto("WHILE_END0");
    writer.goto("WHILE_EXP0");
    writer.call("Math.multiply", 2);
    writer.ret();

    let expected = "\
function Main.main 2
push constant 7
pop local 1
push argument 0
pop pointer 0
push that 0
pop temp 0
push static 3
push this 2
add
not
label WHILE_EXP0
if-goto WHILE_END0
goto WHILE_EXP0
call Math.multiply 2
return
";
    assert_eq!(writer.finish(), expected);
  }

  #[test]
  fn command_names_match_vm_opcodes() {
    let names: Vec<String> = [
      Command::Add,
      Command::Sub,
      Command::Neg,
      Command::Eq,
      Command::Gt,
      Command::Lt,
      Command::And,
      Command::Or,
      Command::Not,
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    assert_eq!(
      names,
      ["add", "sub", "neg", "eq", "gt", "lt", "and", "or", "not"]
    );
  }
}
