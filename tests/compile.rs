use jackc::{CompileError, CompileOptions, compile, compile_with};

fn listing(text: &str) -> String {
  let mut out = String::new();
  for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
    out.push_str(line);
    out.push('\n');
  }
  out
}

#[test]
fn do_statement_round_trip() {
  let vm = compile("class Main { function void main() { do Output.printInt(1+2); return; } }")
    .unwrap();
  assert_eq!(
    vm,
    listing(
      "function Main.main 0
       push constant 1
       push constant 2
       add
       call Output.printInt 1
       pop temp 0
       push constant 0
       return"
    )
  );
}

#[test]
fn constructor_allocates_fields_and_returns_this() {
  let source = "class Point {
    field int x, y;
    constructor Point new(int ax, int ay) { let x = ax; return this; }
  }";
  assert_eq!(
    compile(source).unwrap(),
    listing(
      "function Point.new 0
       push constant 2
       call Memory.alloc 1
       pop pointer 0
       push argument 0
       pop this 0
       push pointer 0
       return"
    )
  );
}

#[test]
fn empty_argument_list_still_calls_and_discards() {
  let source = "class Main {
    function void main() { do foo(); return; }
    function void foo() { return; }
  }";
  assert_eq!(
    compile(source).unwrap(),
    listing(
      "function Main.main 0
       push pointer 0
       call Main.foo 1
       pop temp 0
       push constant 0
       return
       function Main.foo 0
       push constant 0
       return"
    )
  );
}

#[test]
fn missing_expression_emits_nothing() {
  let err = compile("class Main { function void main() { var int x; let x = ; return; } }")
    .unwrap_err();
  assert!(matches!(err, CompileError::Syntax { .. }), "{err}");
}

#[test]
fn linked_list_class() {
  let source = r#"
    // A singly linked list of integers.
    class List {
      field int data;
      field List next;

      /** Builds a new cell in front of `cdr`. */
      constructor List new(int car, List cdr) {
        let data = car;
        let next = cdr;
        return this;
      }

      method int sum() {
        var int total;
        var List cur;
        let cur = this;
        while (~(cur = null)) {
          let total = total + cur.getData();
          let cur = cur.getNext();
        }
        return total;
      }

      method int getData() { return data; }
      method List getNext() { return next; }

      method void dispose() {
        if (~(next = null)) { do next.dispose(); }
        do Memory.deAlloc(this);
        return;
      }
    }
  "#;

  assert_eq!(
    compile(source).unwrap(),
    listing(
      "function List.new 0
       push constant 2
       call Memory.alloc 1
       pop pointer 0
       push argument 0
       pop this 0
       push argument 1
       pop this 1
       push pointer 0
       return
       function List.sum 2
       push argument 0
       pop pointer 0
       push pointer 0
       pop local 1
       label WHILE_EXP0
       push local 1
       push constant 0
       eq
       not
       not
       if-goto WHILE_END0
       push local 0
       push local 1
       call List.getData 1
       add
       pop local 0
       push local 1
       call List.getNext 1
       pop local 1
       goto WHILE_EXP0
       label WHILE_END0
       push local 0
       return
       function List.getData 0
       push argument 0
       pop pointer 0
       push this 0
       return
       function List.getNext 0
       push argument 0
       pop pointer 0
       push this 1
       return
       function List.dispose 0
       push argument 0
       pop pointer 0
       push this 1
       push constant 0
       eq
       not
       if-goto IF_TRUE0
       goto IF_FALSE0
       label IF_TRUE0
       push this 1
       call List.dispose 1
       pop temp 0
       label IF_FALSE0
       push pointer 0
       call Memory.deAlloc 1
       pop temp 0
       push constant 0
       return"
    )
  );
}

#[test]
fn array_write_protects_target_address() {
  let source = "class Main {
    function void main() {
      var Array a, b;
      let a[b[0] + 1] = b[a[2]];
      return;
    }
  }";
  let vm = compile(source).unwrap();
  let body: Vec<&str> = vm.lines().collect();
  let tail = &body[body.len() - 6..body.len() - 2];
  assert_eq!(tail, ["pop temp 0", "pop pointer 1", "push temp 0", "pop that 0"]);
}

#[test]
fn permissive_mode_compiles_undeclared_references() {
  let source = "class Main { function int main() { return missing + 1; } }";
  assert!(matches!(
    compile(source),
    Err(CompileError::UndeclaredIdentifier { .. })
  ));

  let vm = compile_with(source, CompileOptions::permissive()).unwrap();
  assert_eq!(
    vm,
    listing(
      "function Main.main 0
       push constant 0
       push constant 1
       add
       return"
    )
  );
}

#[test]
fn errors_report_line_and_column() {
  let source = "class Main {\n  function void main() {\n    let = 3;\n  }\n}\n";
  let err = compile(source).unwrap_err();
  let position = err.position();
  assert_eq!((position.line, position.column), (3, 9));
  assert!(err.to_string().contains("expected a variable name, but got \"=\""));
}

#[test]
fn duplicate_argument_is_rejected() {
  let err = compile("class Main { function void f(int a, int a) { return; } }").unwrap_err();
  assert!(err.to_string().contains("'a' is already defined in subroutine scope"));
}

#[test]
fn unterminated_string_aborts_compilation() {
  let err = compile("class Main { function void f() { do Output.printString(\"oops); } }")
    .unwrap_err();
  assert!(matches!(err, CompileError::Lex { .. }));
}
