use jackc::compile;
use proptest::prelude::*;

fn statement() -> impl Strategy<Value = String> {
  prop_oneof![
    (0u16..=32767).prop_map(|n| format!("let x = x + {n};")),
    Just("while (x < 10) { let x = x + 1; }".to_string()),
    Just("if (x = 0) { let x = 1; } else { let x = 2; }".to_string()),
    Just("if (x > 3) { do Output.printInt(x); }".to_string()),
    Just("while (x > 0) { if (x = 5) { let x = 0; } let x = x - 1; }".to_string()),
  ]
}

fn class_with(body: &[String]) -> String {
  format!(
    "class T {{ function void f() {{ var int x; {} return; }} function void g() {{ var int y; {} return; }} }}",
    body.join(" "),
    body.join(" ").replace('x', "y"),
  )
}

fn suffixes(vm: &str, function: &str, prefix: &str) -> Vec<u32> {
  vm.split("function ")
    .filter(|chunk| chunk.starts_with(function))
    .flat_map(|chunk| chunk.lines())
    .filter_map(|line| line.strip_prefix("label "))
    .filter_map(|label| label.strip_prefix(prefix))
    .filter_map(|n| n.parse().ok())
    .collect()
}

proptest! {
  #[test]
  fn compiling_twice_is_byte_identical(body in prop::collection::vec(statement(), 0..12)) {
    let source = format!("class T {{ function void f() {{ var int x; {} return; }} }}", body.join(" "));
    let first = compile(&source).unwrap();
    let second = compile(&source).unwrap();
    prop_assert_eq!(first, second);
  }

  #[test]
  fn label_suffixes_increase_and_reset(body in prop::collection::vec(statement(), 0..12)) {
    let source = class_with(&body);
    let vm = compile(&source).unwrap();

    for prefix in ["WHILE_EXP", "IF_TRUE"] {
      let in_f = suffixes(&vm, "T.f ", prefix);
      let in_g = suffixes(&vm, "T.g ", prefix);
      let expected: Vec<u32> = (0..in_f.len() as u32).collect();
      prop_assert_eq!(&in_f, &expected);
      prop_assert_eq!(&in_g, &expected);
    }
  }

  #[test]
  fn function_header_counts_locals(count in 0usize..40) {
    let names: Vec<String> = (0..count).map(|i| format!("v{i}")).collect();
    let decls = if names.is_empty() {
      String::new()
    } else {
      format!("var int {};", names.join(", "))
    };
    let source = format!("class T {{ function void f() {{ {decls} return; }} }}");
    let vm = compile(&source).unwrap();
    let header = format!("function T.f {count}");
    prop_assert_eq!(vm.lines().filter(|line| line.starts_with("function ")).count(), 1);
    prop_assert_eq!(vm.lines().next(), Some(header.as_str()));
  }
}
