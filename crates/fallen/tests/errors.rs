//! Error kind and output format tests.

use std::rc::Rc;

use fallen::{compile_source, parse_source, CollectSink, Error, Vm};

fn compile_err(source: &str) -> Error {
    compile_source(source, "err.fallen").expect_err("compilation should fail")
}

#[test]
fn lex_error_carries_file_and_line() {
    let err = parse_source("x =i 1\ny =i $", "err.fallen").unwrap_err();
    let Error::Lex { file, inner } = &err else {
        panic!("expected lex error, got {err}");
    };
    assert_eq!(file, "err.fallen");
    assert_eq!(inner.line, 2);
    assert_eq!(err.to_string(), "Lex error (err.fallen:2): Unknown character: '$'");
}

#[test]
fn parse_error_carries_file_and_line() {
    let err = parse_source("x =i 1\nwhile { write(1) }", "err.fallen").unwrap_err();
    let Error::Parse { inner, .. } = &err else {
        panic!("expected parse error, got {err}");
    };
    assert_eq!(inner.line, 2);
    assert!(err.to_string().starts_with("Parse error (err.fallen:2): "));
}

#[test]
fn first_parse_error_aborts() {
    // both lines are bad; only the first is reported
    let err = parse_source("x 1\ny 2", "err.fallen").unwrap_err();
    assert!(err.to_string().contains("err.fallen:1"));
}

#[test]
fn compile_error_kinds() {
    assert_eq!(
        compile_err("stop").to_string(),
        "Compile error (err.fallen:1): stop used outside of a loop"
    );
    assert_eq!(
        compile_err("continue").to_string(),
        "Compile error (err.fallen:1): continue used outside of a loop"
    );
    assert_eq!(
        compile_err("return 1").to_string(),
        "Compile error (err.fallen:1): return used outside of a function"
    );
    assert!(compile_err("func f() { return 1 }\nfunc f() { return 2 }")
        .to_string()
        .contains("Function already defined: f"));
    assert!(compile_err("export ghost")
        .to_string()
        .contains("exported name not defined in module: ghost"));
}

#[test]
fn runtime_error_output_is_exact() {
    let unit = Rc::new(compile_source("x =i 1\ny =f x / 0", "err.fallen").unwrap());
    let mut vm = Vm::new(std::env::temp_dir(), CollectSink::new());
    let err = vm.run_unit(&unit).unwrap_err();
    // instructions: LOAD_CONST, STORE_NAME, LOAD_NAME, LOAD_CONST, DIV, ...
    assert_eq!(
        err.to_string(),
        "Runtime error: Division by zero\n  ip=0004\n  at func <main> (err.fallen:2)"
    );
}

#[test]
fn runtime_error_lists_frames_innermost_first() {
    let source = "\
func inner() { return 1 / 0 }
func outer() { return inner() }
write(outer())";
    let unit = Rc::new(compile_source(source, "err.fallen").unwrap());
    let mut vm = Vm::new(std::env::temp_dir(), CollectSink::new());
    let err = vm.run_unit(&unit).unwrap_err();
    let rendered = err.to_string();
    let inner_at = rendered.find("at func inner").unwrap();
    let outer_at = rendered.find("at func outer").unwrap();
    let main_at = rendered.find("at func <main>").unwrap();
    assert!(inner_at < outer_at && outer_at < main_at);
    assert!(rendered.contains("(err.fallen:1)"));
    assert!(rendered.contains("(err.fallen:3)"));
}

#[test]
fn ip_is_four_hex_digits() {
    let unit = Rc::new(compile_source("write(1 / 0)", "err.fallen").unwrap());
    let mut vm = Vm::new(std::env::temp_dir(), CollectSink::new());
    let err = vm.run_unit(&unit).unwrap_err();
    let rendered = err.to_string();
    let ip_line = rendered.lines().nth(1).unwrap();
    assert!(ip_line.starts_with("  ip="));
    assert_eq!(ip_line.len(), "  ip=0002".len());
}

#[test]
fn repl_keeps_environment_after_errors() {
    let mut vm = Vm::new(std::env::temp_dir(), CollectSink::new());
    let first = Rc::new(compile_source("x =i 7", "<repl>").unwrap());
    vm.run_unit(&first).unwrap();
    let failing = Rc::new(compile_source("write(1 / 0)", "<repl>").unwrap());
    assert!(vm.run_unit(&failing).is_err());
    let second = Rc::new(compile_source("write(x)", "<repl>").unwrap());
    vm.run_unit(&second).unwrap();
    assert_eq!(vm.sink().output(), "7\n");
}
