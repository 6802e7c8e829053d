//! End-to-end program tests: source in, captured output (or error) out.

use std::rc::Rc;

use fallen::{compile_source, run_source_collect, CollectSink, Error, Vm};

fn run(source: &str) -> String {
    run_source_collect(source, "test.fallen").expect("program should run")
}

fn run_err(source: &str) -> Error {
    run_source_collect(source, "test.fallen").expect_err("program should fail")
}

fn runtime_msg(err: &Error) -> &str {
    match err {
        Error::Runtime(rt) => &rt.msg,
        other => panic!("expected runtime error, got {other}"),
    }
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(run("write(2 + 3 * 4)"), "14\n");
}

#[test]
fn parenthesized_grouping() {
    assert_eq!(run("write((2 + 3) * 4)"), "20\n");
}

#[test]
fn while_loop_counts() {
    let source = "i =i 0\nwhile i < 3 { write(i)\n i =i i + 1 }";
    assert_eq!(run(source), "0\n1\n2\n");
}

#[test]
fn list_set_and_write() {
    let source = "nums =l [10, 20, 30]\nset nums(1) to (99)\nwrite(nums)";
    assert_eq!(run(source), "[10, 99, 30]\n");
}

#[test]
fn recursive_factorial() {
    let source = "func f(n =i) { if n <= 1 { return 1 }\n return n * f(n - 1) }\nwrite(f(5))";
    assert_eq!(run(source), "120\n");
}

#[test]
fn match_selects_case() {
    let source = "match 2 { 1 { write(\"a\") } 2 { write(\"b\") } else { write(\"c\") } }";
    assert_eq!(run(source), "b\n");
}

#[test]
fn match_falls_to_else() {
    let source = "match 9 { 1 { write(\"a\") } else { write(\"c\") } }";
    assert_eq!(run(source), "c\n");
}

#[test]
fn match_on_strings_and_bools() {
    assert_eq!(run("match \"b\" { \"a\" { write(1) } \"b\" { write(2) } }"), "2\n");
    assert_eq!(run("match true { false { write(1) } true { write(2) } }"), "2\n");
}

#[test]
fn match_without_matching_case_does_nothing() {
    assert_eq!(run("match 5 { 1 { write(1) } }\nwrite(\"end\")"), "end\n");
}

#[test]
fn call_before_definition() {
    let source = "write(double(21))\nfunc double(n =i) { return n * 2 }";
    assert_eq!(run(source), "42\n");
}

#[test]
fn short_circuit_and_skips_rhs() {
    let source = "\
func side(x =i) { write(x)\n return true }
a =b false and side(1)
b =b true or side(2)
c =b true and side(3)
write(a)
write(b)
write(c)";
    assert_eq!(run(source), "3\nfalse\ntrue\ntrue\n");
}

#[test]
fn and_or_yield_values() {
    assert_eq!(run("write(false or true)"), "true\n");
    assert_eq!(run("write(true and false)"), "false\n");
}

#[test]
fn container_aliasing() {
    let source = "a =l [1, 2]\nb =l a\nadd b(3)\nwrite(a)";
    assert_eq!(run(source), "[1, 2, 3]\n");
}

#[test]
fn type_marker_enforced_on_assignment() {
    let err = run_err("x =i \"s\"");
    assert_eq!(runtime_msg(&err), "Type error: cannot assign str to 'x' declared =i");
}

#[test]
fn type_marker_enforced_on_parameters() {
    let err = run_err("func f(n =i) { return n }\nwrite(f(\"x\"))");
    assert_eq!(runtime_msg(&err), "Type error: f() parameter 'n' expects int, got str");
}

#[test]
fn float_and_int_never_interchange_on_assignment() {
    assert!(run_source_collect("x =i 1.0", "test.fallen").is_err());
    assert!(run_source_collect("x =f 1", "test.fallen").is_err());
}

#[test]
fn stack_trace_has_depth_plus_one_frames() {
    let source = "\
func f(n =i) { return n / 0 }
func g(n =i) { return f(n) }
write(g(1))";
    let err = run_err(source);
    let Error::Runtime(rt) = &err else {
        panic!("expected runtime error");
    };
    assert_eq!(rt.msg, "Division by zero");
    let funcs: Vec<&str> = rt.trace.iter().map(|f| f.func.as_ref()).collect();
    assert_eq!(funcs, vec!["f", "g", "<main>"]);
    assert_eq!(rt.trace[0].line, 1);
    assert_eq!(rt.trace[1].line, 2);
    assert_eq!(rt.trace[2].line, 3);
}

#[test]
fn for_over_list() {
    assert_eq!(run("for x in [1, 2, 3] { write(x) }"), "1\n2\n3\n");
}

#[test]
fn for_over_string_yields_chars() {
    assert_eq!(run("for c in \"abc\" { write(c) }"), "a\nb\nc\n");
}

#[test]
fn for_over_dict_yields_keys_in_order() {
    let source = "d =d {\"x\": 1, \"y\": 2}\nfor k in d { write(k) }";
    assert_eq!(run(source), "x\ny\n");
}

#[test]
fn for_continue_and_stop() {
    assert_eq!(run("for i in [1, 2, 3, 4] { if i == 2 { continue }\n write(i) }"), "1\n3\n4\n");
    assert_eq!(run("for i in [1, 2, 3, 4] { if i == 3 { stop }\n write(i) }"), "1\n2\n");
}

#[test]
fn while_continue() {
    let source = "\
i =i 0
while i < 5 {
  i =i i + 1
  if i == 2 { continue }
  write(i)
}";
    assert_eq!(run(source), "1\n3\n4\n5\n");
}

#[test]
fn stop_inside_match_exits_enclosing_loop() {
    let source = "\
i =i 0
while true {
  i =i i + 1
  match i { 3 { stop } else { } }
  write(i)
}
write(\"done\")";
    assert_eq!(run(source), "1\n2\ndone\n");
}

#[test]
fn nested_loops_stop_is_innermost() {
    let source = "\
for i in [1, 2] {
  for j in [10, 20, 30] {
    if j == 20 { stop }
    write(j)
  }
  write(i)
}";
    assert_eq!(run(source), "10\n1\n10\n2\n");
}

#[test]
fn dict_index_set_get_remove() {
    let source = "\
d =d {\"a\": 1}
set d(\"b\") to (2)
write(call d(\"b\"))
remove d(\"a\")
write(d)
write(amount(d))";
    assert_eq!(run(source), "2\n{\"b\": 2}\n1\n");
}

#[test]
fn list_insert_and_remove() {
    let source = "nums =l [1, 3]\ninsert nums(1, 2)\nwrite(nums)\nremove nums(0)\nwrite(nums)";
    assert_eq!(run(source), "[1, 2, 3]\n[2, 3]\n");
}

#[test]
fn string_indexing_returns_one_char_string() {
    assert_eq!(run("s =s \"hello\"\nwrite(call s(1))"), "e\n");
}

#[test]
fn index_out_of_range() {
    let err = run_err("nums =l [1]\nwrite(call nums(5))");
    assert_eq!(runtime_msg(&err), "Index out of range: 5");
}

#[test]
fn missing_dict_key() {
    let err = run_err("d =d {\"a\": 1}\nwrite(call d(\"z\"))");
    assert_eq!(runtime_msg(&err), "Key not found: \"z\"");
}

#[test]
fn conversions() {
    assert_eq!(run("write(conv_int(\" 42 \"))"), "42\n");
    assert_eq!(run("write(conv_int(2.9))"), "2\n");
    assert_eq!(run("write(conv_float(\"2.5\"))"), "2.5\n");
    assert_eq!(run("write(conv_float(3))"), "3.0\n");
    assert_eq!(run("write(conv_bool(\"true\"))"), "true\n");
    assert_eq!(run("write(conv_bool(0))"), "false\n");
}

#[test]
fn conversion_failure_message() {
    let err = run_err("write(conv_int(\"abc\"))");
    assert_eq!(runtime_msg(&err), "Cannot convert to int: \"abc\"");
}

#[test]
fn try_conversions_return_null() {
    assert_eq!(run("write(try_conv_int(\"abc\"))"), "null\n");
    assert_eq!(run("write(try_conv_int(\"7\"))"), "7\n");
    assert_eq!(run("write(try_conv_bool(\"True\"))"), "null\n");
}

#[test]
fn amount_of_each_container() {
    assert_eq!(run("write(amount(\"abc\"))"), "3\n");
    assert_eq!(run("write(amount([1, 2]))"), "2\n");
    assert_eq!(run("write(amount({\"a\": 1}))"), "1\n");
    let err = run_err("write(amount(5))");
    assert_eq!(runtime_msg(&err), "Cannot take amount of int");
}

#[test]
fn del_pops_last() {
    assert_eq!(run("l =l [1, 2]\nwrite(del(l))\nwrite(l)"), "2\n[1]\n");
    let err = run_err("l =l []\nwrite(del(l))");
    assert_eq!(runtime_msg(&err), "Cannot del from an empty list");
}

#[test]
fn string_builtins() {
    assert_eq!(run("write(upper(\"ab\"))"), "AB\n");
    assert_eq!(run("write(lower(\"AB\"))"), "ab\n");
    assert_eq!(run("write(split(\"a,b,c\", \",\"))"), "[\"a\", \"b\", \"c\"]\n");
    assert_eq!(run("write(join([\"a\", \"b\"], \"-\"))"), "a-b\n");
    assert_eq!(run("write(replace(\"aaa\", \"a\", \"b\"))"), "bbb\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run("write(\"foo\" + \"bar\")"), "foobar\n");
}

#[test]
fn list_concatenation() {
    assert_eq!(run("write([1] + [2, 3])"), "[1, 2, 3]\n");
}

#[test]
fn division_always_floats() {
    assert_eq!(run("write(10 / 4)"), "2.5\n");
    assert_eq!(run("write(10 / 2)"), "5.0\n");
}

#[test]
fn division_by_zero() {
    let err = run_err("write(1 / 0)");
    assert_eq!(runtime_msg(&err), "Division by zero");
    let err = run_err("write(1.5 / 0.0)");
    assert_eq!(runtime_msg(&err), "Division by zero");
}

#[test]
fn mixed_numeric_arithmetic_widens() {
    assert_eq!(run("write(1 + 0.5)"), "1.5\n");
    assert_eq!(run("write(2.0 * 3)"), "6.0\n");
}

#[test]
fn unary_minus() {
    assert_eq!(run("write(-5 + 3)"), "-2\n");
    assert_eq!(run("write(-2.5)"), "-2.5\n");
}

#[test]
fn comparisons() {
    assert_eq!(run("write(1 < 2)"), "true\n");
    assert_eq!(run("write(2 <= 1)"), "false\n");
    assert_eq!(run("write(1 < 1.5)"), "true\n");
    assert_eq!(run("write(not (1 == 2))"), "true\n");
    assert_eq!(run("write(1 != 2)"), "true\n");
}

#[test]
fn ordering_non_numbers_is_an_error() {
    let err = run_err("write(\"a\" < \"b\")");
    assert_eq!(runtime_msg(&err), "Cannot order str and str");
}

#[test]
fn equality_is_structural() {
    assert_eq!(run("write([1, [2]] == [1, [2]])"), "true\n");
    assert_eq!(run("write({\"a\": 1} == {\"a\": 1})"), "true\n");
    assert_eq!(run("write(1 == 1.0)"), "true\n");
    assert_eq!(run("write(1 == \"1\")"), "false\n");
}

#[test]
fn conditions_must_be_bool() {
    let err = run_err("if 1 { write(1) }");
    assert_eq!(runtime_msg(&err), "Expected bool for condition, got int");
    let err = run_err("while \"x\" { write(1) }");
    assert_eq!(runtime_msg(&err), "Expected bool for condition, got str");
}

#[test]
fn not_requires_bool() {
    let err = run_err("write(not 1)");
    assert_eq!(runtime_msg(&err), "Expected bool for not, got int");
}

#[test]
fn undefined_variable() {
    let err = run_err("write(zzz)");
    assert_eq!(runtime_msg(&err), "Undefined variable: zzz");
}

#[test]
fn unknown_function() {
    let err = run_err("foo(1)");
    assert_eq!(runtime_msg(&err), "Unknown function: foo");
}

#[test]
fn arity_mismatch_on_user_function() {
    let err = run_err("func f(a =i, b =i) { return a }\nwrite(f(1))");
    assert_eq!(runtime_msg(&err), "f() expects 2 arguments, got 1");
}

#[test]
fn builtin_arity_mismatch() {
    let err = run_err("write(1, 2)");
    assert_eq!(runtime_msg(&err), "write() expects 1 argument, got 2");
}

#[test]
fn call_depth_is_limited() {
    let err = run_err("func f() { return f() }\nwrite(f())");
    assert_eq!(runtime_msg(&err), "Max call depth exceeded (1000)");
}

#[test]
fn bare_return_yields_null() {
    assert_eq!(run("func noop() { return }\nwrite(noop())"), "null\n");
}

#[test]
fn falling_off_function_end_yields_null() {
    assert_eq!(run("func noop() { x =i 1 }\nwrite(noop())"), "null\n");
}

#[test]
fn elif_chain() {
    let source = "\
func pick(n =i) {
  if n == 1 { return \"one\" }
  elif n == 2 { return \"two\" }
  elif n == 3 { return \"three\" }
  else { return \"many\" }
}
write(pick(2))
write(pick(3))
write(pick(9))";
    assert_eq!(run(source), "two\nthree\nmany\n");
}

#[test]
fn iterating_non_iterable_fails() {
    let err = run_err("for x in 5 { write(x) }");
    assert_eq!(runtime_msg(&err), "Cannot iterate int");
}

#[test]
fn dict_keys_must_be_strings() {
    let err = run_err("d =d {1: 2}");
    assert_eq!(runtime_msg(&err), "Dict keys must be str, got int");
}

#[test]
fn nested_containers_print() {
    let source = "x =l [1, \"two\", [3, 4], {\"k\": true}]\nwrite(x)";
    assert_eq!(run(source), "[1, \"two\", [3, 4], {\"k\": true}]\n");
}

#[test]
fn write_returns_null_in_expressions() {
    assert_eq!(run("write(write(\"hi\"))"), "hi\nnull\n");
}

#[test]
fn trace_mode_emits_diagnostics() {
    let unit = Rc::new(compile_source("trace on\nx =i 1\ntrace off\nwrite(x)", "test.fallen").unwrap());
    let mut vm = Vm::new(std::env::temp_dir(), CollectSink::new());
    vm.run_unit(&unit).unwrap();
    let diag = vm.sink().diagnostics();
    let lines: Vec<&str> = diag.lines().collect();
    // LOAD_CONST, STORE_NAME, then the TRACE_OFF dispatch itself
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "TRACE ip=0001 (LOAD_CONST, 0) stack=0");
    assert_eq!(lines[1], "TRACE ip=0002 (STORE_NAME, 0 2) stack=1");
    assert_eq!(lines[2], "TRACE ip=0003 (TRACE_OFF, None) stack=0");
    // write(x) after trace off leaves no further lines
    assert_eq!(vm.sink().output(), "1\n");
}

#[test]
fn repl_expression_echo() {
    let unit = Rc::new(fallen::compile_repl_expression("2 + 3", "<repl>").unwrap());
    let mut vm = Vm::new(std::env::temp_dir(), CollectSink::new());
    vm.run_unit(&unit).unwrap();
    assert_eq!(vm.sink().output(), "5\n");
}

#[test]
fn repl_environment_persists_across_units() {
    let mut vm = Vm::new(std::env::temp_dir(), CollectSink::new());
    let first = Rc::new(compile_source("x =i 41\nfunc inc(n =i) { return n + 1 }", "<repl>").unwrap());
    vm.run_unit(&first).unwrap();
    let second = Rc::new(compile_source("write(inc(x))", "<repl>").unwrap());
    vm.run_unit(&second).unwrap();
    assert_eq!(vm.sink().output(), "42\n");
}

#[test]
fn file_builtins_roundtrip() {
    let name = format!("fallen_io_{}.txt", std::process::id());
    let source = format!(
        "save(\"{name}\", \"hello\")\nchange(\"{name}\", \" world\")\nwrite(read(\"{name}\"))"
    );
    assert_eq!(run(&source), "hello world\n");
    let _ = std::fs::remove_file(std::env::temp_dir().join(&name));
}

#[test]
fn read_missing_file_fails() {
    let err = run_err("write(read(\"no_such_fallen_file.txt\"))");
    assert!(runtime_msg(&err).starts_with("Cannot read file \"no_such_fallen_file.txt\""));
}
