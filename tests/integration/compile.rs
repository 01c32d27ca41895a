//! End-to-end compilation: source text in, complete C translation unit out.

use jscc::compile_source;

const FACTORIAL: &str = "\
function fac(n) {
  if (n <= 1) {
    return 1;
  }
  return n * fac(n - 1);
}
return fac(5);
";

#[test]
fn test_factorial_round_trip_structure() {
    let c_source = compile_source(FACTORIAL).expect("factorial should compile");

    // One helper for fac, forward-declared and defined.
    assert!(c_source.contains("static JSReturnValue fn_1(JSBinding *, JSValue, int, JSValue *);"));
    assert!(c_source.contains(
        "static JSReturnValue fn_1(JSBinding *enclosing, JSValue this_value, int argc, JSValue *args) {"
    ));

    // The helper binds its parameter from the argument stack and recurses
    // through the binding chain.
    assert!(c_source.contains("js_declare_variable(binding, \"n\", js_arg(argc, args, 0));"));
    assert!(c_source.contains("js_call_function(js_get_binding(binding, \"fac\"), 1)"));

    // The program body declares fac, wires up the literal and returns the
    // call result.
    assert!(c_source.contains("js_declare_variable(binding, \"fac\", js_new_undefined());"));
    assert!(c_source.contains(
        "js_assign_variable(binding, \"fac\", js_new_function(&fn_1, binding));"
    ));
    assert!(c_source.contains("return js_returned("));

    // Unit framing.
    assert!(c_source.starts_with("#include <stdio.h>\n"));
    assert!(c_source.contains("#include \"src/js.c\""));
    assert!(c_source.contains("static JSReturnValue js_program(void) {"));
    assert!(c_source.trim_end().ends_with("}"));
}

#[test]
fn test_closure_captures_enclosing_binding() {
    let c_source = compile_source(
        "function counter() {
           var n = 0;
           return function () {
             n = n + 1;
             return n;
           };
         }
         var tick = counter();
         tick();
         return tick();",
    )
    .expect("closure program should compile");

    // The inner literal is created over the binding that holds n.
    assert!(c_source.contains("js_new_function(&fn_2, binding)"));
    assert!(c_source.contains("js_assign_variable(binding, \"n\""));
}

#[test]
fn test_exception_program_structure() {
    let c_source = compile_source(
        "try {
           throw new Error(\"boom\");
         } catch (e) {
           return e.message;
         } finally {
           log();
         }",
    )
    .expect("exception program should compile");

    assert!(c_source.contains("setjmp(*js_push_exception_handler())"));
    assert!(c_source.contains("js_throw("));
    // The caught value lands in a child binding, not the caller's.
    assert!(c_source.contains("JSBinding *catch_binding_1 = js_new_binding(binding);"));
    assert!(c_source.contains("js_declare_variable(catch_binding_1, \"e\", js_caught_value());"));
    // Top level installs the uncaught-exception report.
    assert!(c_source.contains("js_report_uncaught_exception(js_caught_value());"));
}

#[test]
fn test_break_out_of_guarded_loop_body_compiles_to_valid_dispatch() {
    let c_source = compile_source(
        "var i = 0;
         while (true) {
           try {
             i = i + 1;
             if (i === 3) {
               break;
             }
           } finally {
             log(i);
           }
         }
         return i;",
    )
    .expect("guarded loop should compile");

    // Helpers are emitted ahead of js_program; none of them may goto a
    // label that lives in the program body.
    let program_at = c_source
        .find("static JSReturnValue js_program(void) {")
        .expect("program body emitted");
    let first_goto = c_source.find("goto label_").expect("break dispatch emitted");
    assert!(first_goto > program_at);
    assert!(c_source.contains("return js_broke();"));
    assert!(c_source.contains(".broke) {"));
}

#[test]
fn test_for_in_and_switch_programs_compile() {
    assert!(compile_source("for (k in o) { f(k); }").is_ok());
    assert!(compile_source(
        "switch (x) { case 1: f(); break; default: g(); }"
    )
    .is_ok());
}

#[test]
fn test_parse_failure_surfaces_as_error() {
    let error = compile_source("var x = ;").expect_err("should fail");
    assert!(format!("{error:#}").contains("failed to parse"));
}

#[test]
fn test_continue_failure_surfaces_as_error() {
    let error =
        compile_source("while (c) { continue; }").expect_err("should fail");
    assert!(format!("{error:#}").contains("continue"));
}
