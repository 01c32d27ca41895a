use crate::backend::{compile, CodegenError};
use crate::frontend::parse;

fn compiled(source: &str) -> String {
    let program = parse(source).expect("test program should parse");
    compile(&program).expect("test program should compile")
}

#[test]
fn test_unit_shape() {
    let text = compiled("var x = 2; return x;");
    assert!(text.starts_with(
        "#include <stdio.h>\n#include <setjmp.h>\n#include \"src/js.c\"\n"
    ));
    assert!(text.contains("static JSReturnValue js_program(void) {"));
    assert!(text.contains("JSBinding *binding = js_new_global_binding();"));
    assert!(text.contains("js_report_uncaught_exception(js_caught_value());"));
    assert!(text.ends_with(
        "int main(void) {\n    js_dump_value(js_program().value);\n    return 0;\n}\n"
    ));
}

#[test]
fn test_top_level_locals_declared_before_statements() {
    let text = compiled("var x = 2; return x;");
    let declare = text
        .find("js_declare_variable(binding, \"x\", js_new_undefined());")
        .expect("local declared");
    let assign = text
        .find("js_assign_variable(binding, \"x\", js_new_number(2));")
        .expect("initializer assigned");
    let ret = text
        .find("return js_returned(js_get_binding(binding, \"x\"));")
        .expect("value returned");
    assert!(declare < assign && assign < ret);
}

#[test]
fn test_function_literal_gets_forward_declaration_and_definition() {
    let text = compiled("var f = function (a) { return a; }; f(1);");
    assert!(text.contains(
        "static JSReturnValue fn_1(JSBinding *, JSValue, int, JSValue *);"
    ));
    assert!(text.contains(
        "static JSReturnValue fn_1(JSBinding *enclosing, JSValue this_value, int argc, JSValue *args) {"
    ));
    assert!(text.contains("js_new_function(&fn_1, binding)"));
}

#[test]
fn test_nested_literals_each_get_a_helper() {
    let text = compiled(
        "var outer = function () { var inner = function () { return 1; }; return inner; };",
    );
    assert!(text.contains("static JSReturnValue fn_1"));
    assert!(text.contains("static JSReturnValue fn_2"));
    // The outer literal claims its name first, then lowering its body
    // discovers the inner one.
    assert!(text.contains("js_new_function(&fn_2, binding)"));
}

#[test]
fn test_try_regions_are_called_from_the_program_body() {
    let text = compiled("try { f(); } catch (e) { g(e); }");
    assert!(text.contains("fn_2(binding, this_value, 0, NULL)"));
    // The handler runs in a child binding holding the caught value.
    assert!(text.contains("fn_3(catch_binding_1, this_value, 0, NULL)"));
}

#[test]
fn test_continue_fails_compilation() {
    let program = parse("while (c) { continue; }").expect("should parse");
    assert!(matches!(
        compile(&program),
        Err(CodegenError::ContinueUnsupported)
    ));
}

#[test]
fn test_factorial_program_compiles_end_to_end() {
    let text = compiled(
        "function fac(n) { if (n <= 1) return 1; return n * fac(n - 1); } return fac(5);",
    );
    assert!(text.contains("js_leq("));
    assert!(text.contains("js_mult("));
    assert!(text.contains("js_call_function(js_get_binding(binding, \"fac\"), 1)"));
}

#[test]
fn test_method_call_and_constructor() {
    let text = compiled("var p = new Point(1, 2); p.show();");
    assert!(text.contains("js_invoke_constructor(js_get_binding(binding, \"Point\"), 2)"));
    assert!(text.contains(
        "js_invoke_method(js_get_binding(binding, \"p\"), js_new_string(\"show\"), 0)"
    ));
}
