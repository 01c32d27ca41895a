//! Function and helper-region emission.
//!
//! Every generated C function, whether it backs a source-level function
//! literal or a synthesized control-flow region, has the same signature:
//!
//! ```c
//! static JSReturnValue fn_N(JSBinding *enclosing, JSValue this_value,
//!                           int argc, JSValue *args)
//! ```
//!
//! A function literal opens a fresh binding over its enclosing scope, binds
//! its parameters from the argument stack, declares its hoisted locals and
//! falls through to `js_fell_through()` when the body runs off the end. A
//! region reuses the caller's binding unchanged, so assignments inside it
//! stay visible outside.

use std::fmt::Write;

use crate::frontend::parser::ast::{Expr, Stmt, SwitchClause};

use super::context::Context;
use super::hoist::hoist;
use super::stmt::lower_statements;
use super::CodegenError;

/// Name of the implicit per-call arguments object.
pub const ARGUMENTS: &str = "arguments";

/// Lower a function literal into a fresh helper and return the helper's
/// name. The caller wraps it with `js_new_function(&name, binding)`.
pub fn lower_function_literal(
    ctx: &mut Context,
    params: &[String],
    body: &[Stmt],
) -> Result<String, CodegenError> {
    let name = ctx.fresh_function_name();
    let (body, locals) = hoist(body);

    let mut text = String::new();
    let _ = writeln!(
        text,
        "static JSReturnValue {name}(JSBinding *enclosing, JSValue this_value, int argc, JSValue *args) {{"
    );
    let _ = writeln!(text, "    JSBinding *binding = js_new_binding(enclosing);");
    if uses_arguments(body.iter()) {
        let _ = writeln!(
            text,
            "    js_declare_variable(binding, \"{ARGUMENTS}\", js_new_arguments_object(argc, args));"
        );
    }
    for (index, param) in params.iter().enumerate() {
        let _ = writeln!(
            text,
            "    js_declare_variable(binding, \"{param}\", js_arg(argc, args, {index}));"
        );
    }
    for local in &locals {
        // A local that shadows a parameter (or the arguments object) is
        // already declared; re-declaring would reset it to undefined.
        if params.iter().any(|p| p == local) || local == ARGUMENTS {
            continue;
        }
        let _ = writeln!(
            text,
            "    js_declare_variable(binding, \"{local}\", js_new_undefined());"
        );
    }

    // Outside any loop or switch, so break has no target inside this body.
    let lowered = ctx.with_break_label_cleared(|ctx| lower_statements(ctx, &body, 1))?;
    text.push_str(&lowered);

    let _ = writeln!(text, "    return js_fell_through();");
    let _ = writeln!(text, "}}");

    ctx.add_helper(name.clone(), text);
    Ok(name)
}

/// Lower a list of already-hoisted statements into a helper that runs in the
/// caller's own binding. Used for the bodies of `try`, `catch` and `finally`,
/// which need a callable region without a scope of their own. A `break`
/// aimed at a loop or switch in the enclosing function cannot `goto` across
/// the function boundary; inside a region it returns a break-tagged result
/// and the enclosing function re-dispatches it.
pub fn lower_region(ctx: &mut Context, body: &[Stmt]) -> Result<String, CodegenError> {
    let name = ctx.fresh_function_name();

    let mut text = String::new();
    let _ = writeln!(
        text,
        "static JSReturnValue {name}(JSBinding *binding, JSValue this_value, int argc, JSValue *args) {{"
    );
    let _ = writeln!(text, "    (void) argc;");
    let _ = writeln!(text, "    (void) args;");
    let lowered = ctx.with_region_break_target(|ctx| lower_statements(ctx, body, 1))?;
    text.push_str(&lowered);
    let _ = writeln!(text, "    return js_fell_through();");
    let _ = writeln!(text, "}}");

    ctx.add_helper(name.clone(), text);
    Ok(name)
}

/// Does this (hoisted) body mention the `arguments` variable? Nested
/// function literals are opaque: their own prologue decides for them.
pub fn uses_arguments<'a>(statements: impl Iterator<Item = &'a Stmt>) -> bool {
    statements.into_iter().any(stmt_uses_arguments)
}

fn stmt_uses_arguments(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Var(declarations) => declarations
            .iter()
            .any(|d| d.initializer.as_ref().is_some_and(expr_uses_arguments)),
        Stmt::Function { .. } => false,
        Stmt::Assign { target, value, .. } => {
            expr_uses_arguments(target) || expr_uses_arguments(value)
        }
        Stmt::Return(value) | Stmt::Throw(value) | Stmt::Expression(value) => {
            expr_uses_arguments(value)
        }
        Stmt::If {
            condition,
            when_truthy,
            when_falsy,
        } => {
            expr_uses_arguments(condition)
                || uses_arguments(when_truthy.iter())
                || uses_arguments(when_falsy.iter())
        }
        Stmt::Try {
            body,
            catch,
            finally,
        } => {
            uses_arguments(body.iter())
                || catch
                    .as_ref()
                    .is_some_and(|clause| uses_arguments(clause.body.iter()))
                || finally
                    .as_ref()
                    .is_some_and(|body| uses_arguments(body.iter()))
        }
        Stmt::While { condition, body } | Stmt::DoWhile { condition, body } => {
            expr_uses_arguments(condition) || uses_arguments(body.iter())
        }
        Stmt::For {
            initial,
            condition,
            finalize,
            body,
        } => {
            initial.as_deref().is_some_and(stmt_uses_arguments)
                || expr_uses_arguments(condition)
                || finalize.as_deref().is_some_and(stmt_uses_arguments)
                || uses_arguments(body.iter())
        }
        Stmt::ForIn { object, body, .. } => {
            expr_uses_arguments(object) || uses_arguments(body.iter())
        }
        Stmt::Switch {
            expression,
            clauses,
        } => {
            expr_uses_arguments(expression)
                || clauses.iter().any(|clause| match clause {
                    SwitchClause::Case { expression, body } => {
                        expr_uses_arguments(expression) || uses_arguments(body.iter())
                    }
                    SwitchClause::Default { body } => uses_arguments(body.iter()),
                })
        }
        Stmt::Break | Stmt::Continue | Stmt::Empty => false,
    }
}

fn expr_uses_arguments(expr: &Expr) -> bool {
    match expr {
        Expr::Variable(name) => name == ARGUMENTS,
        Expr::Number(_)
        | Expr::String(_)
        | Expr::Boolean(_)
        | Expr::Undefined
        | Expr::Null
        | Expr::This => false,
        // Opaque: a nested literal's `arguments` is its own.
        Expr::Function(_) => false,
        Expr::Object(pairs) => pairs.iter().any(|(_, value)| expr_uses_arguments(value)),
        Expr::Array(items) => items.iter().any(expr_uses_arguments),
        Expr::Invocation { callee, args } => {
            expr_uses_arguments(callee) || args.iter().any(expr_uses_arguments)
        }
        Expr::Refinement { object, key } => {
            expr_uses_arguments(object) || expr_uses_arguments(key)
        }
        Expr::Binary { left, right, .. } => {
            expr_uses_arguments(left) || expr_uses_arguments(right)
        }
        Expr::Unary { operand, .. } => expr_uses_arguments(operand),
        Expr::PreIncrement(target)
        | Expr::PreDecrement(target)
        | Expr::PostIncrement(target)
        | Expr::PostDecrement(target) => expr_uses_arguments(target),
        Expr::Comma(exprs) => exprs.iter().any(expr_uses_arguments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse;

    fn scan(source: &str) -> bool {
        let program = parse(source).expect("test program should parse");
        uses_arguments(program.iter())
    }

    #[test]
    fn test_direct_mention_detected() {
        assert!(scan("return arguments[0];"));
        assert!(scan("f(arguments.length);"));
    }

    #[test]
    fn test_absence_detected() {
        assert!(!scan("return x + y;"));
    }

    #[test]
    fn test_nested_literal_is_opaque() {
        assert!(!scan("var f = function () { return arguments[0]; };"));
    }

    #[test]
    fn test_mention_inside_control_flow_detected() {
        assert!(scan("while (c) { f(arguments[0]); }"));
        assert!(scan("try { f(); } catch (e) { g(arguments[1]); }"));
    }

    #[test]
    fn test_literal_prologue_shape() {
        let program = parse("var x = a; return x;").expect("should parse");
        let mut ctx = Context::new();
        let name =
            lower_function_literal(&mut ctx, &["a".to_string()], &program).expect("should lower");
        assert_eq!(name, "fn_1");
        let helper = &ctx.helpers()[0];
        assert!(helper
            .text
            .contains("JSBinding *binding = js_new_binding(enclosing);"));
        assert!(helper
            .text
            .contains("js_declare_variable(binding, \"a\", js_arg(argc, args, 0));"));
        assert!(helper
            .text
            .contains("js_declare_variable(binding, \"x\", js_new_undefined());"));
        assert!(helper.text.contains("return js_fell_through();"));
    }

    #[test]
    fn test_local_shadowing_parameter_not_redeclared() {
        let program = parse("var a = 1; return a;").expect("should parse");
        let mut ctx = Context::new();
        lower_function_literal(&mut ctx, &["a".to_string()], &program).expect("should lower");
        let text = &ctx.helpers()[0].text;
        assert_eq!(text.matches("js_declare_variable(binding, \"a\"").count(), 1);
    }

    #[test]
    fn test_arguments_object_declared_when_used() {
        let program = parse("return arguments[0];").expect("should parse");
        let mut ctx = Context::new();
        lower_function_literal(&mut ctx, &[], &program).expect("should lower");
        let text = &ctx.helpers()[0].text;
        assert!(text.contains("js_new_arguments_object(argc, args)"));
    }

    #[test]
    fn test_region_reuses_caller_binding() {
        let program = parse("x = 1;").expect("should parse");
        let mut ctx = Context::new();
        let name = lower_region(&mut ctx, &program).expect("should lower");
        let text = &ctx.helpers()[0].text;
        assert!(text.contains(&format!(
            "static JSReturnValue {name}(JSBinding *binding"
        )));
        assert!(!text.contains("js_new_binding"));
    }
}
