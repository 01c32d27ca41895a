//! Statement lowering.
//!
//! Statements become indented C statements over the runtime surface.
//! `break` compiles to a `goto` aimed at a label placed just after the
//! innermost loop or switch block, except inside a try region, where the
//! label is out of reach and the break travels back through the region's
//! result; `switch` becomes a dispatch chain of
//! strict-equality tests and `goto`s over clause labels, which gives
//! fall-through for free; `try` runs its body, handler and finalizer as
//! separate helper regions under `setjmp`-based exception frames.
//!
//! These statements are expected to come out of the hoisting pass, so a
//! surviving `var` or function declaration is a compiler bug, not a user
//! error.

use std::fmt::Write;

use crate::frontend::parser::ast::{CatchClause, Expr, Stmt, SwitchClause};

use super::context::{BreakTarget, Context};
use super::expr::{lower_assignment, lower_expr};
use super::function::lower_region;
use super::CodegenError;

fn indentation(level: usize) -> String {
    "    ".repeat(level)
}

/// Lower a hoisted statement list at the given indentation level.
pub fn lower_statements(
    ctx: &mut Context,
    statements: &[Stmt],
    level: usize,
) -> Result<String, CodegenError> {
    let mut out = String::new();
    for stmt in statements {
        out.push_str(&lower_statement(ctx, stmt, level)?);
    }
    Ok(out)
}

fn lower_statement(ctx: &mut Context, stmt: &Stmt, level: usize) -> Result<String, CodegenError> {
    let pad = indentation(level);
    match stmt {
        Stmt::Var(_) => Err(CodegenError::IncorrectAst(
            "var declaration survived hoisting".to_string(),
        )),
        Stmt::Function { name, .. } => Err(CodegenError::IncorrectAst(format!(
            "function declaration \"{name}\" survived hoisting"
        ))),

        Stmt::Assign { target, op, value } => {
            let text = lower_assignment(ctx, target, *op, value)?;
            Ok(format!("{pad}{text};\n"))
        }

        Stmt::Expression(expr) => {
            let text = lower_expr(ctx, expr)?;
            Ok(format!("{pad}{text};\n"))
        }

        Stmt::Return(expr) => {
            let text = lower_expr(ctx, expr)?;
            Ok(format!("{pad}return js_returned({text});\n"))
        }

        Stmt::Throw(expr) => {
            let text = lower_expr(ctx, expr)?;
            Ok(format!("{pad}js_throw({text});\n"))
        }

        Stmt::If {
            condition,
            when_truthy,
            when_falsy,
        } => {
            let condition = lower_expr(ctx, condition)?;
            let mut out = String::new();
            let _ = writeln!(out, "{pad}if (js_is_truthy({condition})) {{");
            out.push_str(&lower_statements(ctx, when_truthy, level + 1)?);
            if when_falsy.is_empty() {
                let _ = writeln!(out, "{pad}}}");
            } else {
                let _ = writeln!(out, "{pad}}} else {{");
                out.push_str(&lower_statements(ctx, when_falsy, level + 1)?);
                let _ = writeln!(out, "{pad}}}");
            }
            Ok(out)
        }

        Stmt::While { condition, body } => {
            let label = ctx.fresh_label();
            let condition = lower_expr(ctx, condition)?;
            let body = ctx.with_break_label(label.clone(), |ctx| {
                lower_statements(ctx, body, level + 1)
            })?;
            let mut out = String::new();
            let _ = writeln!(out, "{pad}while (js_is_truthy({condition})) {{");
            out.push_str(&body);
            let _ = writeln!(out, "{pad}}}");
            let _ = writeln!(out, "{pad}{label}: ;");
            Ok(out)
        }

        Stmt::DoWhile { condition, body } => {
            let label = ctx.fresh_label();
            let condition = lower_expr(ctx, condition)?;
            let body = ctx.with_break_label(label.clone(), |ctx| {
                lower_statements(ctx, body, level + 1)
            })?;
            let mut out = String::new();
            let _ = writeln!(out, "{pad}do {{");
            out.push_str(&body);
            let _ = writeln!(out, "{pad}}} while (js_is_truthy({condition}));");
            let _ = writeln!(out, "{pad}{label}: ;");
            Ok(out)
        }

        // By this point the initializer has been hoisted out in front, so
        // the loop reduces to a while whose body ends with the finalizer.
        Stmt::For {
            initial,
            condition,
            finalize,
            body,
        } => {
            let mut out = String::new();
            if let Some(initial) = initial {
                out.push_str(&lower_statement(ctx, initial, level)?);
            }
            let mut desugared = body.clone();
            if let Some(finalize) = finalize {
                desugared.push(finalize.as_ref().clone());
            }
            out.push_str(&lower_statement(
                ctx,
                &Stmt::While {
                    condition: condition.clone(),
                    body: desugared,
                },
                level,
            )?);
            Ok(out)
        }

        Stmt::ForIn {
            identifier,
            object,
            body,
        } => {
            let suffix = ctx.fresh_suffix();
            let label = ctx.fresh_label();
            let object = lower_expr(ctx, object)?;
            let body = ctx.with_break_label(label.clone(), |ctx| {
                lower_statements(ctx, body, level + 2)
            })?;
            let inner = indentation(level + 1);
            let mut out = String::new();
            let _ = writeln!(out, "{pad}{{");
            let _ = writeln!(
                out,
                "{inner}JSPropertyIterator iterator_{suffix} = js_make_property_iterator({object});"
            );
            let _ = writeln!(
                out,
                "{inner}while (js_property_iterator_has_next(&iterator_{suffix})) {{"
            );
            let _ = writeln!(
                out,
                "{inner}    js_assign_variable(binding, \"{identifier}\", js_property_iterator_next(&iterator_{suffix}));"
            );
            out.push_str(&body);
            let _ = writeln!(out, "{inner}}}");
            let _ = writeln!(out, "{pad}}}");
            let _ = writeln!(out, "{pad}{label}: ;");
            Ok(out)
        }

        Stmt::Switch {
            expression,
            clauses,
        } => lower_switch(ctx, expression, clauses, level),

        Stmt::Try {
            body,
            catch,
            finally,
        } => lower_try(ctx, body, catch.as_ref(), finally.as_deref(), level),

        Stmt::Break => match ctx.break_target() {
            Some(BreakTarget::Label(label)) => Ok(format!("{pad}goto {label};\n")),
            // Inside a try/catch/finally region the loop's label is out of
            // reach; return a break-tagged result for the enclosing
            // function to re-dispatch.
            Some(BreakTarget::Enclosing) => Ok(format!("{pad}return js_broke();\n")),
            None => Err(CodegenError::BreakOutsideTarget),
        },
        Stmt::Continue => Err(CodegenError::ContinueUnsupported),

        Stmt::Empty => Ok(String::new()),
    }
}

/// Switch becomes a block with one temporary holding the scrutinee, a
/// dispatch chain of strict-equality `goto`s over the case clauses in
/// source order, a fallback `goto` to the default clause (or the end),
/// and the clause bodies laid out sequentially so execution falls through
/// from one clause into the next until a `break` jumps to the end label.
fn lower_switch(
    ctx: &mut Context,
    expression: &Expr,
    clauses: &[SwitchClause],
    level: usize,
) -> Result<String, CodegenError> {
    let suffix = ctx.fresh_suffix();
    let end_label = ctx.fresh_label();
    let clause_labels: Vec<String> = clauses.iter().map(|_| ctx.fresh_label()).collect();

    let pad = indentation(level);
    let inner = indentation(level + 1);
    let scrutinee = lower_expr(ctx, expression)?;

    let mut out = String::new();
    let _ = writeln!(out, "{pad}{{");
    let _ = writeln!(out, "{inner}JSValue value_{suffix} = {scrutinee};");

    let mut default_label = None;
    for (clause, label) in clauses.iter().zip(&clause_labels) {
        match clause {
            SwitchClause::Case { expression, .. } => {
                let case = lower_expr(ctx, expression)?;
                let _ = writeln!(
                    out,
                    "{inner}if (js_is_truthy(js_strict_eq(value_{suffix}, {case}))) goto {label};"
                );
            }
            SwitchClause::Default { .. } => default_label = Some(label.clone()),
        }
    }
    let fallback = default_label.as_deref().unwrap_or(&end_label);
    let _ = writeln!(out, "{inner}goto {fallback};");

    for (clause, label) in clauses.iter().zip(&clause_labels) {
        let _ = writeln!(out, "{inner}{label}: ;");
        let body = ctx.with_break_label(end_label.clone(), |ctx| {
            lower_statements(ctx, clause.body(), level + 1)
        })?;
        out.push_str(&body);
    }

    let _ = writeln!(out, "{inner}{end_label}: ;");
    let _ = writeln!(out, "{pad}}}");
    Ok(out)
}

/// Try/catch/finally. The three bodies become helper regions sharing the
/// caller's binding. An exception frame is pushed before the guarded
/// region and popped on the normal path; on the throwing path the runtime
/// has already popped the frame before the `longjmp` lands back here.
///
/// A throw escaping the handler (or arriving with no handler at all) is
/// parked in a pending slot so the finalizer still runs exactly once, and
/// only then re-raised. A `return` from the finalizer wins over any
/// parked return or pending exception.
///
/// The catch identifier lives in a child binding, so it shadows the
/// caller's scope instead of overwriting it.
///
/// A `break` inside any of the three bodies comes back as a break-tagged
/// result; when the try sits inside a loop or switch that result is
/// re-dispatched here, either as a `goto` to the local label or by
/// returning it onward to the next enclosing region.
fn lower_try(
    ctx: &mut Context,
    body: &[Stmt],
    catch: Option<&CatchClause>,
    finally: Option<&[Stmt]>,
    level: usize,
) -> Result<String, CodegenError> {
    let break_exit = ctx.break_target().cloned();
    let suffix = ctx.fresh_suffix();
    let body_fn = lower_region(ctx, body)?;
    let catch_fn = match catch {
        Some(clause) => Some(lower_region(ctx, &clause.body)?),
        None => None,
    };
    let finally_fn = match finally {
        Some(body) => Some(lower_region(ctx, body)?),
        None => None,
    };

    let pad = indentation(level);
    let inner = indentation(level + 1);
    let deeper = indentation(level + 2);

    let mut out = String::new();
    let _ = writeln!(out, "{pad}{{");
    let _ = writeln!(out, "{inner}JSReturnValue result_{suffix};");
    let _ = writeln!(out, "{inner}JSValue pending_{suffix};");
    let _ = writeln!(out, "{inner}int has_pending_{suffix} = 0;");
    let _ = writeln!(
        out,
        "{inner}if (setjmp(*js_push_exception_handler()) == 0) {{"
    );
    let _ = writeln!(
        out,
        "{deeper}result_{suffix} = {body_fn}(binding, this_value, 0, NULL);"
    );
    let _ = writeln!(out, "{deeper}js_pop_exception_handler();");
    let _ = writeln!(out, "{inner}}} else {{");
    match (catch, &catch_fn) {
        (Some(clause), Some(catch_fn)) => {
            let _ = writeln!(
                out,
                "{deeper}JSBinding *catch_binding_{suffix} = js_new_binding(binding);"
            );
            let _ = writeln!(
                out,
                "{deeper}js_declare_variable(catch_binding_{suffix}, \"{}\", js_caught_value());",
                clause.identifier
            );
            let _ = writeln!(
                out,
                "{deeper}if (setjmp(*js_push_exception_handler()) == 0) {{"
            );
            let _ = writeln!(
                out,
                "{deeper}    result_{suffix} = {catch_fn}(catch_binding_{suffix}, this_value, 0, NULL);"
            );
            let _ = writeln!(out, "{deeper}    js_pop_exception_handler();");
            let _ = writeln!(out, "{deeper}}} else {{");
            let _ = writeln!(out, "{deeper}    pending_{suffix} = js_caught_value();");
            let _ = writeln!(out, "{deeper}    has_pending_{suffix} = 1;");
            let _ = writeln!(out, "{deeper}    result_{suffix} = js_fell_through();");
            let _ = writeln!(out, "{deeper}}}");
        }
        _ => {
            let _ = writeln!(out, "{deeper}pending_{suffix} = js_caught_value();");
            let _ = writeln!(out, "{deeper}has_pending_{suffix} = 1;");
            let _ = writeln!(out, "{deeper}result_{suffix} = js_fell_through();");
        }
    }
    let _ = writeln!(out, "{inner}}}");
    if let Some(finally_fn) = &finally_fn {
        let _ = writeln!(
            out,
            "{inner}JSReturnValue finally_result_{suffix} = {finally_fn}(binding, this_value, 0, NULL);"
        );
        let _ = writeln!(out, "{inner}if (finally_result_{suffix}.returned) {{");
        let _ = writeln!(out, "{deeper}return finally_result_{suffix};");
        let _ = writeln!(out, "{inner}}}");
        // An abrupt break out of the finalizer discards any pending
        // exception or parked return, matching finally semantics.
        if let Some(target) = &break_exit {
            let _ = writeln!(out, "{inner}if (finally_result_{suffix}.broke) {{");
            match target {
                BreakTarget::Label(label) => {
                    let _ = writeln!(out, "{deeper}goto {label};");
                }
                BreakTarget::Enclosing => {
                    let _ = writeln!(out, "{deeper}return finally_result_{suffix};");
                }
            }
            let _ = writeln!(out, "{inner}}}");
        }
    }
    let _ = writeln!(out, "{inner}if (has_pending_{suffix}) {{");
    let _ = writeln!(out, "{deeper}js_throw(pending_{suffix});");
    let _ = writeln!(out, "{inner}}}");
    let _ = writeln!(out, "{inner}if (result_{suffix}.returned) {{");
    let _ = writeln!(out, "{deeper}return result_{suffix};");
    let _ = writeln!(out, "{inner}}}");
    if let Some(target) = &break_exit {
        let _ = writeln!(out, "{inner}if (result_{suffix}.broke) {{");
        match target {
            BreakTarget::Label(label) => {
                let _ = writeln!(out, "{deeper}goto {label};");
            }
            BreakTarget::Enclosing => {
                let _ = writeln!(out, "{deeper}return result_{suffix};");
            }
        }
        let _ = writeln!(out, "{inner}}}");
    }
    let _ = writeln!(out, "{pad}}}");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::hoist::hoist;
    use crate::frontend::parse;

    fn lower(source: &str) -> (String, Context) {
        let program = parse(source).expect("test program should parse");
        let (program, _) = hoist(&program);
        let mut ctx = Context::new();
        let text = lower_statements(&mut ctx, &program, 1).expect("should lower");
        (text, ctx)
    }

    #[test]
    fn test_return_wraps_value() {
        let (text, _) = lower("return 2;");
        assert_eq!(text, "    return js_returned(js_new_number(2));\n");
    }

    #[test]
    fn test_if_without_else_omits_else() {
        let (text, _) = lower("if (c) f();");
        assert!(text.contains("if (js_is_truthy(js_get_binding(binding, \"c\"))) {"));
        assert!(!text.contains("else"));
    }

    #[test]
    fn test_while_carries_break_label() {
        let (text, _) = lower("while (c) { break; }");
        assert!(text.contains("while (js_is_truthy("));
        assert!(text.contains("goto label_1;"));
        assert!(text.contains("label_1: ;"));
    }

    #[test]
    fn test_break_outside_loop_is_rejected() {
        let program = parse("break;").expect("should parse");
        let mut ctx = Context::new();
        assert!(matches!(
            lower_statements(&mut ctx, &program, 1),
            Err(CodegenError::BreakOutsideTarget)
        ));
    }

    #[test]
    fn test_continue_is_rejected() {
        let program = parse("while (c) { continue; }").expect("should parse");
        let mut ctx = Context::new();
        assert!(matches!(
            lower_statements(&mut ctx, &program, 1),
            Err(CodegenError::ContinueUnsupported)
        ));
    }

    #[test]
    fn test_for_desugars_to_while_with_finalizer() {
        let (text, _) = lower("for (var i = 0; i < 3; i = i + 1) { f(i); }");
        // Initializer lands before the loop, finalizer at the end of the body.
        let init = text.find("js_assign_variable(binding, \"i\", js_new_number(0))");
        let loop_start = text.find("while (js_is_truthy(");
        assert!(init.expect("initializer emitted") < loop_start.expect("loop emitted"));
        let finalize = text
            .rfind("js_assign_variable(binding, \"i\", js_add(")
            .expect("finalizer emitted");
        assert!(finalize > loop_start.expect("loop emitted"));
    }

    #[test]
    fn test_for_in_drives_property_iterator() {
        let (text, _) = lower("for (key in obj) { f(key); }");
        assert!(text.contains("js_make_property_iterator(js_get_binding(binding, \"obj\"))"));
        assert!(text.contains("js_property_iterator_has_next(&iterator_1)"));
        assert!(text.contains(
            "js_assign_variable(binding, \"key\", js_property_iterator_next(&iterator_1))"
        ));
    }

    #[test]
    fn test_switch_dispatch_and_fall_through() {
        let (text, _) = lower(
            "switch (x) { case 1: f(); case 2: g(); break; default: h(); }",
        );
        // Dispatch chain before the bodies, in source order.
        let dispatch_one = text.find("js_strict_eq(value_1, js_new_number(1))").expect("case 1");
        let dispatch_two = text.find("js_strict_eq(value_1, js_new_number(2))").expect("case 2");
        assert!(dispatch_one < dispatch_two);
        // The break in clause two targets the end label.
        assert!(text.contains("goto label_2;"));
        assert!(text.contains("label_2: ;"));
        // Default clause exists, so the fallback goto does not aim at the end.
        let fallback = text.find("goto label_5;").expect("fallback to default");
        assert!(fallback < text.find("label_3: ;").expect("first clause label"));
    }

    #[test]
    fn test_switch_without_default_falls_to_end() {
        let (text, _) = lower("switch (x) { case 1: f(); }");
        // End label is label_2; the fallback goto aims straight at it.
        assert!(text.contains("goto label_2;"));
    }

    #[test]
    fn test_try_catch_finally_emits_three_regions() {
        let (text, ctx) = lower("try { f(); } catch (e) { g(e); } finally { h(); }");
        assert_eq!(ctx.helpers().len(), 3);
        assert!(text.contains("if (setjmp(*js_push_exception_handler()) == 0) {"));
        assert!(text.contains("JSBinding *catch_binding_1 = js_new_binding(binding);"));
        assert!(text.contains("js_declare_variable(catch_binding_1, \"e\", js_caught_value());"));
        assert!(text.contains("fn_3(catch_binding_1, this_value, 0, NULL);"));
        assert!(text.contains("if (finally_result_1.returned) {"));
        assert!(text.contains("js_throw(pending_1);"));
    }

    #[test]
    fn test_catch_identifier_shadows_instead_of_overwriting() {
        // The catch identifier must not land on the caller's binding, or
        // `var e = 1; try { throw 2; } catch (e) { } f(e);` would see 2.
        let (text, _) = lower("var e = 1; try { throw 2; } catch (e) { } f(e);");
        assert!(text.contains("JSBinding *catch_binding_1 = js_new_binding(binding);"));
        assert!(text.contains("js_declare_variable(catch_binding_1, \"e\", js_caught_value());"));
        assert!(!text.contains("js_declare_variable(binding, \"e\""));
    }

    #[test]
    fn test_break_inside_try_region_propagates_through_result() {
        let (text, ctx) = lower("while (c) { try { break; } finally { f(); } }");
        // The region cannot goto a label in its caller; it returns a
        // break-tagged result instead.
        let body_region = &ctx.helpers()[0].text;
        assert!(body_region.contains("return js_broke();"));
        for helper in ctx.helpers() {
            assert!(!helper.text.contains("goto label_1;"));
        }
        // The enclosing function re-dispatches the break at the try site.
        assert!(text.contains("if (result_2.broke) {"));
        assert!(text.contains("goto label_1;"));
        assert!(text.contains("if (finally_result_2.broke) {"));
    }

    #[test]
    fn test_break_in_nested_try_region_returns_onward() {
        let (text, ctx) =
            lower("while (c) { try { try { break; } finally { g(); } } finally { f(); } }");
        // The inner try sits inside the outer try's body region, so its
        // dispatch cannot goto either; it forwards the break-tagged result.
        let outer_body_region = ctx
            .helpers()
            .iter()
            .find(|h| h.name == "fn_3")
            .expect("outer body region");
        assert!(outer_body_region.text.contains("if (result_4.broke) {"));
        assert!(outer_body_region.text.contains("return result_4;"));
        assert!(!outer_body_region.text.contains("goto label_1;"));
        // Only the outermost dispatch, back in the loop's function, jumps.
        assert!(text.contains("if (result_2.broke) {"));
        assert!(text.contains("goto label_1;"));
    }

    #[test]
    fn test_try_without_catch_parks_the_exception() {
        let (text, ctx) = lower("try { f(); } finally { g(); }");
        // Only the body and finalizer become regions.
        assert_eq!(ctx.helpers().len(), 2);
        assert!(text.contains("pending_1 = js_caught_value();"));
        assert!(!text.contains("js_declare_variable"));
    }

    #[test]
    fn test_surviving_var_is_a_compiler_bug() {
        let program = parse("var x = 1;").expect("should parse");
        let mut ctx = Context::new();
        assert!(matches!(
            lower_statements(&mut ctx, &program, 1),
            Err(CodegenError::IncorrectAst(_))
        ));
    }
}
