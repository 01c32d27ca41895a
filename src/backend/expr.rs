//! Expression lowering.
//!
//! Every expression becomes a single C expression over the runtime surface:
//! literals map to value constructors, operators go through a fixed
//! operator table, and calls thread their arguments through the shared
//! argument stack (overflow check first, pushes, then the invocation).

use once_cell::sync::Lazy;

use indexmap::IndexMap;

use crate::frontend::parser::ast::{BinaryOp, Expr, UnaryOp};

use super::context::Context;
use super::function::lower_function_literal;
use super::CodegenError;

/// Fixed operator → runtime-function table. `&&`/`||` are deliberately here
/// too: both operands are evaluated, short-circuiting is not part of this
/// language's lowering.
static OPERATOR_FUNCTIONS: Lazy<IndexMap<BinaryOp, &'static str>> = Lazy::new(|| {
    IndexMap::from([
        (BinaryOp::Mul, "js_mult"),
        (BinaryOp::Div, "js_div"),
        (BinaryOp::Mod, "js_mod"),
        (BinaryOp::Add, "js_add"),
        (BinaryOp::Sub, "js_sub"),
        (BinaryOp::Ge, "js_geq"),
        (BinaryOp::Le, "js_leq"),
        (BinaryOp::Gt, "js_gt"),
        (BinaryOp::Lt, "js_lt"),
        (BinaryOp::Instanceof, "js_instanceof"),
        (BinaryOp::StrictEq, "js_strict_eq"),
        (BinaryOp::StrictNeq, "js_strict_neq"),
        (BinaryOp::Eq, "js_eq"),
        (BinaryOp::Neq, "js_neq"),
        (BinaryOp::BitAnd, "js_binary_and"),
        (BinaryOp::BitXor, "js_binary_xor"),
        (BinaryOp::BitOr, "js_binary_or"),
        (BinaryOp::And, "js_logical_and"),
        (BinaryOp::Or, "js_logical_or"),
    ])
});

fn operator_function(op: BinaryOp) -> Result<&'static str, CodegenError> {
    OPERATOR_FUNCTIONS
        .get(&op)
        .copied()
        .ok_or_else(|| CodegenError::UnsupportedOperator(format!("{op:?}")))
}

/// Lower one expression to C text.
pub fn lower_expr(ctx: &mut Context, expr: &Expr) -> Result<String, CodegenError> {
    match expr {
        Expr::Number(n) => Ok(format!("js_new_number({n})")),
        Expr::String(s) => Ok(format!("js_new_string(\"{}\")", escape_c_string(s))),
        Expr::Boolean(true) => Ok("js_new_boolean(1)".to_string()),
        Expr::Boolean(false) => Ok("js_new_boolean(0)".to_string()),
        Expr::Undefined => Ok("js_new_undefined()".to_string()),
        Expr::Null => Ok("js_new_null()".to_string()),
        Expr::This => Ok("this_value".to_string()),

        Expr::Variable(name) => Ok(format!("js_get_binding(binding, \"{name}\")")),

        Expr::Object(pairs) => {
            let mut text = "js_new_object()".to_string();
            for (key, value) in pairs {
                let value = lower_expr(ctx, value)?;
                text = format!(
                    "js_object_put({text}, js_new_string(\"{}\"), {value})",
                    escape_c_string(key)
                );
            }
            Ok(text)
        }

        Expr::Array(items) => {
            let mut text = "js_new_array()".to_string();
            for item in items {
                let item = lower_expr(ctx, item)?;
                text = format!("js_array_push({text}, {item})");
            }
            Ok(text)
        }

        Expr::Function(function) => {
            let name = lower_function_literal(ctx, &function.params, &function.body)?;
            Ok(format!("js_new_function(&{name}, binding)"))
        }

        Expr::Invocation { callee, args } => lower_invocation(ctx, callee, args),

        Expr::Refinement { object, key } => {
            let object = lower_expr(ctx, object)?;
            let key = lower_expr(ctx, key)?;
            Ok(format!("js_get({object}, {key})"))
        }

        Expr::Binary { op, left, right } if op.is_assignment() => {
            lower_assignment(ctx, left, *op, right)
        }

        Expr::Binary { op, left, right } => {
            let function = operator_function(*op)?;
            let left = lower_expr(ctx, left)?;
            let right = lower_expr(ctx, right)?;
            Ok(format!("{function}({left}, {right})"))
        }

        Expr::Unary {
            op: UnaryOp::New,
            operand,
        } => lower_construction(ctx, operand),

        Expr::Unary {
            op: UnaryOp::Delete,
            operand,
        } => match operand.as_ref() {
            Expr::Refinement { object, key } => {
                let object = lower_expr(ctx, object)?;
                let key = lower_expr(ctx, key)?;
                Ok(format!("js_delete_property({object}, {key})"))
            }
            other => Err(CodegenError::IncorrectAst(format!(
                "delete applies to a property refinement, not {other:?}"
            ))),
        },

        Expr::Unary { op, operand } => {
            let function = match op {
                UnaryOp::Plus => "js_to_number",
                UnaryOp::Minus => "js_negate",
                UnaryOp::Not => "js_logical_not",
                UnaryOp::Typeof => "js_typeof",
                UnaryOp::New | UnaryOp::Delete => unreachable!("handled above"),
            };
            let operand = lower_expr(ctx, operand)?;
            Ok(format!("{function}({operand})"))
        }

        // ++x desugars to x = x + 1 and yields the assigned value; the
        // post-increment form compensates with the inverse operation to
        // recover the value from before the assignment.
        Expr::PreIncrement(target) => {
            lower_assignment(ctx, target, BinaryOp::AddAssign, &Expr::Number(1))
        }
        Expr::PreDecrement(target) => {
            lower_assignment(ctx, target, BinaryOp::SubAssign, &Expr::Number(1))
        }
        Expr::PostIncrement(target) => {
            let incremented =
                lower_assignment(ctx, target, BinaryOp::AddAssign, &Expr::Number(1))?;
            Ok(format!("js_sub({incremented}, js_new_number(1))"))
        }
        Expr::PostDecrement(target) => {
            let decremented =
                lower_assignment(ctx, target, BinaryOp::SubAssign, &Expr::Number(1))?;
            Ok(format!("js_add({decremented}, js_new_number(1))"))
        }

        Expr::Comma(exprs) => {
            let mut parts = Vec::with_capacity(exprs.len());
            for expr in exprs {
                parts.push(lower_expr(ctx, expr)?);
            }
            Ok(format!("({})", parts.join(", ")))
        }
    }
}

/// Lower `target op value`, where `op` is `=` or a compound assignment.
/// A compound form re-resolves the target when reading its current value
/// rather than caching it, matching left-to-right re-evaluation.
pub fn lower_assignment(
    ctx: &mut Context,
    target: &Expr,
    op: BinaryOp,
    value: &Expr,
) -> Result<String, CodegenError> {
    let rhs = match op.compound_base() {
        None => lower_expr(ctx, value)?,
        Some(base) => {
            let function = operator_function(base)?;
            let current = lower_expr(ctx, target)?;
            let value = lower_expr(ctx, value)?;
            format!("{function}({current}, {value})")
        }
    };

    match target {
        Expr::Variable(name) => Ok(format!("js_assign_variable(binding, \"{name}\", {rhs})")),
        Expr::Refinement { object, key } => {
            let object = lower_expr(ctx, object)?;
            let key = lower_expr(ctx, key)?;
            Ok(format!("js_set({object}, {key}, {rhs})"))
        }
        other => Err(CodegenError::IncorrectAst(format!(
            "invalid assignment target: {other:?}"
        ))),
    }
}

/// Lower a call. Arguments travel over the shared argument stack: one
/// overflow check, then the pushes, then the invocation with the count.
/// A refinement in call position is a method call and passes the receiver
/// as `this`; anything else is a plain call with the default `this`.
fn lower_invocation(
    ctx: &mut Context,
    callee: &Expr,
    args: &[Expr],
) -> Result<String, CodegenError> {
    let mut parts = vec![format!("js_check_call_stack_overflow({})", args.len())];
    for arg in args {
        let arg = lower_expr(ctx, arg)?;
        parts.push(format!("js_push_arg({arg})"));
    }
    let call = match callee {
        Expr::Refinement { object, key } => {
            let object = lower_expr(ctx, object)?;
            let key = lower_expr(ctx, key)?;
            format!("js_invoke_method({object}, {key}, {})", args.len())
        }
        other => {
            let callee = lower_expr(ctx, other)?;
            format!("js_call_function({callee}, {})", args.len())
        }
    };
    parts.push(call);
    Ok(format!("({})", parts.join(", ")))
}

/// Lower `new expr`. A bare reference constructs with zero arguments; an
/// invocation forwards its argument list to the constructor entry point.
fn lower_construction(ctx: &mut Context, operand: &Expr) -> Result<String, CodegenError> {
    match operand {
        Expr::Invocation { callee, args } => {
            let mut parts = vec![format!("js_check_call_stack_overflow({})", args.len())];
            for arg in args {
                let arg = lower_expr(ctx, arg)?;
                parts.push(format!("js_push_arg({arg})"));
            }
            let callee = lower_expr(ctx, callee)?;
            parts.push(format!("js_invoke_constructor({callee}, {})", args.len()));
            Ok(format!("({})", parts.join(", ")))
        }
        other => {
            let callee = lower_expr(ctx, other)?;
            Ok(format!(
                "(js_check_call_stack_overflow(0), js_invoke_constructor({callee}, 0))"
            ))
        }
    }
}

/// Escape a source string for inclusion in a C string literal.
pub fn escape_c_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}
