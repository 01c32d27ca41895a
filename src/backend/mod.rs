//! C code generation.
//!
//! Turns a parsed program into one self-contained C translation unit. The
//! emitted code is plain text over a fixed runtime surface and never
//! manipulates representations directly; everything goes through runtime
//! calls (`js_new_number`, `js_get_binding`, `js_call_function`,
//! `js_throw`, ...), which keeps the generator independent of how the
//! runtime lays out values.
//!
//! The unit contains, in order: the includes, forward declarations for
//! every generated helper, the helper definitions, a `js_program` entry
//! point running the top-level statements against the global binding
//! with an uncaught-exception handler installed, and a `main` that runs
//! the program and dumps its result.
//!
//! Lowering is two passes per function body: hoisting ([`hoist`]) pulls
//! variable and function declarations into a local set, then the
//! statement and expression walkers emit C while accumulating nested
//! helpers in the [`context::Context`].

use std::fmt::Write;

use thiserror::Error;

pub mod context;
pub mod expr;
pub mod function;
pub mod hoist;
pub mod stmt;

use crate::frontend::parser::ast::Stmt;

use context::Context;
use function::ARGUMENTS;

#[cfg(test)]
mod tests;

/// Errors surfaced while lowering a well-parsed program.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// The syntax tree violated an internal shape the generator relies on.
    #[error("internal error: malformed syntax tree: {0}")]
    IncorrectAst(String),

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("break used outside of a loop or switch")]
    BreakOutsideTarget,

    #[error("continue is not supported; restructure the loop around break")]
    ContinueUnsupported,
}

/// Compile a parsed program into a complete C translation unit.
pub fn compile(program: &[Stmt]) -> Result<String, CodegenError> {
    let mut ctx = Context::new();
    let entry = lower_program(&mut ctx, program)?;

    let mut out = String::new();
    out.push_str("#include <stdio.h>\n");
    out.push_str("#include <setjmp.h>\n");
    out.push_str("#include \"src/js.c\"\n");
    out.push('\n');

    for helper in ctx.helpers() {
        let _ = writeln!(
            out,
            "static JSReturnValue {}(JSBinding *, JSValue, int, JSValue *);",
            helper.name
        );
    }
    if !ctx.helpers().is_empty() {
        out.push('\n');
    }

    for helper in ctx.helpers() {
        out.push_str(&helper.text);
        out.push('\n');
    }

    out.push_str(&entry);
    out.push('\n');
    out.push_str("int main(void) {\n");
    out.push_str("    js_dump_value(js_program().value);\n");
    out.push_str("    return 0;\n");
    out.push_str("}\n");
    Ok(out)
}

/// Lower the top-level statement list into the `js_program` entry point.
/// Top level behaves like a function body over the global binding, with
/// `this` undefined and a handler that reports any exception nothing
/// below caught.
fn lower_program(ctx: &mut Context, program: &[Stmt]) -> Result<String, CodegenError> {
    let (program, locals) = hoist::hoist(program);

    let mut out = String::new();
    out.push_str("static JSReturnValue js_program(void) {\n");
    out.push_str("    JSBinding *binding = js_new_global_binding();\n");
    out.push_str("    JSValue this_value = js_new_undefined();\n");
    out.push_str("    if (setjmp(*js_push_exception_handler()) != 0) {\n");
    out.push_str("        js_report_uncaught_exception(js_caught_value());\n");
    out.push_str("        return js_fell_through();\n");
    out.push_str("    }\n");
    for local in &locals {
        if local == ARGUMENTS {
            continue;
        }
        let _ = writeln!(
            out,
            "    js_declare_variable(binding, \"{local}\", js_new_undefined());"
        );
    }
    out.push_str(&stmt::lower_statements(ctx, &program, 1)?);
    out.push_str("    return js_fell_through();\n");
    out.push_str("}\n");
    Ok(out)
}
