//! Scope normalization ("hoisting").
//!
//! Walks one function's statement list and moves every variable declaration
//! into the function's local-variable set. A declaration with an initializer
//! leaves a plain assignment behind at its original position; one without an
//! initializer vanishes from the statement stream. Named function
//! declarations become assignments of function literals. Nested blocks
//! (`if`, loops, `try`, `switch` clauses) are visited, nested *function
//! literals* are not — they get their own pass when they are lowered.
//!
//! The pass builds a new statement list rather than mutating the tree.

use indexmap::IndexSet;

use crate::frontend::parser::ast::{
    BinaryOp, CatchClause, Expr, Stmt, SwitchClause, VarDeclaration,
};

/// Hoist one function body. Returns the rewritten statements and the set of
/// local variable names, each recorded exactly once, in first-seen order.
pub fn hoist(statements: &[Stmt]) -> (Vec<Stmt>, IndexSet<String>) {
    let mut locals = IndexSet::new();
    let rewritten = hoist_block(statements, &mut locals);
    (rewritten, locals)
}

fn hoist_block(statements: &[Stmt], locals: &mut IndexSet<String>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(statements.len());
    for stmt in statements {
        hoist_statement(stmt, locals, &mut out);
    }
    out
}

fn hoist_statement(stmt: &Stmt, locals: &mut IndexSet<String>, out: &mut Vec<Stmt>) {
    match stmt {
        Stmt::Var(declarations) => {
            for VarDeclaration {
                identifier,
                initializer,
            } in declarations
            {
                locals.insert(identifier.clone());
                if let Some(value) = initializer {
                    out.push(Stmt::Assign {
                        target: Expr::Variable(identifier.clone()),
                        op: BinaryOp::Assign,
                        value: value.clone(),
                    });
                }
            }
        }

        Stmt::Function { name, function } => {
            // Equivalent to `var name = function (...) {...};` after the
            // var itself has been hoisted.
            locals.insert(name.clone());
            out.push(Stmt::Assign {
                target: Expr::Variable(name.clone()),
                op: BinaryOp::Assign,
                value: Expr::Function(function.clone()),
            });
        }

        Stmt::If {
            condition,
            when_truthy,
            when_falsy,
        } => out.push(Stmt::If {
            condition: condition.clone(),
            when_truthy: hoist_block(when_truthy, locals),
            when_falsy: hoist_block(when_falsy, locals),
        }),

        Stmt::While { condition, body } => out.push(Stmt::While {
            condition: condition.clone(),
            body: hoist_block(body, locals),
        }),

        Stmt::DoWhile { condition, body } => out.push(Stmt::DoWhile {
            condition: condition.clone(),
            body: hoist_block(body, locals),
        }),

        Stmt::For {
            initial,
            condition,
            finalize,
            body,
        } => {
            // The initializer runs once before the loop; emitting its
            // hoisted form right here preserves execution order and lets
            // `var` initializers split into several assignments.
            if let Some(initial) = initial {
                hoist_statement(initial, locals, out);
            }
            out.push(Stmt::For {
                initial: None,
                condition: condition.clone(),
                finalize: finalize.clone(),
                body: hoist_block(body, locals),
            });
        }

        Stmt::ForIn {
            identifier,
            object,
            body,
        } => {
            locals.insert(identifier.clone());
            out.push(Stmt::ForIn {
                identifier: identifier.clone(),
                object: object.clone(),
                body: hoist_block(body, locals),
            });
        }

        Stmt::Try {
            body,
            catch,
            finally,
        } => out.push(Stmt::Try {
            body: hoist_block(body, locals),
            catch: catch.as_ref().map(|clause| CatchClause {
                identifier: clause.identifier.clone(),
                body: hoist_block(&clause.body, locals),
            }),
            finally: finally.as_ref().map(|body| hoist_block(body, locals)),
        }),

        Stmt::Switch {
            expression,
            clauses,
        } => out.push(Stmt::Switch {
            expression: expression.clone(),
            clauses: clauses
                .iter()
                .map(|clause| match clause {
                    SwitchClause::Case { expression, body } => SwitchClause::Case {
                        expression: expression.clone(),
                        body: hoist_block(body, locals),
                    },
                    SwitchClause::Default { body } => SwitchClause::Default {
                        body: hoist_block(body, locals),
                    },
                })
                .collect(),
        }),

        other => out.push(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse;

    fn hoisted(source: &str) -> (Vec<Stmt>, IndexSet<String>) {
        let program = parse(source).expect("test program should parse");
        hoist(&program)
    }

    #[test]
    fn test_initializer_becomes_assignment_in_place() {
        let (stmts, locals) = hoisted("f(); var x = 2; g();");
        assert_eq!(locals.len(), 1);
        assert!(locals.contains("x"));
        assert_eq!(stmts.len(), 3);
        assert!(matches!(
            &stmts[1],
            Stmt::Assign {
                target: Expr::Variable(name),
                op: BinaryOp::Assign,
                ..
            } if name == "x"
        ));
    }

    #[test]
    fn test_bare_declaration_vanishes() {
        let (stmts, locals) = hoisted("var x; f();");
        assert_eq!(stmts.len(), 1);
        assert!(locals.contains("x"));
    }

    #[test]
    fn test_multiple_declarators_split() {
        let (stmts, locals) = hoisted("var a = 1, b, c = 2;");
        assert_eq!(locals.len(), 3);
        // b has no initializer, so only two assignments survive.
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_declaration_inside_if_is_recorded() {
        let (_, locals) = hoisted("if (c) { var x = 1; } else { var y = 2; }");
        assert!(locals.contains("x"));
        assert!(locals.contains("y"));
    }

    #[test]
    fn test_name_recorded_exactly_once() {
        let (_, locals) = hoisted("var x = 1; if (c) { var x = 2; }");
        assert_eq!(locals.iter().filter(|n| *n == "x").count(), 1);
    }

    #[test]
    fn test_function_declaration_becomes_assignment() {
        let (stmts, locals) = hoisted("function f(a) { return a; }");
        assert!(locals.contains("f"));
        assert!(matches!(
            &stmts[0],
            Stmt::Assign {
                value: Expr::Function(_),
                ..
            }
        ));
    }

    #[test]
    fn test_nested_function_literal_is_opaque() {
        let (_, locals) = hoisted("var f = function () { var inner = 1; };");
        assert!(locals.contains("f"));
        assert!(!locals.contains("inner"));
    }

    #[test]
    fn test_for_initializer_hoists_before_loop() {
        let (stmts, locals) = hoisted("for (var i = 0; i < 3; i = i + 1) { f(i); }");
        assert!(locals.contains("i"));
        assert!(matches!(&stmts[0], Stmt::Assign { .. }));
        assert!(matches!(&stmts[1], Stmt::For { initial: None, .. }));
    }

    #[test]
    fn test_for_in_identifier_is_recorded() {
        let (_, locals) = hoisted("for (key in obj) { f(key); }");
        assert!(locals.contains("key"));
    }
}
