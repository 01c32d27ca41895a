//! Grammar layer.
//!
//! Builds the whole-program parser out of the lexical layer: expression
//! precedence climbing (suffix operators bind tightest, then prefix
//! operators, then a descending ladder of left-associative binary operator
//! levels) and the statement forms. Produces [`ast`] nodes.
//!
//! Recursive rules (`expression`, `statement`, `comma_expression`) are
//! wrapped in [`lazy`] so the grammar graph is constructed on demand, the
//! same way the original wrapped its recursive parsers in functions.

pub mod ast;


use std::rc::Rc;

use tracing::debug;

use super::combinator::{
    chainl1, choice, lazy, many, many1, not_followed_by, prefix_op, sep_by, sep_by1,
    skip_leading, succeed, suffix_op, traced, BinaryBuilder, Input, Parser, UnaryBuilder,
};
use super::lexical::{
    any_char, braces, identifier, integer, keyword, operator, parens, semicolon, squares,
    string_literal_text, symbol, whitespace_or_comments,
};
use ast::{
    BinaryOp, CatchClause, Expr, FunctionLiteral, Stmt, SwitchClause, UnaryOp, VarDeclaration,
};

/// One candidate outcome kept for diagnostics when no parse consumed all
/// input.
#[derive(Debug, Clone)]
pub struct ParseAlternative {
    pub statements: Vec<Stmt>,
    /// Byte offset where this alternative stopped consuming input.
    pub offset: usize,
}

/// Parse failure: no alternative consumed the whole input. Carries every
/// alternative produced, so callers can diagnose the furthest-reaching one.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error: no complete parse ({} partial alternatives, furthest offset {furthest})", alternatives.len())]
pub struct ParseError {
    pub alternatives: Vec<ParseAlternative>,
    pub furthest: usize,
}

/// Parse a whole program.
///
/// Succeeds only if some alternative consumed all input; the first such
/// alternative wins and any further ambiguous parses are discarded.
pub fn parse(source: &str) -> Result<Vec<Stmt>, ParseError> {
    if let Some((statements, _)) = program().run(Input::new(source)).into_iter().next() {
        return Ok(statements);
    }
    // The anchored parser drops partial parses; rerun unanchored so the
    // error can report how far each alternative got.
    let results = program_statements().run(Input::new(source));
    debug!(alternatives = results.len(), "no complete program parse");
    let furthest = results.iter().map(|(_, rest)| rest.offset()).max().unwrap_or(0);
    Err(ParseError {
        alternatives: results
            .into_iter()
            .map(|(statements, rest)| ParseAlternative {
                statements,
                offset: rest.offset(),
            })
            .collect(),
        furthest,
    })
}

/// Parse a single expression (with commas admitted), for tests and the AST
/// dump command. The whole input must be consumed.
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let anchored = not_followed_by(
        any_char(),
        skip_leading(whitespace_or_comments(), comma_expression()),
    );
    let results = anchored.run(Input::new(source));
    match results.into_iter().next() {
        Some((expr, _)) => Ok(expr),
        None => Err(ParseError {
            alternatives: Vec::new(),
            furthest: 0,
        }),
    }
}

/// The anchored program parser: leading trivia, one or more statements,
/// nothing left over.
pub fn program<'a>() -> Parser<'a, Vec<Stmt>> {
    not_followed_by(any_char(), program_statements())
}

fn program_statements<'a>() -> Parser<'a, Vec<Stmt>> {
    skip_leading(whitespace_or_comments(), many1(statement()))
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// The full expression grammar, commas excluded. Assignment forms sit at the
/// loosest level of the ladder.
pub fn expression<'a>() -> Parser<'a, Expr> {
    lazy(|| {
        let assignment_ops = choice(vec![
            binary_op("=", BinaryOp::Assign),
            binary_op("+=", BinaryOp::AddAssign),
            binary_op("-=", BinaryOp::SubAssign),
            binary_op("*=", BinaryOp::MulAssign),
            binary_op("/=", BinaryOp::DivAssign),
            binary_op("%=", BinaryOp::ModAssign),
        ]);

        // Binary operator levels, tightest first. Each level is left-
        // associative via chainl1; within a level longer operators come
        // first so they are not shadowed by their prefixes.
        let ladder: Vec<Parser<'_, BinaryBuilder<Expr>>> = vec![
            choice(vec![
                binary_op("*", BinaryOp::Mul),
                binary_op("/", BinaryOp::Div),
                binary_op("%", BinaryOp::Mod),
            ]),
            choice(vec![
                binary_op("+", BinaryOp::Add),
                binary_op("-", BinaryOp::Sub),
            ]),
            choice(vec![
                binary_op(">=", BinaryOp::Ge),
                binary_op("<=", BinaryOp::Le),
                binary_op(">", BinaryOp::Gt),
                binary_op("<", BinaryOp::Lt),
            ]),
            keyword_binary_op("instanceof", BinaryOp::Instanceof),
            choice(vec![
                binary_op("===", BinaryOp::StrictEq),
                binary_op("!==", BinaryOp::StrictNeq),
                binary_op("==", BinaryOp::Eq),
                binary_op("!=", BinaryOp::Neq),
            ]),
            binary_op("&", BinaryOp::BitAnd),
            binary_op("^", BinaryOp::BitXor),
            binary_op("|", BinaryOp::BitOr),
            binary_op("&&", BinaryOp::And),
            binary_op("||", BinaryOp::Or),
            assignment_ops,
        ];

        let mut level = prefixed();
        for op in ladder {
            level = chainl1(level, op);
        }
        level
    })
}

/// `expression (, expression)*` — yields a comma node only when there is
/// more than one operand. This wrapper is intentionally excluded from
/// literal values and argument lists; parentheses re-admit it there.
pub fn comma_expression<'a>() -> Parser<'a, Expr> {
    lazy(|| {
        sep_by1(symbol(","), expression()).map(|mut exprs| {
            if exprs.len() == 1 {
                exprs.remove(0)
            } else {
                Expr::Comma(exprs)
            }
        })
    })
}

fn binary_op<'a>(text: &'static str, op: BinaryOp) -> Parser<'a, BinaryBuilder<Expr>> {
    operator(text).map(move |_| {
        Rc::new(move |left: Expr, right: Expr| Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }) as BinaryBuilder<Expr>
    })
}

fn keyword_binary_op<'a>(text: &'static str, op: BinaryOp) -> Parser<'a, BinaryBuilder<Expr>> {
    keyword(text).map(move |_| {
        Rc::new(move |left: Expr, right: Expr| Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }) as BinaryBuilder<Expr>
    })
}

fn unary_builder(op: UnaryOp) -> UnaryBuilder<Expr> {
    Rc::new(move |operand: Expr| Expr::Unary {
        op,
        operand: Box::new(operand),
    })
}

/// Prefix operators bind looser than suffixes but tighter than any binary
/// operator.
fn prefixed<'a>() -> Parser<'a, Expr> {
    let ops = choice(vec![
        operator("+").map(|_| unary_builder(UnaryOp::Plus)),
        operator("-").map(|_| unary_builder(UnaryOp::Minus)),
        operator("!").map(|_| unary_builder(UnaryOp::Not)),
        keyword("new").map(|_| unary_builder(UnaryOp::New)),
        keyword("delete").map(|_| unary_builder(UnaryOp::Delete)),
        keyword("typeof").map(|_| unary_builder(UnaryOp::Typeof)),
        operator("--").map(|_| {
            Rc::new(|e: Expr| Expr::PreDecrement(Box::new(e))) as UnaryBuilder<Expr>
        }),
        operator("++").map(|_| {
            Rc::new(|e: Expr| Expr::PreIncrement(Box::new(e))) as UnaryBuilder<Expr>
        }),
    ]);
    prefix_op(suffixed(), ops)
}

/// Suffix operators: invocation, refinement, post increment/decrement.
/// These bind tightest of all.
fn suffixed<'a>() -> Parser<'a, Expr> {
    let ops = choice(vec![
        invocation_suffix(),
        refinement_suffix(),
        operator("--").map(|_| {
            Rc::new(|e: Expr| Expr::PostDecrement(Box::new(e))) as UnaryBuilder<Expr>
        }),
        operator("++").map(|_| {
            Rc::new(|e: Expr| Expr::PostIncrement(Box::new(e))) as UnaryBuilder<Expr>
        }),
    ]);
    suffix_op(primary(), ops)
}

fn invocation_suffix<'a>() -> Parser<'a, UnaryBuilder<Expr>> {
    parens(sep_by(symbol(","), expression())).map(|args| {
        Rc::new(move |callee: Expr| Expr::Invocation {
            callee: Box::new(callee),
            args: args.clone(),
        }) as UnaryBuilder<Expr>
    })
}

fn refinement_suffix<'a>() -> Parser<'a, UnaryBuilder<Expr>> {
    let dot_style = operator(".").skip_then(identifier()).map(|key| {
        Rc::new(move |object: Expr| Expr::Refinement {
            object: Box::new(object),
            key: Box::new(Expr::String(key.clone())),
        }) as UnaryBuilder<Expr>
    });
    let square_style = squares(expression()).map(|key| {
        Rc::new(move |object: Expr| Expr::Refinement {
            object: Box::new(object),
            key: Box::new(key.clone()),
        }) as UnaryBuilder<Expr>
    });
    choice(vec![dot_style, square_style])
}

fn primary<'a>() -> Parser<'a, Expr> {
    choice(vec![
        integer().map(Expr::Number),
        string_literal_text().map(Expr::String),
        keyword("true").map(|_| Expr::Boolean(true)),
        keyword("false").map(|_| Expr::Boolean(false)),
        keyword("undefined").map(|_| Expr::Undefined),
        keyword("null").map(|_| Expr::Null),
        keyword("this").map(|_| Expr::This),
        object_literal(),
        array_literal(),
        function_literal().map(Expr::Function),
        identifier().map(Expr::Variable),
        parens(comma_expression()),
    ])
}

fn object_literal<'a>() -> Parser<'a, Expr> {
    let pair = identifier()
        .then_skip(symbol(":"))
        .then(expression());
    braces(sep_by(symbol(","), pair)).map(Expr::Object)
}

fn array_literal<'a>() -> Parser<'a, Expr> {
    squares(sep_by(symbol(","), expression())).map(Expr::Array)
}

fn function_literal<'a>() -> Parser<'a, FunctionLiteral> {
    let params = parens(sep_by(symbol(","), identifier()));
    let body = braces(many(statement()));
    keyword("function")
        .skip_then(params)
        .then(body)
        .map(|(params, body)| FunctionLiteral { params, body })
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// A single statement. Forms that the surface grammar terminates with a
/// semicolon consume it here; block-bodied forms do not. A stray semicolon
/// parses as an empty statement.
///
/// Traced, so `RUST_LOG=trace` shows every offset the grammar tries a
/// statement at.
pub fn statement<'a>() -> Parser<'a, Stmt> {
    lazy(|| {
        traced("statement", choice(vec![
            var_statement().then_skip(semicolon()),
            assign_statement().then_skip(semicolon()),
            return_statement().then_skip(semicolon()),
            throw_statement().then_skip(semicolon()),
            keyword("break").map(|_| Stmt::Break).then_skip(semicolon()),
            keyword("continue").map(|_| Stmt::Continue).then_skip(semicolon()),
            do_while_statement().then_skip(semicolon()),
            function_declaration(),
            if_statement(),
            try_statement(),
            while_statement(),
            for_statement(),
            for_in_statement(),
            switch_statement(),
            expression_statement().then_skip(semicolon()),
            succeed(Stmt::Empty).then_skip(semicolon()),
        ]))
    })
}

/// A statement body: either a braced statement list or one bare statement.
/// `else if` falls out of the bare-statement form for free.
fn statement_body<'a>() -> Parser<'a, Vec<Stmt>> {
    choice(vec![
        braces(many(statement())),
        statement().map(|stmt| vec![stmt]),
    ])
}

fn var_statement<'a>() -> Parser<'a, Stmt> {
    let with_initializer = identifier()
        .then_skip(operator("="))
        .then(expression())
        .map(|(identifier, init)| VarDeclaration {
            identifier,
            initializer: Some(init),
        });
    let without_initializer = identifier().map(|identifier| VarDeclaration {
        identifier,
        initializer: None,
    });
    let declaration = choice(vec![with_initializer, without_initializer]);
    keyword("var")
        .skip_then(sep_by1(symbol(","), declaration))
        .map(Stmt::Var)
}

fn assign_statement<'a>() -> Parser<'a, Stmt> {
    let assignment_op = choice(vec![
        operator("=").map(|_| BinaryOp::Assign),
        operator("+=").map(|_| BinaryOp::AddAssign),
        operator("-=").map(|_| BinaryOp::SubAssign),
        operator("*=").map(|_| BinaryOp::MulAssign),
        operator("/=").map(|_| BinaryOp::DivAssign),
        operator("%=").map(|_| BinaryOp::ModAssign),
    ]);
    suffixed()
        .then(assignment_op)
        .then(comma_expression())
        .map(|((target, op), value)| Stmt::Assign { target, op, value })
}

fn return_statement<'a>() -> Parser<'a, Stmt> {
    let with_value = keyword("return")
        .skip_then(comma_expression())
        .map(Stmt::Return);
    let bare = keyword("return").map(|_| Stmt::Return(Expr::Undefined));
    choice(vec![with_value, bare])
}

fn throw_statement<'a>() -> Parser<'a, Stmt> {
    keyword("throw").skip_then(comma_expression()).map(Stmt::Throw)
}

fn expression_statement<'a>() -> Parser<'a, Stmt> {
    comma_expression().map(Stmt::Expression)
}

fn function_declaration<'a>() -> Parser<'a, Stmt> {
    let params = parens(sep_by(symbol(","), identifier()));
    let body = braces(many(statement()));
    keyword("function")
        .skip_then(identifier())
        .then(params)
        .then(body)
        .map(|((name, params), body)| Stmt::Function {
            name,
            function: FunctionLiteral { params, body },
        })
}

fn if_statement<'a>() -> Parser<'a, Stmt> {
    let with_else = keyword("if")
        .skip_then(parens(comma_expression()))
        .then(statement_body())
        .then_skip(keyword("else"))
        .then(statement_body())
        .map(|((condition, when_truthy), when_falsy)| Stmt::If {
            condition,
            when_truthy,
            when_falsy,
        });
    let without_else = keyword("if")
        .skip_then(parens(comma_expression()))
        .then(statement_body())
        .map(|(condition, when_truthy)| Stmt::If {
            condition,
            when_truthy,
            when_falsy: Vec::new(),
        });
    choice(vec![with_else, without_else])
}

fn try_statement<'a>() -> Parser<'a, Stmt> {
    let catch_clause = keyword("catch")
        .skip_then(parens(identifier()))
        .then(braces(many(statement())))
        .map(|(identifier, body)| CatchClause { identifier, body });
    let finally_block = keyword("finally").skip_then(braces(many(statement())));

    let body = keyword("try").skip_then(braces(many(statement())));

    // At least one of catch/finally is required; longest form first so the
    // shorter ones do not shadow it.
    let with_both = body
        .clone()
        .then(catch_clause.clone())
        .then(finally_block.clone())
        .map(|((body, catch), finally)| Stmt::Try {
            body,
            catch: Some(catch),
            finally: Some(finally),
        });
    let catch_only = body.clone().then(catch_clause).map(|(body, catch)| Stmt::Try {
        body,
        catch: Some(catch),
        finally: None,
    });
    let finally_only = body.then(finally_block).map(|(body, finally)| Stmt::Try {
        body,
        catch: None,
        finally: Some(finally),
    });
    choice(vec![with_both, catch_only, finally_only])
}

fn while_statement<'a>() -> Parser<'a, Stmt> {
    keyword("while")
        .skip_then(parens(comma_expression()))
        .then(statement_body())
        .map(|(condition, body)| Stmt::While { condition, body })
}

fn do_while_statement<'a>() -> Parser<'a, Stmt> {
    keyword("do")
        .skip_then(statement_body())
        .then_skip(keyword("while"))
        .then(parens(comma_expression()))
        .map(|(body, condition)| Stmt::DoWhile { condition, body })
}

fn for_statement<'a>() -> Parser<'a, Stmt> {
    let initial = choice(vec![
        var_statement(),
        assign_statement(),
        expression_statement(),
        succeed(Stmt::Empty),
    ]);
    let condition = choice(vec![expression(), succeed(Expr::Boolean(true))]);
    let finalize = choice(vec![
        assign_statement(),
        expression_statement(),
        succeed(Stmt::Empty),
    ]);

    let header = initial
        .then_skip(semicolon())
        .then(condition)
        .then_skip(semicolon())
        .then(finalize);

    keyword("for")
        .skip_then(parens(header))
        .then(statement_body())
        .map(|(((initial, condition), finalize), body)| Stmt::For {
            initial: non_empty(initial),
            condition,
            finalize: non_empty(finalize),
            body,
        })
}

fn non_empty(stmt: Stmt) -> Option<Box<Stmt>> {
    match stmt {
        Stmt::Empty => None,
        other => Some(Box::new(other)),
    }
}

fn for_in_statement<'a>() -> Parser<'a, Stmt> {
    let header = choice(vec![
        keyword("var").skip_then(identifier()),
        identifier(),
    ])
    .then_skip(keyword("in"))
    .then(comma_expression());

    keyword("for")
        .skip_then(parens(header))
        .then(statement_body())
        .map(|((identifier, object), body)| Stmt::ForIn {
            identifier,
            object,
            body,
        })
}

fn switch_statement<'a>() -> Parser<'a, Stmt> {
    let case_clause = keyword("case")
        .skip_then(expression())
        .then_skip(symbol(":"))
        .then(many(statement()))
        .map(|(expression, body)| SwitchClause::Case { expression, body });
    let default_clause = keyword("default")
        .skip_then(symbol(":"))
        .skip_then(many(statement()))
        .map(|body| SwitchClause::Default { body });

    keyword("switch")
        .skip_then(parens(comma_expression()))
        .then(braces(many(choice(vec![case_clause, default_clause]))))
        .map(|(expression, clauses)| Stmt::Switch { expression, clauses })
}
