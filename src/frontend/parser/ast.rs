//! Abstract Syntax Tree types.
//!
//! A closed set of node variants, built by the grammar layer and traversed by
//! the backend. Every variant owns its children exclusively; the tree is
//! immutable after construction. The hoisting pass in the backend builds new
//! statement lists rather than rewriting these nodes in place.

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(i64),
    String(String),
    Boolean(bool),
    Undefined,
    Null,
    This,
    /// Object literal, pairs in source (insertion) order.
    Object(Vec<(String, Expr)>),
    Array(Vec<Expr>),
    Function(FunctionLiteral),
    Variable(String),
    Invocation {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Property access: `object.name` (key becomes a string literal) or
    /// `object[expr]`.
    Refinement {
        object: Box<Expr>,
        key: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    PreIncrement(Box<Expr>),
    PreDecrement(Box<Expr>),
    PostIncrement(Box<Expr>),
    PostDecrement(Box<Expr>),
    /// `a, b, c` — evaluates every operand, yields the last.
    Comma(Vec<Expr>),
}

/// A function literal: parameter names plus body statements. Local-variable
/// analysis happens in the backend and does not live on the node.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// Binary operators. Precedence lives in the grammar, associated runtime
/// functions in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Ge,
    Le,
    Gt,
    Lt,
    Instanceof,
    StrictEq,
    StrictNeq,
    Eq,
    Neq,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl BinaryOp {
    /// For a compound assignment, the operator it desugars through.
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubAssign => Some(BinaryOp::Sub),
            BinaryOp::MulAssign => Some(BinaryOp::Mul),
            BinaryOp::DivAssign => Some(BinaryOp::Div),
            BinaryOp::ModAssign => Some(BinaryOp::Mod),
            _ => None,
        }
    }

    pub fn is_assignment(self) -> bool {
        self == BinaryOp::Assign || self.compound_base().is_some()
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    New,
    Delete,
    Typeof,
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var a = 1, b, c = 2;`
    Var(Vec<VarDeclaration>),
    /// Named function declaration; hoisting rewrites it into a var with a
    /// function-literal initializer.
    Function {
        name: String,
        function: FunctionLiteral,
    },
    /// `target = value;` and compound forms. `op` is always an assignment
    /// operator.
    Assign {
        target: Expr,
        op: BinaryOp,
        value: Expr,
    },
    Return(Expr),
    Throw(Expr),
    Expression(Expr),
    If {
        condition: Expr,
        when_truthy: Vec<Stmt>,
        when_falsy: Vec<Stmt>,
    },
    /// At least one of `catch`/`finally` is present; the grammar enforces it.
    Try {
        body: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        condition: Expr,
        body: Vec<Stmt>,
    },
    /// `for (initial; condition; finalize) { body }`; an omitted condition
    /// parses as `true`.
    For {
        initial: Option<Box<Stmt>>,
        condition: Expr,
        finalize: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    /// `for (key in object)` — iterates own and inherited enumerable
    /// property names.
    ForIn {
        identifier: String,
        object: Expr,
        body: Vec<Stmt>,
    },
    Switch {
        expression: Expr,
        clauses: Vec<SwitchClause>,
    },
    Break,
    Continue,
    /// A stray semicolon.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclaration {
    pub identifier: String,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub identifier: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchClause {
    Case { expression: Expr, body: Vec<Stmt> },
    Default { body: Vec<Stmt> },
}

impl SwitchClause {
    pub fn body(&self) -> &[Stmt] {
        match self {
            SwitchClause::Case { body, .. } => body,
            SwitchClause::Default { body } => body,
        }
    }
}
