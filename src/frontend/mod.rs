//! Compiler frontend: combinator engine, lexical layer, grammar and AST.

pub mod combinator;
pub mod lexical;
pub mod parser;

pub use parser::{parse, parse_expression, ParseError};
