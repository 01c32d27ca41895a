//! Lexical layer: character primitives, literals, identifiers, keywords and
//! operators, built directly from the combinator engine.
//!
//! There is no separate token stream. Every parser here is (or is meant to be
//! wrapped into) a *lexeme*: it consumes its own trailing whitespace and
//! comments, so trivia never reaches the grammar layer or the AST.

use super::combinator::{
    between, choice, lazy, many, many1, not_followed_by, skip_trailing, Parser,
};

/// Accept exactly the character `expected`.
pub fn character<'a>(expected: char) -> Parser<'a, char> {
    Parser::new(move |input| match input.next() {
        Some((ch, rest)) if ch == expected => vec![(ch, rest)],
        _ => Vec::new(),
    })
}

/// Accept any single character.
pub fn any_char<'a>() -> Parser<'a, char> {
    Parser::new(|input| match input.next() {
        Some((ch, rest)) => vec![(ch, rest)],
        None => Vec::new(),
    })
}

/// Accept any single character from `allowed`.
pub fn any_char_of<'a>(allowed: &'static str) -> Parser<'a, char> {
    Parser::new(move |input| match input.next() {
        Some((ch, rest)) if allowed.contains(ch) => vec![(ch, rest)],
        _ => Vec::new(),
    })
}

/// Accept any single character *not* in `disallowed`.
pub fn other_than_chars<'a>(disallowed: &'static str) -> Parser<'a, char> {
    Parser::new(move |input| match input.next() {
        Some((ch, rest)) if !disallowed.contains(ch) => vec![(ch, rest)],
        _ => Vec::new(),
    })
}

/// Accept exactly the string `expected` and return it.
pub fn literal<'a>(expected: &'static str) -> Parser<'a, String> {
    Parser::new(move |input| match input.strip_prefix(expected) {
        Some(rest) => vec![(expected.to_string(), rest)],
        None => Vec::new(),
    })
}

/// Succeed (with nothing) only at the end of input.
pub fn end_of_input<'a>() -> Parser<'a, ()> {
    Parser::new(|input| {
        if input.is_empty() {
            vec![((), input)]
        } else {
            Vec::new()
        }
    })
}

pub fn letter<'a>() -> Parser<'a, char> {
    Parser::new(|input| match input.next() {
        Some((ch, rest)) if ch.is_ascii_alphabetic() => vec![(ch, rest)],
        _ => Vec::new(),
    })
}

pub fn digit<'a>() -> Parser<'a, char> {
    Parser::new(|input| match input.next() {
        Some((ch, rest)) if ch.is_ascii_digit() => vec![(ch, rest)],
        _ => Vec::new(),
    })
}

/// A character that may continue an identifier. Used by [`keyword`] to make
/// sure `truex` is never read as the keyword `true`.
fn identifier_char<'a>() -> Parser<'a, char> {
    Parser::new(|input| match input.next() {
        Some((ch, rest)) if ch.is_ascii_alphanumeric() || ch == '_' => vec![(ch, rest)],
        _ => Vec::new(),
    })
}

fn whitespace<'a>() -> Parser<'a, char> {
    any_char_of(" \t\r\n")
}

fn line_comment<'a>() -> Parser<'a, ()> {
    literal("//")
        .skip_then(many(other_than_chars("\n")))
        .skip_then(choice(vec![
            character('\n').map(|_| ()),
            end_of_input(),
        ]))
}

fn delimited_comment<'a>() -> Parser<'a, ()> {
    // Inside the comment, a '*' is fine as long as it does not close it.
    let body = many(choice(vec![
        other_than_chars("*"),
        not_followed_by(character('/'), character('*')),
    ]));
    literal("/*")
        .skip_then(body)
        .skip_then(literal("*/"))
        .map(|_| ())
}

/// A run (possibly empty) of whitespace and comments.
pub fn whitespace_or_comments<'a>() -> Parser<'a, ()> {
    many(choice(vec![
        whitespace().map(|_| ()),
        lazy(delimited_comment),
        lazy(line_comment),
    ]))
    .map(|_| ())
}

/// Wrap `parser` so it also consumes (and discards) trailing trivia.
pub fn lexeme<'a, T: Clone + 'a>(parser: Parser<'a, T>) -> Parser<'a, T> {
    skip_trailing(whitespace_or_comments(), parser)
}

/// An identifier: a letter followed by letters, digits or underscores.
pub fn identifier<'a>() -> Parser<'a, String> {
    let rest = many(choice(vec![letter(), digit(), character('_')]));
    lexeme(letter().bind(move |first| {
        rest.clone().map(move |tail| {
            let mut name = String::new();
            name.push(first);
            name.extend(tail);
            name
        })
    }))
}

/// A decimal integer literal. Floating point is not part of the language.
pub fn integer<'a>() -> Parser<'a, i64> {
    lexeme(Parser::new(|input| {
        let digits = many1(digit()).run(input);
        digits
            .into_iter()
            .filter_map(|(ds, rest)| {
                let text: String = ds.into_iter().collect();
                text.parse::<i64>().ok().map(|n| (n, rest))
            })
            .collect()
    }))
}

/// The text of a string literal, single- or double-quoted, with the escape
/// sequences `\\ \' \" \n \t`. A raw newline inside the literal is rejected.
pub fn string_literal_text<'a>() -> Parser<'a, String> {
    fn escape_sequence<'a>() -> Parser<'a, char> {
        choice(vec![
            literal("\\\\").map(|_| '\\'),
            literal("\\'").map(|_| '\''),
            literal("\\\"").map(|_| '"'),
            literal("\\n").map(|_| '\n'),
            literal("\\t").map(|_| '\t'),
        ])
    }

    fn contents<'a>(stop: &'static str) -> Parser<'a, String> {
        many(choice(vec![escape_sequence(), other_than_chars(stop)]))
            .map(|chars| chars.into_iter().collect())
    }

    let in_single_quotes = between(character('\''), character('\''), contents("'\\\n"));
    let in_double_quotes = between(character('"'), character('"'), contents("\"\\\n"));

    lexeme(choice(vec![in_single_quotes, in_double_quotes]))
}

/// Accept the keyword `s`, but only when not immediately followed by another
/// identifier character.
pub fn keyword<'a>(s: &'static str) -> Parser<'a, String> {
    lexeme(not_followed_by(identifier_char(), literal(s)))
}

/// Characters that can extend an operator into a longer one. `operator("=")`
/// must not fire on `==`, nor `operator("+")` on `++` or `+=`.
const OPERATOR_EXTENSION: &str = "-+=<>!|&";

/// Accept the operator `s`, but only when not immediately followed by a
/// character that would extend it into a different operator.
pub fn operator<'a>(s: &'static str) -> Parser<'a, String> {
    lexeme(not_followed_by(any_char_of(OPERATOR_EXTENSION), literal(s)))
}

/// Accept the punctuation `s` with no lookahead restriction.
pub fn symbol<'a>(s: &'static str) -> Parser<'a, String> {
    lexeme(literal(s))
}

pub fn semicolon<'a>() -> Parser<'a, char> {
    lexeme(character(';'))
}

pub fn parens<'a, T: Clone + 'a>(parser: Parser<'a, T>) -> Parser<'a, T> {
    between(symbol("("), symbol(")"), parser)
}

pub fn braces<'a, T: Clone + 'a>(parser: Parser<'a, T>) -> Parser<'a, T> {
    between(symbol("{"), symbol("}"), parser)
}

pub fn squares<'a, T: Clone + 'a>(parser: Parser<'a, T>) -> Parser<'a, T> {
    between(symbol("["), symbol("]"), parser)
}
