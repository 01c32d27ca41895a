//! Backtracking parser combinator engine.
//!
//! A parser is a function from an input cursor to an ordered list of
//! alternatives, where each alternative is a pair of (parsed value, remaining
//! input). A non-empty list is a successful parse; more than one entry means
//! the grammar was genuinely ambiguous at that point. Failure is always the
//! empty list, never a panic or an error value, so `choice` can try the next
//! branch cheaply.

use std::rc::Rc;

use tracing::trace;

/// Immutable cursor over the source text. Copying is free, which is what
/// makes backtracking cheap: an alternative is just a value plus a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input<'a> {
    source: &'a str,
    offset: usize,
}

impl<'a> Input<'a> {
    pub fn new(source: &'a str) -> Self {
        Input { source, offset: 0 }
    }

    /// The text that has not been consumed yet.
    pub fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    /// Byte offset into the original source, for diagnostics.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.source.len()
    }

    /// Consume one character, if any.
    pub fn next(&self) -> Option<(char, Input<'a>)> {
        let ch = self.rest().chars().next()?;
        Some((
            ch,
            Input {
                source: self.source,
                offset: self.offset + ch.len_utf8(),
            },
        ))
    }

    /// Consume an exact prefix.
    pub fn strip_prefix(&self, prefix: &str) -> Option<Input<'a>> {
        if self.rest().starts_with(prefix) {
            Some(Input {
                source: self.source,
                offset: self.offset + prefix.len(),
            })
        } else {
            None
        }
    }
}

/// Ordered list of (value, remaining input) candidates. Empty means failure.
pub type Alternatives<'a, T> = Vec<(T, Input<'a>)>;

/// Builder returned by binary operator parsers; `chainl1` applies it to the
/// accumulated left operand and the freshly parsed right operand.
pub type BinaryBuilder<T> = Rc<dyn Fn(T, T) -> T>;

/// Builder returned by unary operator parsers, for `prefix_op`/`suffix_op`.
pub type UnaryBuilder<T> = Rc<dyn Fn(T) -> T>;

/// A cheaply clonable parser handle.
///
/// Recursive grammar rules cannot name themselves while being constructed;
/// wrap the recursive reference in [`lazy`] so construction is deferred to
/// the first run, exactly like the original's function-wrapped parsers.
pub struct Parser<'a, T> {
    f: Rc<dyn Fn(Input<'a>) -> Alternatives<'a, T> + 'a>,
}

impl<'a, T> Clone for Parser<'a, T> {
    fn clone(&self) -> Self {
        Parser {
            f: Rc::clone(&self.f),
        }
    }
}

impl<'a, T: 'a> Parser<'a, T> {
    pub fn new(f: impl Fn(Input<'a>) -> Alternatives<'a, T> + 'a) -> Self {
        Parser { f: Rc::new(f) }
    }

    pub fn run(&self, input: Input<'a>) -> Alternatives<'a, T> {
        (self.f)(input)
    }

    pub fn map<U: 'a>(self, f: impl Fn(T) -> U + 'a) -> Parser<'a, U> {
        Parser::new(move |input| {
            self.run(input)
                .into_iter()
                .map(|(value, rest)| (f(value), rest))
                .collect()
        })
    }

    pub fn bind<U: 'a>(self, f: impl Fn(T) -> Parser<'a, U> + 'a) -> Parser<'a, U> {
        Parser::new(move |input| {
            let mut out = Vec::new();
            for (value, rest) in self.run(input) {
                out.extend(f(value).run(rest));
            }
            out
        })
    }

    /// Run `self` then `other`, keeping only `other`'s result.
    pub fn skip_then<U: 'a>(self, other: Parser<'a, U>) -> Parser<'a, U> {
        self.bind(move |_| other.clone())
    }

    /// Run `self` then `other`, keeping only `self`'s result.
    pub fn then_skip<U: 'a>(self, other: Parser<'a, U>) -> Parser<'a, T>
    where
        T: Clone,
    {
        self.bind(move |value| other.clone().map(move |_| value.clone()))
    }

    /// Run `self` then `other`, keeping both results.
    pub fn then<U: 'a>(self, other: Parser<'a, U>) -> Parser<'a, (T, U)>
    where
        T: Clone,
    {
        self.bind(move |left| {
            other
                .clone()
                .map(move |right| (left.clone(), right))
        })
    }
}

/// Always succeed with `value`, consuming nothing.
pub fn succeed<'a, T: Clone + 'a>(value: T) -> Parser<'a, T> {
    Parser::new(move |input| vec![(value.clone(), input)])
}

/// Defer construction of a parser until it is actually run. Needed for
/// recursive rules (an expression contains expressions).
pub fn lazy<'a, T: 'a>(build: impl Fn() -> Parser<'a, T> + 'a) -> Parser<'a, T> {
    Parser::new(move |input| build().run(input))
}

/// Run every parser in order over the same input and return the results of
/// the first one that succeeds.
///
/// Ordering contract: no earlier alternative may accept a strict prefix of
/// what a later one accepts at the same position, otherwise the longer parse
/// is silently lost. The engine does not enforce this; the grammar must.
pub fn choice<'a, T: 'a>(parsers: Vec<Parser<'a, T>>) -> Parser<'a, T> {
    Parser::new(move |input| {
        for parser in &parsers {
            let results = parser.run(input);
            if !results.is_empty() {
                return results;
            }
        }
        Vec::new()
    })
}

/// Like [`choice`], but runs every parser and concatenates all successful
/// results. May take exponential time when nested.
pub fn every_choice<'a, T: 'a>(parsers: Vec<Parser<'a, T>>) -> Parser<'a, T> {
    Parser::new(move |input| {
        let mut out = Vec::new();
        for parser in &parsers {
            out.extend(parser.run(input));
        }
        out
    })
}

/// Run a uniform list of parsers in order, collecting all results.
pub fn sequence<'a, T: Clone + 'a>(parsers: Vec<Parser<'a, T>>) -> Parser<'a, Vec<T>> {
    let mut result: Parser<'a, Vec<T>> = succeed(Vec::new());
    for parser in parsers {
        result = result.bind(move |values| {
            parser.clone().map(move |value| {
                let mut values = values.clone();
                values.push(value);
                values
            })
        });
    }
    result
}

/// One or more occurrences of `parser`.
pub fn many1<'a, T: Clone + 'a>(parser: Parser<'a, T>) -> Parser<'a, Vec<T>> {
    let rest = parser.clone();
    parser.bind(move |head| {
        many(rest.clone()).map(move |tail| {
            let mut items = vec![head.clone()];
            items.extend(tail);
            items
        })
    })
}

/// Zero or more occurrences of `parser`.
pub fn many<'a, T: Clone + 'a>(parser: Parser<'a, T>) -> Parser<'a, Vec<T>> {
    choice(vec![many1(parser), succeed(Vec::new())])
}

/// One or more occurrences of `parser`, separated by `separator`.
pub fn sep_by1<'a, S: 'a, T: Clone + 'a>(
    separator: Parser<'a, S>,
    parser: Parser<'a, T>,
) -> Parser<'a, Vec<T>> {
    let tail = many(separator.skip_then(parser.clone()));
    parser.bind(move |head| {
        tail.clone().map(move |rest| {
            let mut items = vec![head.clone()];
            items.extend(rest);
            items
        })
    })
}

/// Zero or more occurrences of `parser`, separated by `separator`.
pub fn sep_by<'a, S: 'a, T: Clone + 'a>(
    separator: Parser<'a, S>,
    parser: Parser<'a, T>,
) -> Parser<'a, Vec<T>> {
    choice(vec![sep_by1(separator, parser), succeed(Vec::new())])
}

/// Parse `term (op term)*`, folding left-associatively: `1 + 2 + 3` builds
/// `(1 + 2) + 3`, never the right-leaning tree, regardless of the operator.
pub fn chainl1<'a, T: Clone + 'a>(
    parser: Parser<'a, T>,
    op: Parser<'a, BinaryBuilder<T>>,
) -> Parser<'a, T> {
    fn rest<'a, T: Clone + 'a>(
        acc: T,
        parser: Parser<'a, T>,
        op: Parser<'a, BinaryBuilder<T>>,
    ) -> Parser<'a, T> {
        let continued = {
            let parser = parser.clone();
            let op = op.clone();
            let acc = acc.clone();
            op.clone().bind(move |build| {
                let parser = parser.clone();
                let op = op.clone();
                let acc = acc.clone();
                parser.clone().bind(move |right| {
                    rest(build(acc.clone(), right), parser.clone(), op.clone())
                })
            })
        };
        choice(vec![continued, succeed(acc)])
    }

    let op_outer = op;
    let term = parser.clone();
    parser.bind(move |first| rest(first, term.clone(), op_outer.clone()))
}

/// Allow input accepted by `parser` to be preceded by any number of prefix
/// operators.
pub fn prefix_op<'a, T: Clone + 'a>(
    parser: Parser<'a, T>,
    op: Parser<'a, UnaryBuilder<T>>,
) -> Parser<'a, T> {
    Parser::new(move |input| {
        let nested = prefix_op(parser.clone(), op.clone());
        let prefixed = op
            .clone()
            .bind(move |build| nested.clone().map(move |value| build(value)));
        choice(vec![prefixed, parser.clone()]).run(input)
    })
}

/// Allow input accepted by `parser` to be followed by any number of suffix
/// operators.
pub fn suffix_op<'a, T: Clone + 'a>(
    parser: Parser<'a, T>,
    op: Parser<'a, UnaryBuilder<T>>,
) -> Parser<'a, T> {
    fn rest<'a, T: Clone + 'a>(acc: T, op: Parser<'a, UnaryBuilder<T>>) -> Parser<'a, T> {
        let continued = {
            let op = op.clone();
            let acc = acc.clone();
            op.clone().bind(move |build| rest(build(acc.clone()), op.clone()))
        };
        choice(vec![continued, succeed(acc)])
    }

    let op_outer = op;
    parser.bind(move |first| rest(first, op_outer.clone()))
}

/// Negative lookahead: succeed with `parser`'s result only where `suffix`
/// fails on the remaining input.
pub fn not_followed_by<'a, S: 'a, T: Clone + 'a>(
    suffix: Parser<'a, S>,
    parser: Parser<'a, T>,
) -> Parser<'a, T> {
    Parser::new(move |input| {
        parser
            .run(input)
            .into_iter()
            .filter(|(_, rest)| suffix.run(*rest).is_empty())
            .collect()
    })
}

/// Discard a leading run of `to_skip`, then run `parser`.
pub fn skip_leading<'a, S: 'a, T: 'a>(
    to_skip: Parser<'a, S>,
    parser: Parser<'a, T>,
) -> Parser<'a, T> {
    to_skip.skip_then(parser)
}

/// Run `parser`, then discard a trailing run of `to_skip`.
pub fn skip_trailing<'a, S: 'a, T: Clone + 'a>(
    to_skip: Parser<'a, S>,
    parser: Parser<'a, T>,
) -> Parser<'a, T> {
    parser.then_skip(to_skip)
}

/// Keep only the result of `inside`, bracketed by `before` and `after`.
pub fn between<'a, B: 'a, A: 'a, T: Clone + 'a>(
    before: Parser<'a, B>,
    after: Parser<'a, A>,
    inside: Parser<'a, T>,
) -> Parser<'a, T> {
    before.skip_then(inside).then_skip(after)
}

/// Wrap a parser so every invocation traces the input position. The original
/// printed the whole remaining input; a trace event is quieter.
pub fn traced<'a, T: 'a>(label: &'static str, parser: Parser<'a, T>) -> Parser<'a, T> {
    Parser::new(move |input| {
        trace!(label, offset = input.offset(), "parser invoked");
        parser.run(input)
    })
}
