/*
 * expression.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Grammar for the code inside template tags.
//!
//! A code segment is lexed into tokens and then parsed into a list of
//! statement heads. Block structure (`if` ... `end`) spans several segments,
//! so heads are matched up later by the tree builder.

use chumsky::{
    input::{Input, ValueInput},
    pratt::*,
    prelude::*,
};

use crate::ast::{BinaryOp, Expr, LoopKind, UnaryOp};
use crate::lexer::{ParseError, Span, Spanned, SyntaxError, Token, lexer};
use crate::value::TemplateValue;

/// One statement of a code segment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Head {
    If(Expr),
    Unless(Expr),
    Elsif(Expr),
    Else,
    End,
    /// A block loop or a `for` loop; the body follows up to the matching `end`.
    Loop {
        kind: LoopKind,
        iterable: Expr,
        params: Vec<String>,
    },
    Assign {
        name: String,
        op: Option<BinaryOp>,
        value: Expr,
    },
    Expr(Expr),
}

/// A head and the offset of its first token in the template source.
pub(crate) type LocatedHead = (Head, usize);

type Extra<'src> = extra::Err<ParseError<'src, Token>>;

/// Parse the code of a `<% %>` tag or `%` line that starts at `offset`.
pub(crate) fn parse_statements(
    code: &str,
    offset: usize,
) -> Result<Vec<LocatedHead>, SyntaxError> {
    let tokens = lex(code, offset)?;
    let input = tokens.as_slice().map(end_of(code), |(token, span)| (token, span));
    let heads = statements()
        .parse(input)
        .into_result()
        .map_err(|errors| first_error(&errors, offset))?;
    Ok(heads
        .into_iter()
        .map(|(head, start)| (head, offset + start))
        .collect())
}

/// Parse the expression of a `<%= %>` tag that starts at `offset`.
pub(crate) fn parse_output(code: &str, offset: usize) -> Result<Expr, SyntaxError> {
    let tokens = lex(code, offset)?;
    let input = tokens.as_slice().map(end_of(code), |(token, span)| (token, span));
    let newlines = just(Token::Newline).repeated();
    newlines
        .clone()
        .ignore_then(expression())
        .then_ignore(newlines)
        .parse(input)
        .into_result()
        .map_err(|errors| first_error(&errors, offset))
}

fn lex(code: &str, offset: usize) -> Result<Vec<Spanned<Token>>, SyntaxError> {
    lexer()
        .parse(code)
        .into_result()
        .map_err(|errors| first_error(&errors, offset))
}

fn end_of(code: &str) -> Span {
    (code.len()..code.len()).into()
}

fn first_error<T: std::fmt::Display>(errors: &[ParseError<'_, T>], offset: usize) -> SyntaxError {
    match errors.first() {
        Some(error) => SyntaxError::from_rich(error, offset),
        None => SyntaxError::new("invalid code", offset),
    }
}

/// Heads separated by newlines or `;`.
fn statements<'src, I>() -> impl Parser<'src, I, Vec<(Head, usize)>, Extra<'src>>
where
    I: ValueInput<'src, Token = Token, Span = Span>,
{
    let expression = expression();
    let ident = select! { Token::Ident(name) => name };
    let names = ident
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>();

    let for_loop = just(Token::For)
        .ignore_then(names.clone())
        .then_ignore(just(Token::In))
        .then(expression.clone())
        .then_ignore(just(Token::Do).or_not())
        .map(|(params, iterable)| Head::Loop {
            kind: LoopKind::For,
            iterable,
            params,
        });

    let assign = ident
        .then(select! {
            Token::Assign => None,
            Token::PlusAssign => Some(BinaryOp::Add),
            Token::MinusAssign => Some(BinaryOp::Sub),
        })
        .then(expression.clone())
        .map(|((name, op), value)| Head::Assign { name, op, value });

    let block_params = names.delimited_by(just(Token::Pipe), just(Token::Pipe));
    let expression_or_block = expression
        .clone()
        .then(just(Token::Do).ignore_then(block_params.or_not()).or_not())
        .try_map(|(expr, block), span| match block {
            None => Ok(Head::Expr(expr)),
            Some(params) => loop_head(expr, params.unwrap_or_default()).ok_or_else(|| {
                Rich::custom(
                    span,
                    "`do` block must follow `each`, `each_with_index`, `each_pair` or `times`",
                )
            }),
        });

    let head = choice((
        just(Token::If)
            .ignore_then(expression.clone())
            .map(Head::If),
        just(Token::Unless)
            .ignore_then(expression.clone())
            .map(Head::Unless),
        just(Token::Elsif).ignore_then(expression).map(Head::Elsif),
        just(Token::Else).to(Head::Else),
        just(Token::End).to(Head::End),
        for_loop,
        assign,
        expression_or_block,
    ))
    .map_with(|head, extra| {
        let span: Span = extra.span();
        (head, span.start)
    });

    let separator = just(Token::Newline).or(just(Token::Semicolon));
    separator.clone().repeated().ignore_then(
        head.separated_by(separator.repeated().at_least(1))
            .allow_trailing()
            .collect(),
    )
}

fn loop_head(expr: Expr, params: Vec<String>) -> Option<Head> {
    match expr {
        Expr::Method {
            receiver,
            name,
            args,
        } if args.is_empty() => LoopKind::from_method(&name).map(|kind| Head::Loop {
            kind,
            iterable: *receiver,
            params,
        }),
        _ => None,
    }
}

#[derive(Debug, Clone)]
enum Argument {
    Positional(Expr),
    Keyword(String, Expr),
}

/// Keyword arguments are passed as one trailing hash.
fn fold_arguments(arguments: Vec<Argument>) -> Vec<Expr> {
    let mut positional = Vec::with_capacity(arguments.len());
    let mut keywords = Vec::new();
    for argument in arguments {
        match argument {
            Argument::Positional(expr) => positional.push(expr),
            Argument::Keyword(key, value) => keywords.push((Expr::string(key), value)),
        }
    }
    if !keywords.is_empty() {
        positional.push(Expr::Hash(keywords));
    }
    positional
}

#[derive(Debug, Clone)]
enum Postfix {
    Method(String, Vec<Expr>),
    Index(Expr),
}

fn expression<'src, I>() -> impl Parser<'src, I, Expr, Extra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token, Span = Span>,
{
    recursive(|expression| {
        let newlines = just(Token::Newline).repeated();
        let ident = select! { Token::Ident(name) => name };

        let literal = select! {
            Token::Integer(i) => TemplateValue::Integer(i),
            Token::Str(s) => TemplateValue::String(s),
            Token::Nil => TemplateValue::Nil,
            Token::True => TemplateValue::Bool(true),
            Token::False => TemplateValue::Bool(false),
        }
        .map(Expr::Literal);

        let argument = choice((
            select! { Token::Label(key) => key }
                .then(expression.clone())
                .map(|(key, value)| Argument::Keyword(key, value)),
            expression.clone().map(Argument::Positional),
        ));

        let paren_arguments = argument
            .clone()
            .padded_by(newlines.clone())
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .padded_by(newlines.clone())
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
            .map(fold_arguments);

        // `render 'x', locals: {}`; the first argument must not look like an
        // operator, index or block
        let command_start = select! {
            Token::Ident(_) => (),
            Token::Label(_) => (),
            Token::Integer(_) => (),
            Token::Str(_) => (),
            Token::Nil => (),
            Token::True => (),
            Token::False => (),
        }
        .rewind();
        let command_arguments = command_start.ignore_then(
            argument
                .separated_by(just(Token::Comma).then(newlines.clone()))
                .at_least(1)
                .collect::<Vec<_>>()
                .map(fold_arguments),
        );

        let call_or_variable = ident
            .clone()
            .then(choice((paren_arguments.clone(), command_arguments)).or_not())
            .map(|(name, args)| match args {
                Some(args) => Expr::Call { name, args },
                None => Expr::Variable(name),
            });

        let list = expression
            .clone()
            .padded_by(newlines.clone())
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expr::Array);

        let hash_key = choice((
            select! { Token::Label(key) => Expr::string(key) },
            expression.clone().then_ignore(just(Token::Arrow)),
        ));
        let hash = hash_key
            .then(expression.clone())
            .padded_by(newlines.clone())
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .padded_by(newlines.clone())
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(Expr::Hash);

        let nested = expression
            .clone()
            .padded_by(newlines.clone())
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        let primary = choice((literal, call_or_variable, list, hash, nested));

        let postfix = choice((
            just(Token::Dot)
                .ignore_then(ident)
                .then(paren_arguments.or_not())
                .map(|(name, args)| Postfix::Method(name, args.unwrap_or_default())),
            expression
                .padded_by(newlines)
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(Postfix::Index),
        ));
        let atom = primary.foldl(postfix.repeated(), |receiver, postfix| match postfix {
            Postfix::Method(name, args) => Expr::Method {
                receiver: Box::new(receiver),
                name,
                args,
            },
            Postfix::Index(index) => Expr::Index {
                receiver: Box::new(receiver),
                index: Box::new(index),
            },
        });

        atom.pratt((
            prefix(7, just(Token::Bang), |_, operand, _| Expr::not(operand)),
            prefix(7, just(Token::Minus), |_, operand, _| Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            }),
            infix(left(6), just(Token::Asterisk), |l, _, r, _| {
                Expr::binary(BinaryOp::Mul, l, r)
            }),
            infix(left(5), just(Token::Plus), |l, _, r, _| {
                Expr::binary(BinaryOp::Add, l, r)
            }),
            infix(left(5), just(Token::Minus), |l, _, r, _| {
                Expr::binary(BinaryOp::Sub, l, r)
            }),
            infix(
                left(4),
                select! {
                    Token::Less => BinaryOp::Lt,
                    Token::LessOrEqual => BinaryOp::Le,
                    Token::Greater => BinaryOp::Gt,
                    Token::GreaterOrEqual => BinaryOp::Ge,
                },
                |l, op, r, _| Expr::binary(op, l, r),
            ),
            infix(
                left(3),
                select! {
                    Token::Equal => BinaryOp::Eq,
                    Token::NotEqual => BinaryOp::Ne,
                },
                |l, op, r, _| Expr::binary(op, l, r),
            ),
            infix(left(2), just(Token::And), |l, _, r, _| {
                Expr::binary(BinaryOp::And, l, r)
            }),
            infix(left(1), just(Token::Or), |l, _, r, _| {
                Expr::binary(BinaryOp::Or, l, r)
            }),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn int(i: i64) -> Expr {
        Expr::Literal(TemplateValue::Integer(i))
    }

    fn heads(code: &str) -> Vec<Head> {
        parse_statements(code, 0)
            .unwrap()
            .into_iter()
            .map(|(head, _)| head)
            .collect()
    }

    fn expr(code: &str) -> Expr {
        parse_output(code, 0).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3 == 7 || !a"),
            Expr::binary(
                BinaryOp::Or,
                Expr::binary(
                    BinaryOp::Eq,
                    Expr::binary(
                        BinaryOp::Add,
                        int(1),
                        Expr::binary(BinaryOp::Mul, int(2), int(3))
                    ),
                    int(7)
                ),
                Expr::not(var("a"))
            )
        );
        assert_eq!(
            expr("a - b - c"),
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, var("a"), var("b")),
                var("c")
            )
        );
    }

    #[test]
    fn test_method_chain_and_index() {
        assert_eq!(
            expr("expr.fetch('file', '?')[0].size"),
            Expr::Method {
                receiver: Box::new(Expr::Index {
                    receiver: Box::new(Expr::Method {
                        receiver: Box::new(var("expr")),
                        name: "fetch".to_string(),
                        args: vec![Expr::string("file"), Expr::string("?")],
                    }),
                    index: Box::new(int(0)),
                }),
                name: "size".to_string(),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_command_call_with_keywords() {
        assert_eq!(
            expr("render 'item', locals: { n: n }"),
            Expr::Call {
                name: "render".to_string(),
                args: vec![
                    Expr::string("item"),
                    Expr::Hash(vec![(
                        Expr::string("locals"),
                        Expr::Hash(vec![(Expr::string("n"), var("n"))]),
                    )]),
                ],
            }
        );
        assert_eq!(
            expr("cstr expr.code"),
            Expr::Call {
                name: "cstr".to_string(),
                args: vec![Expr::Method {
                    receiver: Box::new(var("expr")),
                    name: "code".to_string(),
                    args: vec![],
                }],
            }
        );
    }

    #[test]
    fn test_variable_is_not_a_command() {
        assert_eq!(
            expr("name + '!'"),
            Expr::binary(BinaryOp::Add, var("name"), Expr::string("!"))
        );
        assert_eq!(
            expr("xs [1]"),
            Expr::Index {
                receiver: Box::new(var("xs")),
                index: Box::new(int(1)),
            }
        );
        assert_eq!(
            expr("render('fixed')"),
            Expr::Call {
                name: "render".to_string(),
                args: vec![Expr::string("fixed")],
            }
        );
    }

    #[test]
    fn test_hash_keys() {
        assert_eq!(
            expr("{ a: 1, 'b' => 2 }"),
            Expr::Hash(vec![
                (Expr::string("a"), int(1)),
                (Expr::string("b"), int(2)),
            ])
        );
        assert_eq!(expr("{}"), Expr::Hash(vec![]));
    }

    #[test]
    fn test_statement_heads() {
        assert_eq!(
            heads("x = 1; y += x\nputs y"),
            vec![
                Head::Assign {
                    name: "x".to_string(),
                    op: None,
                    value: int(1),
                },
                Head::Assign {
                    name: "y".to_string(),
                    op: Some(BinaryOp::Add),
                    value: var("x"),
                },
                Head::Expr(Expr::Call {
                    name: "puts".to_string(),
                    args: vec![var("y")],
                }),
            ]
        );
        assert_eq!(heads(" \n "), vec![]);
        assert_eq!(heads(" else "), vec![Head::Else]);
    }

    #[test]
    fn test_loop_heads() {
        assert_eq!(
            heads("pairs.each_pair do |k, v|"),
            vec![Head::Loop {
                kind: LoopKind::EachPair,
                iterable: var("pairs"),
                params: vec!["k".to_string(), "v".to_string()],
            }]
        );
        assert_eq!(
            heads("for x in xs"),
            vec![Head::Loop {
                kind: LoopKind::For,
                iterable: var("xs"),
                params: vec!["x".to_string()],
            }]
        );
    }

    #[test]
    fn test_head_offsets() {
        let located = parse_statements(" a\n  end", 10).unwrap();
        let offsets: Vec<usize> = located.iter().map(|(_, offset)| *offset).collect();
        assert_eq!(offsets, vec![11, 15]);
    }

    #[test]
    fn test_do_needs_iteration_method() {
        let err = parse_statements("xs.map do |x|", 0).unwrap_err();
        assert!(err.message.contains("`do` block must follow"), "{}", err.message);
    }

    #[test]
    fn test_errors_are_offset() {
        let err = parse_output(" 1 + ", 3).unwrap_err();
        assert_eq!(err.offset, 8);

        let err = parse_output(" 'open", 3).unwrap_err();
        assert!(err.offset >= 4, "{:?}", err);
    }
}
