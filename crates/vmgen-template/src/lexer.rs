/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tokenizer for the code inside template tags.

use std::fmt;

use chumsky::prelude::*;

pub(crate) type Span = SimpleSpan;
pub(crate) type Spanned<T> = (T, Span);
pub(crate) type ParseError<'code, T> = Rich<'code, T, Span>;

/// A syntax error at a byte offset of the template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }

    /// Convert a chumsky error from code that starts at `base` in the
    /// template source.
    pub fn from_rich<T: fmt::Display>(error: &ParseError<'_, T>, base: usize) -> Self {
        Self::new(error.reason().to_string(), base + error.span().start)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// A name; method names may end in `?`.
    Ident(String),
    /// `name:` in hash literals and keyword arguments.
    Label(String),
    Integer(i64),
    Str(String),
    If,
    Unless,
    Elsif,
    Else,
    End,
    Do,
    For,
    In,
    Nil,
    True,
    False,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    BraceOpen,
    BraceClose,
    Comma,
    Dot,
    Pipe,
    Arrow,
    Assign,
    PlusAssign,
    MinusAssign,
    Plus,
    Minus,
    Asterisk,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
    Bang,
    Newline,
    Semicolon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Token::Ident(name) => return write!(f, "`{}`", name),
            Token::Label(name) => return write!(f, "`{}:`", name),
            Token::Integer(i) => return write!(f, "`{}`", i),
            Token::Str(_) => "string",
            Token::If => "`if`",
            Token::Unless => "`unless`",
            Token::Elsif => "`elsif`",
            Token::Else => "`else`",
            Token::End => "`end`",
            Token::Do => "`do`",
            Token::For => "`for`",
            Token::In => "`in`",
            Token::Nil => "`nil`",
            Token::True => "`true`",
            Token::False => "`false`",
            Token::ParenOpen => "`(`",
            Token::ParenClose => "`)`",
            Token::BracketOpen => "`[`",
            Token::BracketClose => "`]`",
            Token::BraceOpen => "`{`",
            Token::BraceClose => "`}`",
            Token::Comma => "`,`",
            Token::Dot => "`.`",
            Token::Pipe => "`|`",
            Token::Arrow => "`=>`",
            Token::Assign => "`=`",
            Token::PlusAssign => "`+=`",
            Token::MinusAssign => "`-=`",
            Token::Plus => "`+`",
            Token::Minus => "`-`",
            Token::Asterisk => "`*`",
            Token::Equal => "`==`",
            Token::NotEqual => "`!=`",
            Token::Less => "`<`",
            Token::LessOrEqual => "`<=`",
            Token::Greater => "`>`",
            Token::GreaterOrEqual => "`>=`",
            Token::And => "`&&`",
            Token::Or => "`||`",
            Token::Bang => "`!`",
            Token::Newline => "newline",
            Token::Semicolon => "`;`",
        };
        f.write_str(text)
    }
}

fn keyword(word: &str) -> Option<Token> {
    let token = match word {
        "if" => Token::If,
        "unless" => Token::Unless,
        "elsif" => Token::Elsif,
        "else" => Token::Else,
        "end" => Token::End,
        "do" => Token::Do,
        "for" => Token::For,
        "in" => Token::In,
        "nil" => Token::Nil,
        "true" => Token::True,
        "false" => Token::False,
        _ => return None,
    };
    Some(token)
}

pub(crate) fn lexer<'code>()
-> impl Parser<'code, &'code str, Vec<Spanned<Token>>, extra::Err<ParseError<'code, char>>> {
    let operator = choice((
        just("==").to(Token::Equal),
        just("!=").to(Token::NotEqual),
        just("<=").to(Token::LessOrEqual),
        just(">=").to(Token::GreaterOrEqual),
        just("=>").to(Token::Arrow),
        just("+=").to(Token::PlusAssign),
        just("-=").to(Token::MinusAssign),
        just("&&").to(Token::And),
        just("||").to(Token::Or),
        just('=').to(Token::Assign),
        just('<').to(Token::Less),
        just('>').to(Token::Greater),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Asterisk),
        just('!').to(Token::Bang),
        just('|').to(Token::Pipe),
    ));

    let punctuation = choice((
        just('(').to(Token::ParenOpen),
        just(')').to(Token::ParenClose),
        just('[').to(Token::BracketOpen),
        just(']').to(Token::BracketClose),
        just('{').to(Token::BraceOpen),
        just('}').to(Token::BraceClose),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
        just(';').to(Token::Semicolon),
        just('\n').to(Token::Newline),
    ));

    let integer = text::int(10)
        .to_slice()
        .try_map(|digits: &str, span| {
            digits
                .parse()
                .map(Token::Integer)
                .map_err(|_| Rich::custom(span, "integer literal out of range"))
        });

    let single_quoted = just('\'')
        .ignore_then(
            choice((just("\\\\").to('\\'), just("\\'").to('\''), none_of('\'')))
                .repeated()
                .collect::<String>(),
        )
        .then_ignore(just('\''))
        .map(Token::Str);

    let escape = just('\\').ignore_then(choice((
        just('n').to('\n'),
        just('t').to('\t'),
        just('r').to('\r'),
        just('0').to('\0'),
        just('e').to('\x1b'),
        just('"').to('"'),
        just('\\').to('\\'),
        just('#').to('#'),
    )));
    // `#{` is kept as a marker so it can be rejected below
    let double_quoted = just('"')
        .ignore_then(
            choice((escape.map(Some), just("#{").to(None), none_of("\\\"").map(Some)))
                .repeated()
                .collect::<Vec<Option<char>>>(),
        )
        .then_ignore(just('"'))
        .try_map(|chars, span| {
            chars
                .into_iter()
                .collect::<Option<String>>()
                .map(Token::Str)
                .ok_or_else(|| Rich::custom(span, "string interpolation is not supported"))
        });

    let name = any()
        .filter(|c: &char| c.is_alphabetic() || *c == '_')
        .then(any().filter(|c: &char| c.is_alphanumeric() || *c == '_').repeated())
        .then(just('?').or_not())
        .to_slice();
    let word = name
        .then(just(':').and_is(just("::").not()).or_not())
        .map(|(name, colon): (&str, Option<char>)| match colon {
            Some(_) => Token::Label(name.to_string()),
            None => keyword(name).unwrap_or_else(|| Token::Ident(name.to_string())),
        });

    let comment = just('#').then(none_of('\n').repeated()).ignored();
    let skip = text::inline_whitespace().then(comment.or_not()).ignored();

    let token = choice((
        integer,
        single_quoted,
        double_quoted,
        word,
        operator,
        punctuation,
    ));

    skip.ignore_then(
        token
            .map_with(|token, extra| (token, extra.span()))
            .then_ignore(skip.clone())
            .repeated()
            .collect(),
    )
}

/// Whether `name` can be bound as a local variable and referred to by
/// template code: it must lex as a single plain identifier.
pub fn is_local_name(name: &str) -> bool {
    match lexer().parse(name).into_output().as_deref() {
        Some([(Token::Ident(ident), _)]) => ident == name && !name.ends_with('?'),
        _ => false,
    }
}
