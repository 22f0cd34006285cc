/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! This module defines the abstract syntax tree for parsed templates.
//! Template-level nodes carry a [`Span`] for error reporting; expressions are
//! reported at the span of the node that contains them.

use crate::value::TemplateValue;

/// Start position of a construct in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset into the source.
    pub offset: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column (in characters).
    pub column: usize,
}

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text to be output as-is.
    Literal(Literal),

    /// Interpolation: `<%= expr %>`
    Output(Output),

    /// A code statement whose value is discarded: `<% x = 1 %>`
    Statement(Statement),

    /// `if` / `unless` with optional `elsif` and `else` branches.
    Conditional(Conditional),

    /// `each`, `each_with_index`, `each_pair`, `times` or `for` loop.
    Loop(Loop),
}

/// Literal text node.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub text: String,
    pub span: Span,
}

/// Interpolation node.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `name = value`, or `name op= value` when `op` is set.
    Assign {
        name: String,
        op: Option<BinaryOp>,
        value: Expr,
    },
    /// Expression evaluated for its side effects.
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

/// Conditional block.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// List of (condition, body) pairs for if/elsif branches.
    /// `unless c` is stored as the branch `!c`.
    pub branches: Vec<(Expr, Vec<TemplateNode>)>,
    /// Optional else branch.
    pub else_branch: Option<Vec<TemplateNode>>,
    pub span: Span,
}

/// How a loop walks its iterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// `list.each do |item|`, `map.each do |key, value|`
    Each,
    /// `list.each_with_index do |item, index|`
    EachWithIndex,
    /// `map.each_pair do |key, value|`
    EachPair,
    /// `n.times do |i|`
    Times,
    /// `for item in list`
    For,
}

impl LoopKind {
    /// Iteration method name for block-style loops.
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "each" => Some(LoopKind::Each),
            "each_with_index" => Some(LoopKind::EachWithIndex),
            "each_pair" => Some(LoopKind::EachPair),
            "times" => Some(LoopKind::Times),
            _ => None,
        }
    }
}

/// Loop block.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub kind: LoopKind,
    /// The receiver being iterated (the `list` of `list.each`).
    pub iterable: Expr,
    /// Block parameters, in order.
    pub params: Vec<String>,
    pub body: Vec<TemplateNode>,
    pub span: Span,
}

/// An expression in the template's code language.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `nil`, `true`, `42`, `'text'`
    Literal(TemplateValue),
    /// A bare name: a variable, or a zero-argument function when unbound.
    Variable(String),
    /// `[a, b]`
    Array(Vec<Expr>),
    /// `{ key: v, "k" => v }`
    Hash(Vec<(Expr, Expr)>),
    /// `name(args)` or `name arg, key: value`
    Call { name: String, args: Vec<Expr> },
    /// `receiver.name(args)`
    Method {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    /// `receiver[index]`
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(TemplateValue::String(s.into()))
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}
