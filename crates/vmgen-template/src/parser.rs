/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template compiler.
//!
//! Compilation runs in three passes: the scanner splits the source into text
//! and code segments, the expression parser turns each code segment into
//! statement heads, and the tree builder below nests those heads into
//! [`TemplateNode`]s by matching block openers against `end`.

use std::path::Path;

use crate::ast::{
    Conditional, Expr, Literal, Loop, LoopKind, Output, Span, Statement, StatementKind,
    TemplateNode,
};
use crate::error::{Location, TemplateError, TemplateResult};
use crate::expression::{Head, parse_output, parse_statements};
use crate::lexer::SyntaxError;
use crate::scanner::{Segment, TrimMode, scan};

/// A compiled template ready for evaluation.
#[derive(Debug, Clone)]
pub struct Template {
    /// The parsed template AST.
    pub(crate) nodes: Vec<TemplateNode>,

    /// Name used in error locations.
    pub(crate) filename: String,

    /// Original source (for error reporting).
    pub(crate) source: String,
}

impl Template {
    /// Compile a template from source text.
    ///
    /// # Returns
    /// A compiled template, or an error if parsing fails.
    pub fn compile(source: &str) -> TemplateResult<Self> {
        Self::compile_with_filename(source, "(erb)")
    }

    /// Compile a template from source text with a filename for error reporting.
    pub fn compile_with_filename(source: &str, filename: &str) -> TemplateResult<Self> {
        Self::compile_with_options(source, filename, TrimMode::default())
    }

    /// Compile with an explicit trim mode.
    pub fn compile_with_options(
        source: &str,
        filename: &str,
        trim: TrimMode,
    ) -> TemplateResult<Self> {
        let index = LineIndex::new(source);
        let to_error = |e: SyntaxError| index.parse_error(filename, e);

        let segments = scan(source, trim).map_err(to_error)?;
        let mut builder = TreeBuilder::new(&index);

        for segment in segments {
            match segment {
                Segment::Text { text, offset } => builder.push_literal(text, offset),
                Segment::Output { code, offset } => {
                    let expr = parse_output(&code, offset).map_err(to_error)?;
                    builder.push_node(TemplateNode::Output(Output {
                        expr,
                        span: index.span(offset),
                    }));
                }
                Segment::Code { code, offset } => {
                    for (head, start) in parse_statements(&code, offset).map_err(to_error)? {
                        builder.apply(head, start).map_err(to_error)?;
                    }
                }
            }
        }

        let nodes = builder.finish().map_err(to_error)?;
        Ok(Template {
            nodes,
            filename: filename.to_string(),
            source: source.to_string(),
        })
    }

    /// Compile a template from a file. The path becomes the filename.
    pub fn compile_from_file(path: &Path) -> TemplateResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::compile_with_filename(&source, &path.to_string_lossy())
    }

    /// Get the AST nodes of this template.
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Location of a span inside this template.
    pub(crate) fn location(&self, span: Span) -> Location {
        Location::new(self.filename.clone(), span.line, span.column)
    }
}

/// Maps byte offsets to 1-based line and column numbers.
pub(crate) struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    pub fn span(&self, offset: usize) -> Span {
        let offset = offset.min(self.source.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self
            .source
            .get(line_start..offset)
            .map_or(1, |prefix| prefix.chars().count() + 1);
        Span {
            offset,
            line,
            column,
        }
    }

    fn parse_error(&self, filename: &str, error: SyntaxError) -> TemplateError {
        let span = self.span(error.offset);
        TemplateError::ParseError {
            message: error.message,
            location: Location::new(filename, span.line, span.column),
            offset: span.offset,
        }
    }
}

/// A block opened by `if`/`unless` or a loop and not yet closed by `end`.
struct OpenBlock {
    kind: BlockKind,
    body: Vec<TemplateNode>,
    span: Span,
}

enum BlockKind {
    Conditional {
        branches: Vec<(Expr, Vec<TemplateNode>)>,
        /// Condition guarding `body`; `None` once `else` has been seen.
        current: Option<Expr>,
        keyword: &'static str,
    },
    Loop {
        kind: LoopKind,
        iterable: Expr,
        params: Vec<String>,
    },
}

impl BlockKind {
    fn keyword(&self) -> &'static str {
        match self {
            BlockKind::Conditional { keyword, .. } => keyword,
            BlockKind::Loop { kind: LoopKind::For, .. } => "for",
            BlockKind::Loop { .. } => "do",
        }
    }
}

struct TreeBuilder<'i, 'a> {
    index: &'i LineIndex<'a>,
    root: Vec<TemplateNode>,
    stack: Vec<OpenBlock>,
}

impl<'i, 'a> TreeBuilder<'i, 'a> {
    fn new(index: &'i LineIndex<'a>) -> Self {
        Self {
            index,
            root: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn body(&mut self) -> &mut Vec<TemplateNode> {
        match self.stack.last_mut() {
            Some(block) => &mut block.body,
            None => &mut self.root,
        }
    }

    fn push_node(&mut self, node: TemplateNode) {
        self.body().push(node);
    }

    fn push_literal(&mut self, text: String, offset: usize) {
        let span = self.index.span(offset);
        let body = self.body();
        if let Some(TemplateNode::Literal(last)) = body.last_mut() {
            last.text.push_str(&text);
        } else {
            body.push(TemplateNode::Literal(Literal { text, span }));
        }
    }

    fn open(&mut self, kind: BlockKind, offset: usize) {
        self.stack.push(OpenBlock {
            kind,
            body: Vec::new(),
            span: self.index.span(offset),
        });
    }

    fn apply(&mut self, head: Head, offset: usize) -> Result<(), SyntaxError> {
        match head {
            Head::If(cond) => self.open(
                BlockKind::Conditional {
                    branches: Vec::new(),
                    current: Some(cond),
                    keyword: "if",
                },
                offset,
            ),
            Head::Unless(cond) => self.open(
                BlockKind::Conditional {
                    branches: Vec::new(),
                    current: Some(Expr::not(cond)),
                    keyword: "unless",
                },
                offset,
            ),
            Head::Elsif(cond) => self.next_branch(Some(cond), "elsif", offset)?,
            Head::Else => self.next_branch(None, "else", offset)?,
            Head::End => self.close(offset)?,
            Head::Loop {
                kind,
                iterable,
                params,
            } => self.open(
                BlockKind::Loop {
                    kind,
                    iterable,
                    params,
                },
                offset,
            ),
            Head::Assign { name, op, value } => self.push_statement(
                StatementKind::Assign { name, op, value },
                offset,
            ),
            Head::Expr(expr) => self.push_statement(StatementKind::Expr(expr), offset),
        }
        Ok(())
    }

    fn push_statement(&mut self, kind: StatementKind, offset: usize) {
        let span = self.index.span(offset);
        self.push_node(TemplateNode::Statement(Statement { kind, span }));
    }

    /// `elsif cond` (when `next` is set) or `else`.
    fn next_branch(
        &mut self,
        next: Option<Expr>,
        keyword: &str,
        offset: usize,
    ) -> Result<(), SyntaxError> {
        let Some(OpenBlock {
            kind: BlockKind::Conditional {
                branches, current, ..
            },
            body,
            ..
        }) = self.stack.last_mut()
        else {
            return Err(SyntaxError::new(
                format!("`{}` without matching `if`", keyword),
                offset,
            ));
        };
        let Some(cond) = current.take() else {
            return Err(SyntaxError::new(
                format!("`{}` after `else`", keyword),
                offset,
            ));
        };
        branches.push((cond, std::mem::take(body)));
        *current = next;
        Ok(())
    }

    fn close(&mut self, offset: usize) -> Result<(), SyntaxError> {
        let Some(block) = self.stack.pop() else {
            return Err(SyntaxError::new("unexpected `end`", offset));
        };

        let node = match block.kind {
            BlockKind::Conditional {
                mut branches,
                current,
                ..
            } => {
                let else_branch = match current {
                    Some(cond) => {
                        branches.push((cond, block.body));
                        None
                    }
                    None => Some(block.body),
                };
                TemplateNode::Conditional(Conditional {
                    branches,
                    else_branch,
                    span: block.span,
                })
            }
            BlockKind::Loop {
                kind,
                iterable,
                params,
            } => TemplateNode::Loop(Loop {
                kind,
                iterable,
                params,
                body: block.body,
                span: block.span,
            }),
        };

        self.push_node(node);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<TemplateNode>, SyntaxError> {
        if let Some(block) = self.stack.pop() {
            return Err(SyntaxError::new(
                format!("unclosed `{}` block: missing `end`", block.kind.keyword()),
                block.span.offset,
            ));
        }
        Ok(self.root)
    }
}
