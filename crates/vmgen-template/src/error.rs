/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template parsing and evaluation.

use std::fmt;

use thiserror::Error;

/// A position inside a template file, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Template filename as given to the compiler.
    pub file: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column (in characters).
    pub column: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Error parsing the template syntax.
    #[error("{location}: {message}")]
    ParseError {
        message: String,
        location: Location,
        /// Byte offset into the template source.
        offset: usize,
    },

    /// A bare name that is neither a bound variable nor a known function.
    #[error("{location}: undefined local variable or function `{name}`")]
    UndefinedVariable { name: String, location: Location },

    /// A call to a function the helper table does not provide.
    #[error("{location}: undefined function `{name}`")]
    UnknownFunction { name: String, location: Location },

    /// A method that the receiver's type does not support.
    #[error("{location}: undefined method `{method}` for {receiver}")]
    UnknownMethod {
        method: String,
        receiver: &'static str,
        location: Location,
    },

    /// Operands or arguments of the wrong type or arity.
    #[error("{location}: {message}")]
    EvaluationError { message: String, location: Location },

    /// A helper function reported a failure.
    #[error("{location}: `{name}` failed: {source}")]
    FunctionFailed {
        name: String,
        location: Location,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O error (e.g., reading a template file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// Location of the failure inside the template, when known.
    pub fn location(&self) -> Option<&Location> {
        match self {
            TemplateError::ParseError { location, .. }
            | TemplateError::UndefinedVariable { location, .. }
            | TemplateError::UnknownFunction { location, .. }
            | TemplateError::UnknownMethod { location, .. }
            | TemplateError::EvaluationError { location, .. }
            | TemplateError::FunctionFailed { location, .. } => Some(location),
            TemplateError::Io(_) => None,
        }
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
