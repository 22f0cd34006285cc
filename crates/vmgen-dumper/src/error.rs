/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for generator sessions.

use std::path::PathBuf;

use thiserror::Error;
use vmgen_template::TemplateError;

#[derive(Debug, Error)]
pub enum DumperError {
    /// The resolved template path could not be read.
    #[error("don't know how to generate {}", path.display())]
    TemplateNotFound {
        /// Resolved path, in the form shown to users.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The template was read but is not valid template syntax.
    #[error("{source}")]
    ParseError {
        path: PathBuf,
        /// Template text, for rendering source snippets.
        text: String,
        source: TemplateError,
    },

    /// A local did not read back as the value bound to it.
    #[error("local `{name}` could not be bound in the template scope")]
    BindingMismatch { name: String },

    /// Renders nested deeper than the configured maximum.
    #[error("rendering {spec} exceeds the maximum render depth of {max_depth}")]
    RecursiveRender { spec: String, max_depth: usize },

    /// Evaluating a template failed.
    #[error(transparent)]
    Template(TemplateError),

    /// The working directory could not be determined.
    #[error("cannot determine the working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),
}

impl DumperError {
    /// Convert an evaluation error, recovering errors of this type raised by
    /// nested renders inside helper calls.
    pub(crate) fn from_template(error: TemplateError) -> Self {
        match error {
            TemplateError::FunctionFailed {
                name,
                location,
                source,
            } => match source.downcast::<DumperError>() {
                Ok(nested) => *nested,
                Err(source) => DumperError::Template(TemplateError::FunctionFailed {
                    name,
                    location,
                    source,
                }),
            },
            other => DumperError::Template(other),
        }
    }
}

pub type DumperResult<T> = Result<T, DumperError>;
