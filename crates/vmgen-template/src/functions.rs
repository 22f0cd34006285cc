/*
 * functions.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Helper functions callable from templates.
//!
//! A template call such as `cstr(path)` or `render 'c_expr', locals: {...}`
//! is dispatched to the [`FunctionTable`] passed to
//! [`Template::render_with_functions`](crate::Template::render_with_functions).
//! Trailing `key: value` arguments arrive as a final map argument.

use std::collections::HashMap;
use std::fmt;

use crate::value::TemplateValue;

/// Error type helpers may fail with. It is carried through
/// [`TemplateError::FunctionFailed`](crate::TemplateError::FunctionFailed)
/// unchanged, so callers can downcast it back to their own error type.
pub type FunctionError = Box<dyn std::error::Error + Send + Sync>;

pub type FunctionResult = Result<TemplateValue, FunctionError>;

/// Table of named helper functions.
pub trait FunctionTable {
    /// Call `name` with positional arguments; `None` means the table has no
    /// function of that name.
    fn call(&mut self, name: &str, args: Vec<TemplateValue>) -> Option<FunctionResult>;
}

/// The empty table.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFunctions;

impl FunctionTable for NoFunctions {
    fn call(&mut self, _name: &str, _args: Vec<TemplateValue>) -> Option<FunctionResult> {
        None
    }
}

type Helper = Box<dyn FnMut(Vec<TemplateValue>) -> FunctionResult>;

/// A table of closures, for embedding and tests.
#[derive(Default)]
pub struct FunctionMap {
    functions: HashMap<String, Helper>,
}

impl FunctionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        f: impl FnMut(Vec<TemplateValue>) -> FunctionResult + 'static,
    ) {
        self.functions.insert(name.into(), Box::new(f));
    }

    pub fn with(
        mut self,
        name: impl Into<String>,
        f: impl FnMut(Vec<TemplateValue>) -> FunctionResult + 'static,
    ) -> Self {
        self.insert(name, f);
        self
    }
}

impl fmt::Debug for FunctionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionMap")
            .field("functions", &names)
            .finish()
    }
}

impl FunctionTable for FunctionMap {
    fn call(&mut self, name: &str, args: Vec<TemplateValue>) -> Option<FunctionResult> {
        self.functions.get_mut(name).map(|f| f(args))
    }
}
