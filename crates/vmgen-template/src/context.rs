/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Evaluation scope.
//!
//! A [`Scope`] is the explicit variable environment a template is evaluated
//! against. It is a stack of frames: the root frame holds the render's locals
//! and top-level assignments, and every loop body pushes a frame for its block
//! parameters and block-local assignments.

use indexmap::IndexMap;

use crate::value::TemplateValue;

/// Variable bindings visible during one template evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    /// Binding frames; index 0 is the root and is never popped.
    frames: Vec<IndexMap<String, TemplateValue>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// Create a new empty scope with a single root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![IndexMap::new()],
        }
    }

    /// Look a variable up, innermost frame first.
    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Get a variable by path (e.g. `["insn", "name"]`).
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        let (first, rest) = path.split_first()?;
        self.get(first).and_then(|v| v.get_path(rest))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Assign a variable with local-variable semantics.
    ///
    /// An existing binding is overwritten in the frame that owns it; a new name
    /// is created in the innermost frame.
    pub fn assign(&mut self, name: impl Into<String>, value: TemplateValue) {
        let name = name.into();
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(&name) {
                *slot = value;
                return;
            }
        }
        self.innermost().insert(name, value);
    }

    /// Bind a variable in the innermost frame, shadowing outer bindings.
    pub fn define(&mut self, name: impl Into<String>, value: TemplateValue) {
        self.innermost().insert(name.into(), value);
    }

    /// Enter a block: bindings defined until the matching
    /// [`pop_frame`](Self::pop_frame) are dropped with it.
    pub fn push_frame(&mut self) {
        self.frames.push(IndexMap::new());
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames, root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Names bound in the root frame, in binding order.
    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.frames[0].keys().map(String::as_str)
    }

    fn innermost(&mut self) -> &mut IndexMap<String, TemplateValue> {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}
