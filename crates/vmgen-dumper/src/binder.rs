/*
 * binder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Binding caller-supplied locals into a fresh evaluation scope.

use indexmap::IndexMap;
use vmgen_template::{Scope, TemplateValue, is_local_name};

use crate::error::{DumperError, DumperResult};

/// Named values handed to a render, in binding order.
pub type Locals = IndexMap<String, TemplateValue>;

/// Clone `base` and bind each local into it as an ordinary local variable.
///
/// Each binding is read back; a name that is not a valid local variable name
/// or that reads back differently fails with
/// [`BindingMismatch`](DumperError::BindingMismatch).
pub fn bind_locals(base: &Scope, locals: &Locals) -> DumperResult<Scope> {
    let mut scope = base.clone();
    for (name, value) in locals {
        if !is_local_name(name) {
            return Err(DumperError::BindingMismatch { name: name.clone() });
        }
        scope.assign(name.as_str(), value.clone());
        if scope.get(name) != Some(value) {
            return Err(DumperError::BindingMismatch { name: name.clone() });
        }
    }
    Ok(scope)
}
