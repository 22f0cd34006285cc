/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! ERB-style template engine for build-time code generation.
//!
//! Templates are UTF-8 text with embedded code in the ERB `%-` trim mode:
//!
//! - Interpolation: `<%= expr %>`
//! - Statements: `<% x = 1 %>`, or a whole line starting with `%`
//! - Conditionals: `if` / `unless` / `elsif` / `else` / `end`
//! - Loops: `list.each do |x|`, `each_with_index`, `each_pair`, `n.times`, `for x in list`
//! - Comments: `<%# ... %>`
//! - Trimming: `<%-` drops leading indentation, `-%>` drops the following newline
//!
//! # Architecture
//!
//! A [`Template`] is evaluated against an explicit [`Scope`] (the variable
//! environment) and a [`FunctionTable`] that supplies helper functions such as
//! `render` or `cstr`. The engine knows nothing about where templates live;
//! loading is abstracted by [`TemplateLoader`].
//!
//! # Example
//!
//! ```
//! use vmgen_template::{Scope, Template, TemplateValue};
//!
//! let template = Template::compile("VALUE <%= name %>;").unwrap();
//!
//! let mut scope = Scope::new();
//! scope.assign("name", TemplateValue::from("foo"));
//!
//! assert_eq!(template.render(&mut scope).unwrap(), "VALUE foo;");
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
mod expression;
pub mod functions;
mod lexer;
mod methods;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod value;

// Re-export main types at crate root
pub use ast::{Expr, LoopKind, Span, TemplateNode};
pub use context::Scope;
pub use error::{Location, TemplateError, TemplateResult};
pub use functions::{FunctionError, FunctionMap, FunctionResult, FunctionTable, NoFunctions};
pub use lexer::is_local_name;
pub use parser::Template;
pub use resolver::{FileSystemLoader, MemoryLoader, TemplateLoader};
pub use scanner::TrimMode;
pub use value::TemplateValue;
