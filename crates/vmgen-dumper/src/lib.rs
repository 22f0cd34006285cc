/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Generator sessions for build-time C code generation.
//!
//! A [`Dumper`] turns ERB-style templates from a views directory into the
//! text of one generated file:
//!
//! - template specs are resolved against the views directory ([`PathResolver`])
//! - each template is read and parsed once per session ([`TemplateCache`])
//! - every render gets a fresh scope holding only its locals ([`bind_locals`])
//! - `#pragma RubyVM reset source` lines in the generated text become `#line`
//!   directives naming the output file ([`PragmaRewriter`])
//!
//! Templates can call back into the session through the `render`,
//! `render_c_expr`, `cstr` and `comm` helpers.
//!
//! # Example
//!
//! ```no_run
//! use vmgen_dumper::{Dumper, DumperConfig, Locals};
//!
//! let config = DumperConfig::new("vm.inc", "/src/ruby");
//! let mut dumper = Dumper::new(config)?;
//! let text = dumper.generate("vm.inc", &Locals::new())?;
//! std::fs::write("vm.inc", text)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binder;
pub mod cache;
pub mod config;
pub mod dumper;
pub mod error;
pub mod escape;
pub mod path;
pub mod pragma;

pub use binder::{Locals, bind_locals};
pub use cache::{CompiledTemplate, TemplateCache};
pub use config::DumperConfig;
pub use dumper::Dumper;
pub use error::{DumperError, DumperResult};
pub use escape::{to_comment, to_quoted_c_string};
pub use path::{PathResolver, ResolvedPath};
pub use pragma::PragmaRewriter;
