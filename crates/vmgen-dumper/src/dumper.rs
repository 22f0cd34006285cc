/*
 * dumper.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The generator session.
//!
//! A [`Dumper`] renders templates for one output file. It owns the template
//! cache and an empty root scope every render starts from, and it is the
//! helper table templates call into, so a template can render partials,
//! quote C strings and write comments.

use tracing::debug;
use vmgen_template::{
    FileSystemLoader, FunctionError, FunctionResult, FunctionTable, Scope, TemplateLoader,
    TemplateValue,
};

use crate::binder::{Locals, bind_locals};
use crate::cache::TemplateCache;
use crate::config::DumperConfig;
use crate::error::{DumperError, DumperResult};
use crate::escape::{to_comment, to_quoted_c_string};
use crate::path::PathResolver;
use crate::pragma::PragmaRewriter;

/// Renders templates and partials into one generated file.
#[derive(Debug)]
pub struct Dumper {
    config: DumperConfig,
    cache: TemplateCache,
    /// Root scope cloned for every render.
    empty: Scope,
    pragma: PragmaRewriter,
    /// Renders currently in progress.
    depth: usize,
}

impl Dumper {
    /// Create a session that reads templates from the filesystem.
    pub fn new(config: DumperConfig) -> DumperResult<Self> {
        Self::with_loader(config, Box::new(FileSystemLoader))
    }

    /// Create a session that reads templates through `loader`.
    pub fn with_loader(config: DumperConfig, loader: Box<dyn TemplateLoader>) -> DumperResult<Self> {
        let resolver = PathResolver::from_config(&config)?;
        let pragma = PragmaRewriter::new(&config.output.to_string_lossy(), config.line_offset);
        debug!(
            output = %config.output.display(),
            views = %resolver.views_dir().display(),
            "starting generator session"
        );
        Ok(Self {
            cache: TemplateCache::new(resolver, loader),
            empty: Scope::new(),
            pragma,
            depth: 0,
            config,
        })
    }

    pub fn config(&self) -> &DumperConfig {
        &self.config
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Output path as it appears in line directives.
    pub fn output_literal(&self) -> &str {
        self.pragma.output_literal()
    }

    /// Render partial `_{partial}.erb` with `locals`.
    pub fn render(&mut self, partial: &str, locals: &Locals) -> DumperResult<String> {
        self.do_render(&format!("_{}.erb", partial), locals)
    }

    /// Render `{template}.erb` and rewrite its source pragmas.
    pub fn generate(&mut self, template: &str, locals: &Locals) -> DumperResult<String> {
        let text = self.do_render(&format!("{}.erb", template), locals)?;
        Ok(self.replace_pragma(&text))
    }

    /// [`generate`](Self::generate) without locals.
    pub fn generate_default(&mut self, template: &str) -> DumperResult<String> {
        self.generate(template, &Locals::new())
    }

    /// Render the template at `spec` in a fresh scope holding `locals`.
    pub fn do_render(&mut self, spec: &str, locals: &Locals) -> DumperResult<String> {
        if self.depth >= self.config.max_render_depth {
            return Err(DumperError::RecursiveRender {
                spec: spec.to_string(),
                max_depth: self.config.max_render_depth,
            });
        }

        let compiled = self.cache.get_or_parse(spec)?;
        let mut scope = bind_locals(&self.empty, locals)?;

        self.depth += 1;
        debug!(spec, depth = self.depth, locals = locals.len(), "rendering");
        let result = compiled.template.render_with_functions(&mut scope, self);
        self.depth -= 1;

        result.map_err(DumperError::from_template)
    }

    pub fn replace_pragma(&self, text: &str) -> String {
        self.pragma.replace_pragma(text)
    }

    /// `render(partial)` or `render(partial, locals: {...})` from a template.
    fn render_helper(&mut self, args: Vec<TemplateValue>) -> FunctionResult {
        let mut args = args.into_iter();
        let partial = match args.next() {
            Some(TemplateValue::String(partial)) => partial,
            Some(other) => {
                return Err(format!("render: partial name must be a string, not {}", other.type_name()).into());
            }
            None => return Err("render: missing partial name".into()),
        };

        let locals = match args.next() {
            None => Locals::new(),
            Some(TemplateValue::Map(mut options)) => match options.shift_remove("locals") {
                None | Some(TemplateValue::Nil) => Locals::new(),
                Some(TemplateValue::Map(locals)) => locals,
                Some(other) => {
                    return Err(format!("render: `locals` must be a map, not {}", other.type_name()).into());
                }
            },
            Some(other) => {
                return Err(format!("render: options must be a map, not {}", other.type_name()).into());
            }
        };
        if args.next().is_some() {
            return Err("render: too many arguments".into());
        }

        let text = self.render(&partial, &locals).map_err(FunctionError::from)?;
        Ok(TemplateValue::String(text))
    }

    fn render_c_expr(&mut self, expr: TemplateValue) -> FunctionResult {
        let mut locals = Locals::new();
        locals.insert("expr".to_string(), expr);
        let text = self.render("c_expr", &locals).map_err(FunctionError::from)?;
        Ok(TemplateValue::String(text))
    }
}

/// The single argument of helper `name`.
fn single_argument(name: &str, args: Vec<TemplateValue>) -> Result<TemplateValue, FunctionError> {
    let count = args.len();
    let mut args = args.into_iter();
    match (args.next(), count) {
        (Some(value), 1) => Ok(value),
        _ => Err(format!("wrong number of arguments for `{}` (given {}, expected 1)", name, count).into()),
    }
}

impl FunctionTable for Dumper {
    fn call(&mut self, name: &str, args: Vec<TemplateValue>) -> Option<FunctionResult> {
        let result = match name {
            "cstr" => single_argument(name, args)
                .map(|value| TemplateValue::String(to_quoted_c_string(&value.render()))),
            "comm" => {
                single_argument(name, args).map(|value| TemplateValue::String(to_comment(&value.render())))
            }
            "render" => self.render_helper(args),
            "render_c_expr" => single_argument(name, args).and_then(|expr| self.render_c_expr(expr)),
            _ => return None,
        };
        Some(result)
    }
}
