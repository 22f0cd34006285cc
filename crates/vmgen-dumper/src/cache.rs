/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Per-session cache of compiled templates, keyed by spec.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};
use vmgen_template::{Template, TemplateLoader, TrimMode};

use crate::error::{DumperError, DumperResult};
use crate::path::{PathResolver, ResolvedPath};

/// A parsed template and where it was read from.
#[derive(Debug)]
pub struct CompiledTemplate {
    pub template: Template,
    pub path: ResolvedPath,
}

/// Maps specs to compiled templates. Entries are added on first use and never
/// evicted; failures store nothing.
pub struct TemplateCache {
    resolver: PathResolver,
    loader: Box<dyn TemplateLoader>,
    entries: HashMap<String, Rc<CompiledTemplate>>,
    parse_count: usize,
}

impl TemplateCache {
    pub fn new(resolver: PathResolver, loader: Box<dyn TemplateLoader>) -> Self {
        Self {
            resolver,
            loader,
            entries: HashMap::new(),
            parse_count: 0,
        }
    }

    /// Return the compiled template for `spec`, reading and parsing it on the
    /// first request.
    pub fn get_or_parse(&mut self, spec: &str) -> DumperResult<Rc<CompiledTemplate>> {
        if let Some(entry) = self.entries.get(spec) {
            trace!(spec, "template cache hit");
            return Ok(Rc::clone(entry));
        }

        let path = self.resolver.resolve(spec);
        debug!(spec, path = %path, "loading template");

        let text = self
            .loader
            .load(path.absolute())
            .map_err(|source| DumperError::TemplateNotFound {
                path: path.display_path().to_path_buf(),
                source,
            })?;

        let filename = path.to_string();
        self.parse_count += 1;
        let template = Template::compile_with_options(&text, &filename, TrimMode::PercentDash)
            .map_err(|source| DumperError::ParseError {
                path: path.display_path().to_path_buf(),
                text: text.clone(),
                source,
            })?;

        let entry = Rc::new(CompiledTemplate { template, path });
        self.entries.insert(spec.to_string(), Rc::clone(&entry));
        Ok(entry)
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, spec: &str) -> bool {
        self.entries.contains_key(spec)
    }

    /// Number of parse attempts so far, failed ones included.
    pub fn parse_count(&self) -> usize {
        self.parse_count
    }
}

impl fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut specs: Vec<&String> = self.entries.keys().collect();
        specs.sort();
        f.debug_struct("TemplateCache")
            .field("resolver", &self.resolver)
            .field("specs", &specs)
            .field("parse_count", &self.parse_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use vmgen_template::MemoryLoader;

    fn cache(templates: &[(&str, &str)]) -> TemplateCache {
        let resolver = PathResolver::new(
            Path::new("/r/tool/helpers"),
            Path::new("../views"),
            Path::new("/r"),
            "/r",
        );
        let loader = MemoryLoader::with_templates(templates.iter().copied());
        TemplateCache::new(resolver, Box::new(loader))
    }

    #[test]
    fn test_parses_once() {
        let mut cache = cache(&[("/r/tool/views/_a.erb", "a")]);
        let first = cache.get_or_parse("_a.erb").unwrap();
        let second = cache.get_or_parse("_a.erb").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.parse_count(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("_a.erb"));
        assert_eq!(first.template.filename(), "tool/views/_a.erb");
    }

    #[test]
    fn test_missing_template_is_not_cached() {
        let mut cache = cache(&[]);
        let err = cache.get_or_parse("_gone.erb").unwrap_err();
        match err {
            DumperError::TemplateNotFound { path, .. } => {
                assert_eq!(path, Path::new("tool/views/_gone.erb"));
            }
            other => panic!("expected a missing template, got {:?}", other),
        }
        assert!(cache.is_empty());
        assert_eq!(cache.parse_count(), 0);
    }

    #[test]
    fn test_parse_error_keeps_text() {
        let mut cache = cache(&[("/r/tool/views/bad.erb", "<% if x %>\nno end\n")]);
        match cache.get_or_parse("bad.erb").unwrap_err() {
            DumperError::ParseError { path, text, source } => {
                assert_eq!(path, Path::new("tool/views/bad.erb"));
                assert_eq!(text, "<% if x %>\nno end\n");
                assert!(source.to_string().starts_with("tool/views/bad.erb:1:"));
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
        assert!(!cache.contains("bad.erb"));
        assert_eq!(cache.parse_count(), 1);
    }

    #[test]
    fn test_debug_lists_specs() {
        let mut cache = cache(&[("/r/tool/views/b.erb", ""), ("/r/tool/views/a.erb", "")]);
        cache.get_or_parse("b.erb").unwrap();
        cache.get_or_parse("a.erb").unwrap();
        let debug = format!("{:?}", cache);
        assert!(debug.contains(r#"specs: ["a.erb", "b.erb"]"#), "{}", debug);
    }
}
