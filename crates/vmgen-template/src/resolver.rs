/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template source loading.
//!
//! This module provides the [`TemplateLoader`] trait and implementations for
//! reading template source text from various places (filesystem, memory).

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Trait for loading template source text.
///
/// Implementations receive an already resolved path and return the full
/// UTF-8 text of the template stored there.
pub trait TemplateLoader {
    /// Read the template at `path`.
    ///
    /// # Returns
    /// The template source, or an I/O error (`NotFound` when nothing is there).
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Loader that reads templates from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemLoader;

impl TemplateLoader for FileSystemLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Loader that serves templates from an in-memory map.
///
/// Useful for testing and for scenarios where templates are bundled
/// into the application.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    /// Create a new empty memory loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template under `path`.
    pub fn add(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> &mut Self {
        self.templates.insert(path.into(), source.into());
        self
    }

    /// Create a loader with the given templates.
    pub fn with_templates(
        templates: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<String>)>,
    ) -> Self {
        let mut loader = Self::new();
        for (path, source) in templates {
            loader.add(path, source);
        }
        loader
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.templates.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no template at {}", path.display()),
            )
        })
    }
}

impl<L: TemplateLoader + ?Sized> TemplateLoader for &L {
    fn load(&self, path: &Path) -> io::Result<String> {
        (**self).load(path)
    }
}

impl<L: TemplateLoader + ?Sized> TemplateLoader for Box<L> {
    fn load(&self, path: &Path) -> io::Result<String> {
        (**self).load(path)
    }
}
