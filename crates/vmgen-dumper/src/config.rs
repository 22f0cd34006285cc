/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Generator session configuration.

use std::path::{Path, PathBuf};

/// Views directory, relative to the engine directory.
pub const DEFAULT_VIEWS_OFFSET: &str = "../views";

/// Added to a sentinel's 1-based line number in the emitted directive.
pub const DEFAULT_LINE_OFFSET: usize = 2;

/// Maximum nesting of renders (a template rendering a partial counts as one level).
pub const DEFAULT_MAX_RENDER_DEPTH: usize = 50;

/// Engine directory used when none is configured: this crate's `src`
/// directory, so that the default views offset lands on the bundled `views/`.
pub fn default_engine_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

/// Configuration for one [`Dumper`](crate::Dumper) session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumperConfig {
    /// Path of the generated file, quoted into line directives.
    pub output: PathBuf,

    /// Prefix stripped from template specs before they are looked up in the
    /// views directory.
    pub base: PathBuf,

    /// Directory the views offset is applied to.
    pub engine_dir: PathBuf,

    pub views_offset: PathBuf,

    pub line_offset: usize,

    pub max_render_depth: usize,

    /// Working directory to resolve against; the process's current directory
    /// when unset.
    pub working_dir: Option<PathBuf>,
}

impl DumperConfig {
    /// Create a configuration with default engine directory, views offset,
    /// line offset and render depth.
    pub fn new(output: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            base: base.into(),
            engine_dir: default_engine_dir(),
            views_offset: PathBuf::from(DEFAULT_VIEWS_OFFSET),
            line_offset: DEFAULT_LINE_OFFSET,
            max_render_depth: DEFAULT_MAX_RENDER_DEPTH,
            working_dir: None,
        }
    }

    pub fn with_engine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.engine_dir = dir.into();
        self
    }

    pub fn with_views_offset(mut self, offset: impl Into<PathBuf>) -> Self {
        self.views_offset = offset.into();
        self
    }

    pub fn with_line_offset(mut self, offset: usize) -> Self {
        self.line_offset = offset;
        self
    }

    pub fn with_max_render_depth(mut self, depth: usize) -> Self {
        self.max_render_depth = depth;
        self
    }

    /// Resolve paths against `dir` instead of the process's current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}
