/*
 * path.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template path resolution.
//!
//! A spec such as `_c_expr.erb` is looked up under the views directory, which
//! sits at a fixed offset from the engine directory. Specs are first made
//! absolute against the working directory; a leading `base/` is stripped so
//! specs written relative to the base directory land inside the views
//! directory. A spec outside the base stays absolute and is used as is.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::config::DumperConfig;
use crate::error::{DumperError, DumperResult};

/// Where a template's source lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    /// Working-directory-relative form, used as the template filename.
    display: PathBuf,
    /// Absolute normalized form, used to read the file.
    absolute: PathBuf,
}

impl ResolvedPath {
    pub fn display_path(&self) -> &Path {
        &self.display
    }

    pub fn absolute(&self) -> &Path {
        &self.absolute
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display.display())
    }
}

/// Maps specs to [`ResolvedPath`]s. Pure once built: the working directory is
/// captured at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    /// Views directory as seen from the working directory.
    views_dir: PathBuf,
    /// Absolute normalized base directory.
    base: PathBuf,
    working_dir: PathBuf,
}

impl PathResolver {
    pub fn new(
        engine_dir: &Path,
        views_offset: &Path,
        base: &Path,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        let working_dir = normalize(&working_dir.into());
        let engine_abs = normalize(&working_dir.join(engine_dir));
        let engine_dir = relative_to(&engine_abs, &working_dir).unwrap_or(engine_abs);
        Self {
            views_dir: normalize(&engine_dir.join(views_offset)),
            base: normalize(&working_dir.join(base)),
            working_dir,
        }
    }

    /// Build from a session configuration, capturing the current directory
    /// unless the configuration overrides it.
    pub fn from_config(config: &DumperConfig) -> DumperResult<Self> {
        let working_dir = match &config.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(DumperError::WorkingDirectory)?,
        };
        Ok(Self::new(
            &config.engine_dir,
            &config.views_offset,
            &config.base,
            working_dir,
        ))
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn views_dir(&self) -> &Path {
        &self.views_dir
    }

    pub fn resolve(&self, spec: &str) -> ResolvedPath {
        let spec_abs = normalize(&self.working_dir.join(spec));
        let remainder = match spec_abs.strip_prefix(&self.base) {
            Ok(rest) if !rest.as_os_str().is_empty() => rest.to_path_buf(),
            _ => spec_abs,
        };
        // An absolute remainder replaces the views directory
        let display = normalize(&self.views_dir.join(remainder));
        let absolute = normalize(&self.working_dir.join(&display));
        ResolvedPath { display, absolute }
    }
}

/// Lexically normalize a path: drop `.`, fold `name/..`, and drop `..`
/// directly under the root. Leading `..` of a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Express absolute `path` relative to absolute `base`; `None` when the two
/// do not share a root.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    if !path.is_absolute() || !base.is_absolute() {
        return None;
    }
    let path: Vec<Component<'_>> = path.components().collect();
    let base: Vec<Component<'_>> = base.components().collect();
    if path.first() != base.first() {
        return None;
    }

    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &path[common..] {
        relative.push(component);
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Some(relative)
}
