/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Command implementations for the vmgen CLI
//!
//! Each command module handles the CLI interface and delegates to
//! vmgen-dumper for the actual rendering.

pub mod generate;
pub mod render;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::Args;
use tracing::debug;

use vmgen_dumper::{Dumper, DumperConfig, DumperError, Locals};
use vmgen_template::{TemplateError, TemplateValue};

/// Flags shared by every command that opens a generator session.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Generated file; its path is written into `#line` directives
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Directory template specs may be given relative to
    #[arg(long, default_value = ".")]
    pub base: PathBuf,

    /// Directory the views offset is applied to
    #[arg(long)]
    pub engine_dir: Option<PathBuf>,

    /// Views directory, relative to the engine directory
    #[arg(long)]
    pub views_offset: Option<PathBuf>,

    /// Added to the line number of each rewritten source pragma
    #[arg(long)]
    pub line_offset: Option<usize>,

    /// JSON file with an object of template locals
    #[arg(long)]
    pub locals: Option<PathBuf>,

    /// String local (NAME=VALUE); overrides --locals
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    pub defines: Vec<String>,
}

impl SessionArgs {
    pub fn config(&self) -> DumperConfig {
        let mut config = DumperConfig::new(&self.output, &self.base);
        if let Some(dir) = &self.engine_dir {
            config = config.with_engine_dir(dir);
        }
        if let Some(offset) = &self.views_offset {
            config = config.with_views_offset(offset);
        }
        if let Some(offset) = self.line_offset {
            config = config.with_line_offset(offset);
        }
        config
    }

    /// Locals from `--locals`, then `-D` pairs in order; later ones win.
    pub fn locals(&self) -> Result<Locals> {
        let mut locals = match &self.locals {
            Some(path) => read_locals_file(path)?,
            None => Locals::new(),
        };
        for define in &self.defines {
            let (name, value) = parse_define(define)?;
            locals.insert(name.to_string(), TemplateValue::from(value));
        }
        Ok(locals)
    }

    pub fn open(&self) -> Result<Dumper> {
        let config = self.config();
        debug!(?config, "opening generator session");
        Dumper::new(config).context("Failed to start generator session")
    }
}

fn read_locals_file(path: &Path) -> Result<Locals> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read locals file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse locals file: {}", path.display()))?;
    match value {
        serde_json::Value::Object(entries) => Ok(entries
            .into_iter()
            .map(|(name, value)| (name, TemplateValue::from(value)))
            .collect()),
        other => Err(anyhow!(
            "Locals file must contain a JSON object, found {}: {}",
            json_type_name(&other),
            path.display()
        )),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn parse_define(define: &str) -> Result<(&str, &str)> {
    match define.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => bail!("Invalid define `{}`: expected NAME=VALUE", define),
    }
}

/// Turn a session error into a CLI error, printing a source snippet for
/// template syntax errors.
pub fn report(error: DumperError) -> anyhow::Error {
    if let DumperError::ParseError {
        path,
        text,
        source: TemplateError::ParseError {
            message, offset, ..
        },
    } = &error
    {
        eprint!("{}", render_snippet(path, text, *offset, message));
    }
    anyhow::Error::new(error)
}

/// Render a one-label report pointing at byte `offset` of `text`.
fn render_snippet(path: &Path, text: &str, offset: usize, message: &str) -> String {
    let name = path.display().to_string();
    // Spans count characters
    let start = text.get(..offset).map_or(0, |prefix| prefix.chars().count());
    let end = (start + 1).min(text.chars().count()).max(start);

    let report = Report::build(ReportKind::Error, name.clone(), start)
        .with_message("invalid template")
        .with_label(
            Label::new((name.clone(), start..end))
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish();

    let mut output = Vec::new();
    match report.write((name, Source::from(text)), &mut output) {
        Ok(()) => String::from_utf8_lossy(&output).into_owned(),
        Err(_) => format!("{}\n", message),
    }
}
