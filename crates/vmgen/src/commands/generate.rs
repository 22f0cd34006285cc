/*
 * generate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Generate command implementation
 */

//! Generate command implementation.
//!
//! Renders `TEMPLATE.erb` with the session locals, rewrites its source
//! pragmas into `#line` directives for the output file and writes the result.

use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use super::{SessionArgs, report};

/// Arguments for the generate command
#[derive(Debug)]
pub struct GenerateArgs {
    pub template: String,
    pub session: SessionArgs,
    /// Print to stdout instead of writing the output file
    pub stdout: bool,
}

/// Execute the generate command
pub fn execute(args: GenerateArgs) -> Result<()> {
    let locals = args.session.locals()?;
    let mut dumper = args.session.open()?;

    let text = dumper.generate(&args.template, &locals).map_err(report)?;

    if args.stdout {
        print!("{}", text);
        return Ok(());
    }

    let output = &args.session.output;
    fs::write(output, &text)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;
    info!(
        template = %args.template,
        output = %output.display(),
        bytes = text.len(),
        "generated"
    );
    Ok(())
}
