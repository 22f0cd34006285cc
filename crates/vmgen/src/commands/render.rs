/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! Render command implementation.
//!
//! Renders partial `_PARTIAL.erb` and prints the fragment as is; source
//! pragmas are left in place.

use anyhow::Result;

use super::{SessionArgs, report};

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    pub partial: String,
    pub session: SessionArgs,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let locals = args.session.locals()?;
    let mut dumper = args.session.open()?;

    let text = dumper.render(&args.partial, &locals).map_err(report)?;
    print!("{}", text);
    Ok(())
}
