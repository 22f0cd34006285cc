/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! vmgen CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::SessionArgs;

#[derive(Parser)]
#[command(name = "vmgen")]
#[command(version)]
#[command(about = "Generate C sources from ERB-style templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a file from TEMPLATE.erb, rewriting source pragmas
    Generate {
        /// Template name, without the `.erb` extension
        template: String,

        #[command(flatten)]
        session: SessionArgs,

        /// Print the generated text instead of writing it to --output
        #[arg(long)]
        stdout: bool,
    },

    /// Render partial _PARTIAL.erb and print it
    Render {
        /// Partial name, without the leading `_` and the `.erb` extension
        partial: String,

        #[command(flatten)]
        session: SessionArgs,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vmgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            template,
            session,
            stdout,
        } => commands::generate::execute(commands::generate::GenerateArgs {
            template,
            session,
            stdout,
        }),
        Commands::Render { partial, session } => {
            commands::render::execute(commands::render::RenderArgs { partial, session })
        }
    }
}
