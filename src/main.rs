// src/main.rs

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inject {
            archive,
            deps,
            module,
            exports,
            yes,
            tools,
        } => {
            let template = module.zip(exports);
            let code = commands::cmd_inject(archive, deps, template, yes, &tools)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Show { archive, entries } => commands::cmd_show(&archive, entries),
    }
}
