// src/cli.rs
//! CLI definitions for modinject
//!
//! The command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modinject")]
#[command(author, version)]
#[command(about = "Retrofit legacy jar archives with a compiled module descriptor", long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inject a module descriptor into an archive
    ///
    /// Without --module the descriptor is generated by the dependency
    /// analyzer from the archive's real dependencies. With --module and
    /// --exports it is synthesized from the given names.
    Inject {
        /// Archive to retrofit
        archive: PathBuf,

        /// Dependency archive placed on the module path (repeatable)
        #[arg(long = "dep", value_name = "JAR")]
        deps: Vec<PathBuf>,

        /// Module name for a synthesized descriptor
        #[arg(long, requires = "exports")]
        module: Option<String>,

        /// Comma-separated packages to export from a synthesized descriptor
        #[arg(long, requires = "module")]
        exports: Option<String>,

        /// Overwrite an existing descriptor without asking
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        tools: ToolArgs,
    },

    /// Show whether an archive carries a module descriptor
    Show {
        /// Archive to inspect
        archive: PathBuf,

        /// Also list every entry
        #[arg(long)]
        entries: bool,
    },
}

/// Tool configuration overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ToolArgs {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JDK root used to find jdeps and javac
    #[arg(long, value_name = "DIR")]
    pub java_home: Option<PathBuf>,

    /// Seconds before a hung analyzer or compiler is killed
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_template_flags_require_each_other() {
        assert!(Cli::try_parse_from(["modinject", "inject", "lib.jar", "--module", "m"]).is_err());
        assert!(
            Cli::try_parse_from([
                "modinject", "inject", "lib.jar", "--module", "m", "--exports", "a,b"
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_repeated_deps() {
        let cli = Cli::try_parse_from([
            "modinject", "inject", "lib.jar", "--dep", "a.jar", "--dep", "b.jar",
        ])
        .unwrap();
        match cli.command {
            Commands::Inject { deps, .. } => {
                assert_eq!(deps, vec![PathBuf::from("a.jar"), PathBuf::from("b.jar")])
            }
            Commands::Show { .. } => panic!("expected inject"),
        }
    }
}
