// src/commands.rs
//! Command implementations for the modinject CLI

use crate::cli::ToolArgs;
use anyhow::{Context, Result};
use modinject::{
    DependencySet, Error, ExistingDescriptor, InjectConfig, InjectOutcome, InjectRequest,
    InjectionHost, Injector, MODULE_INFO_CLASS, MODULE_INFO_SOURCE, ProcessRunner, archive,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exit status when the analyzer reports missing dependencies
pub const EXIT_MISSING_DEPENDENCIES: i32 = 2;

/// Exit status for every other failure
pub const EXIT_FAILURE: i32 = 1;

/// Terminal side of an injection run: prompts on stdin, prints the outcome
struct TerminalHost {
    assume_yes: bool,
}

impl InjectionHost for TerminalHost {
    fn confirm_overwrite(&mut self, archive: &Path, existing: &ExistingDescriptor) -> bool {
        println!("{} already contains {}", archive.display(), MODULE_INFO_CLASS);
        match &existing.source {
            Some(source) => {
                println!("Existing descriptor source:");
                println!("{}", source.trim_end());
            }
            None => println!("The existing descriptor was not written by modinject"),
        }

        if self.assume_yes {
            return true;
        }

        let stdin = io::stdin();
        if !stdin.is_terminal() {
            println!("Not overwriting (stdin is not a terminal, pass --yes to overwrite)");
            return false;
        }

        print!("Overwrite it? [y/N] ");
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn report(&mut self, result: &modinject::Result<InjectOutcome>) {
        match result {
            Ok(InjectOutcome::Injected(report)) => {
                println!(
                    "Injected {} into {}",
                    MODULE_INFO_CLASS,
                    report.archive.display()
                );
                if let Some(name) = &report.module_name {
                    println!("  Module:  {}", name);
                }
                println!("  Backup:  {}", report.backup.display());
                if !report.removed_exports.is_empty() {
                    println!("  Dropped empty exports:");
                    for pkg in &report.removed_exports {
                        println!("    {}", pkg);
                    }
                }
            }
            Ok(InjectOutcome::Skipped) => println!("Existing descriptor kept, nothing injected"),
            Err(Error::MissingDependencies(names)) => {
                eprintln!("Missing dependencies (add them with --dep):");
                for name in names {
                    eprintln!("{}", name);
                }
            }
            Err(e) => eprintln!("Error [{}]: {}", e.kind(), e),
        }
    }
}

/// Build the effective configuration from a config file and flags
fn load_config(tools: &ToolArgs) -> Result<InjectConfig> {
    let mut config = match &tools.config {
        Some(path) => InjectConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => InjectConfig::default(),
    };
    if let Some(java_home) = &tools.java_home {
        config = config.with_java_home(java_home);
    }
    if let Some(secs) = tools.timeout {
        config = config.with_timeout_secs(secs);
    }
    debug!(
        "Using analyzer {} and compiler {}",
        config.analyzer_program(),
        config.compiler_program()
    );
    Ok(config)
}

/// Inject a module descriptor, returning the process exit status
pub fn cmd_inject(
    archive: PathBuf,
    deps: Vec<PathBuf>,
    template: Option<(String, String)>,
    assume_yes: bool,
    tools: &ToolArgs,
) -> Result<i32> {
    let config = load_config(tools)?;
    let runner = ProcessRunner::new(config.tool_timeout());
    let injector = Injector::new(config, runner);

    let dependencies = DependencySet::new(deps);
    let request = match template {
        Some((module, exports)) => {
            InjectRequest::template(archive, module, &exports).with_dependencies(dependencies)
        }
        None => InjectRequest::analyze(archive, dependencies),
    };

    let mut host = TerminalHost { assume_yes };
    Ok(match injector.inject(&request, &mut host) {
        Ok(_) => 0,
        Err(Error::MissingDependencies(_)) => EXIT_MISSING_DEPENDENCIES,
        Err(_) => EXIT_FAILURE,
    })
}

/// Print the descriptor state of an archive
pub fn cmd_show(archive: &Path, list_entries: bool) -> Result<()> {
    if !archive.exists() {
        return Err(Error::TargetMissing(archive.to_path_buf()).into());
    }

    let entries = archive::list_entries(archive)?;
    println!("Archive: {}", archive.display());
    println!("Entries: {}", entries.len());

    if entries.iter().any(|e| e == MODULE_INFO_CLASS) {
        println!("Descriptor: present");
        match archive::read_entry_text(archive, MODULE_INFO_SOURCE)? {
            Some(source) => {
                println!();
                println!("{}", source.trim_end());
            }
            None => println!("  (no {} entry, not written by modinject)", MODULE_INFO_SOURCE),
        }
    } else {
        println!("Descriptor: none");
    }

    if list_entries {
        println!();
        for entry in &entries {
            println!("  {}", entry);
        }
    }
    Ok(())
}
