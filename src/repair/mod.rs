// src/repair/mod.rs

//! Descriptor repair loop
//!
//! Drives the analyzer and compiler through a small state machine:
//!
//! - ANALYZE: run the analyzer over the target archive. A missing-dependency
//!   report is fatal with the unresolved names; a `writing to <path>` line
//!   yields the generated descriptor; anything else is fatal with the raw
//!   output.
//! - COMPILE: compile the descriptor with the extraction directory as the
//!   class output. The compiler checks each exported package against that
//!   directory, so it must already hold the archive's classes. If the class
//!   file appears we are done. If the compiler rejects an export as empty,
//!   that export is deleted from the source and COMPILE runs again.
//!   Anything else is fatal with the raw output.
//!
//! The descriptor source always lives at the workspace's source path while
//! it is being edited, wherever the analyzer chose to write it.
//!
//! Each retry removes at least one export statement, so the loop runs at
//! most `exports + 1` times; a diagnostic naming an export that is no longer
//! in the source ends the loop with `DescriptorRepairLoopExceeded` instead
//! of spinning.

pub mod markers;

use crate::config::InjectConfig;
use crate::descriptor::{MODULE_INFO_CLASS, ModuleDescriptor};
use crate::error::{Error, Result};
use crate::modulepath::DependencySet;
use crate::tool::{ToolCommand, ToolRunner};
use crate::workspace::{ScratchWorkspace, remove_tree};
use markers::{AnalyzerVerdict, CompileVerdict};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Analyzer flag requesting per-class dependency listing
const ANALYZER_VERBOSE_FLAG: &str = "-verbose:class";

/// Directive making every module on the module path a root
const ADD_ALL_MODULE_PATH: &str = "ALL-MODULE-PATH";

/// Result of a successful COMPILE
#[derive(Debug, Clone)]
pub struct CompiledDescriptor {
    /// Compiled `module-info.class` in the extraction directory
    pub class_file: PathBuf,
    /// Descriptor source after any repairs
    pub descriptor: ModuleDescriptor,
    /// Number of compiler runs
    pub attempts: usize,
    /// Exports removed by repairs, in removal order
    pub removed_exports: Vec<String>,
}

/// Analyzer and compiler driver for one injection run
pub struct RepairLoop<'a, R: ToolRunner + ?Sized> {
    runner: &'a R,
    config: &'a InjectConfig,
}

impl<'a, R: ToolRunner + ?Sized> RepairLoop<'a, R> {
    pub fn new(runner: &'a R, config: &'a InjectConfig) -> Self {
        Self { runner, config }
    }

    /// Analyzer command line for `archive`, writing into `out_dir`
    pub fn analyzer_command(
        &self,
        archive: &Path,
        dependencies: &DependencySet,
        out_dir: &Path,
    ) -> Result<ToolCommand> {
        let mut cmd = ToolCommand::new(self.config.analyzer_program())
            .args(&self.config.analyzer.extra_args)
            .arg(ANALYZER_VERBOSE_FLAG);

        if let Some(module_path) = dependencies.module_path()? {
            cmd = cmd
                .arg("--module-path")
                .arg(module_path)
                .arg("--add-modules")
                .arg(ADD_ALL_MODULE_PATH);
        }

        Ok(cmd
            .arg("--generate-module-info")
            .arg(out_dir)
            .arg(archive))
    }

    /// Compiler command line for `source`, writing into `out_dir`
    pub fn compiler_command(
        &self,
        source: &Path,
        dependencies: &DependencySet,
        out_dir: &Path,
    ) -> Result<ToolCommand> {
        let mut cmd =
            ToolCommand::new(self.config.compiler_program()).args(&self.config.compiler.extra_args);

        if let Some(module_path) = dependencies.module_path()? {
            cmd = cmd.arg("--module-path").arg(module_path);
        }

        Ok(cmd.arg("-d").arg(out_dir).arg(source))
    }

    /// ANALYZE: produce a descriptor from the archive's real dependencies
    pub fn analyze(
        &self,
        archive: &Path,
        dependencies: &DependencySet,
        workspace: &ScratchWorkspace,
    ) -> Result<ModuleDescriptor> {
        let out_dir = workspace.generated_dir();
        let cmd = self
            .analyzer_command(archive, dependencies, &out_dir)?
            .current_dir(workspace.root());

        info!("Analyzing dependencies of {}", archive.display());
        let result = self.runner.run(&cmd)?;
        if !result.exited_cleanly() {
            debug!("Analyzer exited with {:?}", result.exit_code);
        }

        match markers::classify_analyzer_output(&result.output) {
            AnalyzerVerdict::MissingDependencies(names) => {
                warn!("Analyzer reported {} missing dependencies", names.len());
                Err(Error::MissingDependencies(names))
            }
            AnalyzerVerdict::Generated(path) => {
                let path = if path.is_relative() {
                    workspace.root().join(path)
                } else {
                    path
                };
                if !path.is_file() {
                    return Err(Error::AnalyzerError(format!(
                        "analyzer reported {} but no file was written\n{}",
                        path.display(),
                        result.output
                    )));
                }
                debug!("Analyzer generated {}", path.display());
                self.adopt_generated(&path, workspace)
            }
            AnalyzerVerdict::Unrecognized => Err(Error::AnalyzerError(result.output)),
        }
    }

    /// Move a generated descriptor to the workspace source path
    ///
    /// A file the analyzer wrote outside the workspace is removed once copied,
    /// so cleanup of the workspace removes every descriptor this run made.
    fn adopt_generated(
        &self,
        path: &Path,
        workspace: &ScratchWorkspace,
    ) -> Result<ModuleDescriptor> {
        let descriptor = ModuleDescriptor::load(path)?.with_path(workspace.source_path());
        descriptor.save()?;

        if !path.starts_with(workspace.root()) {
            match fs::remove_file(path) {
                Ok(()) => debug!("Moved {} into the workspace", path.display()),
                Err(e) => warn!("Failed to remove generated {}: {}", path.display(), e),
            }
        }
        Ok(descriptor)
    }

    /// COMPILE with empty-export repair
    pub fn compile(
        &self,
        mut descriptor: ModuleDescriptor,
        dependencies: &DependencySet,
        workspace: &ScratchWorkspace,
    ) -> Result<CompiledDescriptor> {
        let bound = descriptor.exports().len();
        let mut removed_exports: Vec<String> = Vec::new();
        let mut attempts = 0;

        let out_dir = workspace.classes_dir();
        let class_file = out_dir.join(MODULE_INFO_CLASS);

        loop {
            attempts += 1;
            remove_tree(&class_file)?;
            let cmd = self
                .compiler_command(descriptor.path(), dependencies, &out_dir)?
                .current_dir(workspace.root());

            debug!("Compiling {} (attempt {})", descriptor.path().display(), attempts);
            let result = self.runner.run(&cmd)?;

            if class_file.is_file() {
                info!(
                    "Compiled module descriptor after {} attempt(s), {} export(s) removed",
                    attempts,
                    removed_exports.len()
                );
                return Ok(CompiledDescriptor {
                    class_file: class_file.clone(),
                    descriptor,
                    attempts,
                    removed_exports,
                });
            }

            let package = match markers::classify_compile_output(&result.output) {
                CompileVerdict::EmptyExport(package) => package,
                CompileVerdict::Unrecognized => return Err(Error::CompileError(result.output)),
            };

            if removed_exports.len() >= bound {
                return Err(Error::DescriptorRepairLoopExceeded {
                    exports: bound,
                    removed: removed_exports.len(),
                });
            }

            if descriptor.remove_export(&package) == 0 {
                warn!(
                    "Compiler rejected export {} which is not in the descriptor",
                    package
                );
                return Err(Error::DescriptorRepairLoopExceeded {
                    exports: bound,
                    removed: removed_exports.len(),
                });
            }

            warn!("Removing empty export {} and recompiling", package);
            descriptor.save()?;
            removed_exports.push(package);
        }
    }

    /// ANALYZE then COMPILE
    pub fn run(
        &self,
        archive: &Path,
        dependencies: &DependencySet,
        workspace: &ScratchWorkspace,
    ) -> Result<CompiledDescriptor> {
        let descriptor = self.analyze(archive, dependencies, workspace)?;
        self.compile(descriptor, dependencies, workspace)
    }
}
