// src/inject/mod.rs

//! Injection orchestrator
//!
//! One call to [`Injector::inject`] runs the whole workflow against a target
//! archive:
//!
//! 1. Existence and overwrite check (the host confirms replacing a
//!    descriptor that is already present)
//! 2. Scratch workspace acquisition and extraction
//! 3. Descriptor generation (analyzer) or synthesis (template), then the
//!    compile/repair loop
//! 4. Backup of the archive
//! 5. Archive patch
//! 6. Workspace cleanup, on every exit path
//!
//! Any failure aborts the run. The archive is only ever replaced as a whole,
//! and the backup, once written, is left in place for the user.

pub mod backup;

use crate::archive::{self, NewEntry};
use crate::config::InjectConfig;
use crate::descriptor::{MODULE_INFO_CLASS, MODULE_INFO_SOURCE, ModuleDescriptor};
use crate::error::{Error, Result};
use crate::modulepath::DependencySet;
use crate::repair::{CompiledDescriptor, RepairLoop};
use crate::tool::ToolRunner;
use crate::workspace::ScratchWorkspace;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use backup::backup_archive;

/// Where the module descriptor comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorSource {
    /// Generated by the dependency analyzer from the archive's real dependencies
    Analyzer,
    /// Synthesized from a user-supplied module name and export list
    Template {
        module_name: String,
        exports: Vec<String>,
    },
}

impl DescriptorSource {
    /// Template source from a comma-separated export list
    pub fn template(module_name: impl Into<String>, export_list: &str) -> Self {
        Self::Template {
            module_name: module_name.into(),
            exports: export_list
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }
}

/// One injection request
#[derive(Debug, Clone)]
pub struct InjectRequest {
    /// Archive to retrofit
    pub archive: PathBuf,
    /// Archives placed on the module path for the analyzer and compiler
    pub dependencies: DependencySet,
    /// Descriptor origin
    pub source: DescriptorSource,
}

impl InjectRequest {
    /// Analyzer-mode request
    pub fn analyze(archive: impl Into<PathBuf>, dependencies: DependencySet) -> Self {
        Self {
            archive: archive.into(),
            dependencies,
            source: DescriptorSource::Analyzer,
        }
    }

    /// Template-mode request
    pub fn template(
        archive: impl Into<PathBuf>,
        module_name: impl Into<String>,
        export_list: &str,
    ) -> Self {
        Self {
            archive: archive.into(),
            dependencies: DependencySet::empty(),
            source: DescriptorSource::template(module_name, export_list),
        }
    }

    /// Replace the dependency set
    pub fn with_dependencies(mut self, dependencies: DependencySet) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// A descriptor already present in the target archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingDescriptor {
    /// Source text, present only when this tool wrote the descriptor
    pub source: Option<String>,
}

impl ExistingDescriptor {
    /// Whether the descriptor carries the source copy this tool adds
    pub fn written_by_engine(&self) -> bool {
        self.source.is_some()
    }
}

/// The caller's side of an injection run
pub trait InjectionHost {
    /// Decide whether an existing descriptor may be replaced
    fn confirm_overwrite(&mut self, archive: &Path, existing: &ExistingDescriptor) -> bool;

    /// Receive the final outcome of a run
    fn report(&mut self, _result: &Result<InjectOutcome>) {}
}

impl<F> InjectionHost for F
where
    F: FnMut(&Path, &ExistingDescriptor) -> bool,
{
    fn confirm_overwrite(&mut self, archive: &Path, existing: &ExistingDescriptor) -> bool {
        self(archive, existing)
    }
}

/// Result of the existence/overwrite check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preflight {
    /// Continue; `backup` is set if an existing descriptor was removed
    Proceed { backup: Option<PathBuf> },
    /// The host declined to overwrite an existing descriptor
    Declined,
}

impl Preflight {
    pub fn proceed(&self) -> bool {
        matches!(self, Preflight::Proceed { .. })
    }
}

/// How the archive was rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStrategy {
    /// New archive built from the extraction directory
    Rebuild,
    /// Original entries copied, descriptor entries shadowed and appended
    Shadow,
}

/// Details of a successful injection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectReport {
    pub archive: PathBuf,
    pub backup: PathBuf,
    pub module_name: Option<String>,
    pub descriptor_source: String,
    pub removed_exports: Vec<String>,
    pub compile_attempts: usize,
    pub strategy: PatchStrategy,
}

/// Outcome of an injection run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectOutcome {
    Injected(InjectReport),
    /// An existing descriptor was kept at the host's request
    Skipped,
}

/// Runs injections with a given configuration and tool runner
pub struct Injector<R: ToolRunner> {
    config: InjectConfig,
    runner: R,
}

impl<R: ToolRunner> Injector<R> {
    pub fn new(config: InjectConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &InjectConfig {
        &self.config
    }

    /// Check the target and clear any existing descriptor
    ///
    /// When the archive already holds `module-info.class` the host is asked
    /// to confirm. On confirmation the archive is backed up first, then the
    /// descriptor class and its source copy are removed, so the rest of the
    /// run only ever deals with a descriptor-free archive.
    pub fn should_inject(
        &self,
        archive: &Path,
        host: &mut dyn InjectionHost,
    ) -> Result<Preflight> {
        if !archive.exists() {
            return Err(Error::TargetMissing(archive.to_path_buf()));
        }

        let entries = archive::list_entries(archive)?;
        if !entries.iter().any(|e| e == MODULE_INFO_CLASS) {
            return Ok(Preflight::Proceed { backup: None });
        }

        let existing = ExistingDescriptor {
            source: archive::read_entry_text(archive, MODULE_INFO_SOURCE)?,
        };
        info!(
            "{} already contains {} ({})",
            archive.display(),
            MODULE_INFO_CLASS,
            if existing.written_by_engine() {
                "written by modinject"
            } else {
                "not written by modinject"
            }
        );

        if !host.confirm_overwrite(archive, &existing) {
            return Ok(Preflight::Declined);
        }

        let backup = backup::backup_archive(archive)?;
        archive::remove_entries(archive, &[MODULE_INFO_CLASS, MODULE_INFO_SOURCE])?;

        Ok(Preflight::Proceed {
            backup: Some(backup),
        })
    }

    /// Run a full injection and report the outcome to the host
    pub fn inject(
        &self,
        request: &InjectRequest,
        host: &mut dyn InjectionHost,
    ) -> Result<InjectOutcome> {
        let result = self.inject_inner(request, host);
        if let Err(e) = &result {
            warn!("Injection into {} failed: {}", request.archive.display(), e);
        }
        host.report(&result);
        result
    }

    fn inject_inner(
        &self,
        request: &InjectRequest,
        host: &mut dyn InjectionHost,
    ) -> Result<InjectOutcome> {
        let archive = request.archive.as_path();

        // Template input is validated before the archive is touched.
        let template = match &request.source {
            DescriptorSource::Analyzer => None,
            DescriptorSource::Template {
                module_name,
                exports,
            } => Some(ModuleDescriptor::synthesize(
                MODULE_INFO_SOURCE,
                module_name,
                exports.as_slice(),
            )?),
        };

        for missing in request.dependencies.missing() {
            warn!("Dependency archive does not exist: {}", missing.display());
        }

        let early_backup = match self.should_inject(archive, host)? {
            Preflight::Declined => {
                info!("Keeping existing descriptor in {}", archive.display());
                return Ok(InjectOutcome::Skipped);
            }
            Preflight::Proceed { backup } => backup,
        };

        let workspace = ScratchWorkspace::acquire(archive, &self.config.scratch_prefix)?;
        let result = self.build_and_patch(request, template, early_backup, &workspace);
        if let Err(e) = workspace.cleanup() {
            warn!("Failed to clean up scratch workspace: {}", e);
        }
        result
    }

    fn build_and_patch(
        &self,
        request: &InjectRequest,
        template: Option<ModuleDescriptor>,
        early_backup: Option<PathBuf>,
        workspace: &ScratchWorkspace,
    ) -> Result<InjectOutcome> {
        let archive = request.archive.as_path();
        let classes = workspace.classes_dir();
        let extracted = archive::extract_all(archive, &classes)?;
        info!("Extracted {} files from {}", extracted, archive.display());

        let repair = RepairLoop::new(&self.runner, &self.config);
        let compiled = match template {
            Some(descriptor) => {
                let descriptor = descriptor.with_path(workspace.source_path());
                descriptor.save()?;
                repair.compile(descriptor, &request.dependencies, workspace)?
            }
            None => repair.run(archive, &request.dependencies, workspace)?,
        };

        let backup = match early_backup {
            Some(backup) => backup,
            None => backup::backup_archive(archive)?,
        };

        let strategy = match request.source {
            DescriptorSource::Analyzer => {
                patch_by_rebuild(archive, &classes, &compiled)?;
                PatchStrategy::Rebuild
            }
            DescriptorSource::Template { .. } => {
                archive::replace_entries(
                    archive,
                    &[
                        NewEntry::new(MODULE_INFO_CLASS, &compiled.class_file),
                        NewEntry::new(MODULE_INFO_SOURCE, compiled.descriptor.path()),
                    ],
                )?;
                PatchStrategy::Shadow
            }
        };

        info!(
            "Injected {} into {} (backup at {})",
            MODULE_INFO_CLASS,
            archive.display(),
            backup.display()
        );

        Ok(InjectOutcome::Injected(InjectReport {
            archive: archive.to_path_buf(),
            backup,
            module_name: compiled.descriptor.module_name(),
            descriptor_source: compiled.descriptor.source().to_string(),
            removed_exports: compiled.removed_exports,
            compile_attempts: compiled.attempts,
            strategy,
        }))
    }
}

/// Rebuild the archive from the extraction directory
///
/// The compiler already wrote `module-info.class` there; the source copy is
/// added next to it.
fn patch_by_rebuild(archive: &Path, classes: &Path, compiled: &CompiledDescriptor) -> Result<()> {
    fs::write(
        classes.join(MODULE_INFO_SOURCE),
        compiled.descriptor.source(),
    )
    .map_err(|e| Error::PatchFailed {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(
        "Staged {} next to {}",
        MODULE_INFO_SOURCE,
        compiled.class_file.display()
    );

    archive::rebuild_from_directory(archive, classes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_source_splits_export_list() {
        assert_eq!(
            DescriptorSource::template("lib", " a.b, c.d ,,"),
            DescriptorSource::Template {
                module_name: "lib".to_string(),
                exports: vec!["a.b".to_string(), "c.d".to_string()],
            }
        );
    }

    #[test]
    fn test_existing_descriptor_provenance() {
        assert!(ExistingDescriptor {
            source: Some("module m {}".to_string())
        }
        .written_by_engine());
        assert!(!ExistingDescriptor { source: None }.written_by_engine());
    }

    #[test]
    fn test_preflight_proceed() {
        assert!(Preflight::Proceed { backup: None }.proceed());
        assert!(!Preflight::Declined.proceed());
    }
}
