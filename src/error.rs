// src/error.rs

//! Error types for module injection
//!
//! Every failure aborts the current injection run. `MissingDependencies` is
//! the one kind a caller can act on directly (supply more dependency archives
//! and retry), so it carries a structured list instead of raw tool text.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the injection engine
#[derive(Error, Debug)]
pub enum Error {
    /// The target archive path does not exist
    #[error("Target archive does not exist: {}", .0.display())]
    TargetMissing(PathBuf),

    /// The archive could not be opened or is not a valid container
    #[error("Archive is unreadable: {}: {reason}", path.display())]
    ArchiveUnreadable { path: PathBuf, reason: String },

    /// Writing extracted entries failed
    #[error("Extraction of {} failed: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    /// An entry name would resolve outside the extraction directory
    #[error("Archive entry escapes the extraction directory: {0}")]
    UnsafeEntryPath(String),

    /// A named entry was expected but is absent
    #[error("Entry {name} not found in {}", archive.display())]
    EntryNotFound { archive: PathBuf, name: String },

    /// The analyzer could not resolve some dependencies
    #[error("Missing dependencies: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    /// The analyzer output did not match any known outcome
    #[error("Dependency analyzer failed:\n{0}")]
    AnalyzerError(String),

    /// The compiler did not produce a descriptor class and gave no repairable diagnostic
    #[error("Descriptor compilation failed:\n{0}")]
    CompileError(String),

    /// The export repair loop ran out of exports to remove
    #[error("Descriptor repair did not converge after removing {removed} of {exports} exports")]
    DescriptorRepairLoopExceeded { exports: usize, removed: usize },

    /// Rewriting the archive failed; the original archive is untouched
    #[error("Failed to patch {}: {reason}", path.display())]
    PatchFailed { path: PathBuf, reason: String },

    /// An external tool exceeded its time budget and was killed
    #[error("{tool} timed out after {timeout_secs} seconds")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    /// An external tool could not be located
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The scratch directory for this archive already exists
    #[error(
        "Scratch directory already exists: {} (another run in progress, or left over from a crashed run)",
        .0.display()
    )]
    ScratchInUse(PathBuf),

    /// The safety backup could not be written or verified
    #[error("Backup {} failed: {reason}", path.display())]
    BackupFailed { path: PathBuf, reason: String },

    /// Template mode received a module name that is not a legal identifier
    #[error("Invalid module name: {0:?}")]
    InvalidModuleName(String),

    /// Template mode received no usable exports
    #[error("No exports given; at least one package must be exported")]
    NoExports,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short stable identifier for each error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::TargetMissing(_) => "target_missing",
            Error::ArchiveUnreadable { .. } => "archive_unreadable",
            Error::ExtractionFailed { .. } => "extraction_failed",
            Error::UnsafeEntryPath(_) => "unsafe_entry_path",
            Error::EntryNotFound { .. } => "entry_not_found",
            Error::MissingDependencies(_) => "missing_dependencies",
            Error::AnalyzerError(_) => "analyzer_error",
            Error::CompileError(_) => "compile_error",
            Error::DescriptorRepairLoopExceeded { .. } => "repair_loop_exceeded",
            Error::PatchFailed { .. } => "patch_failed",
            Error::ToolTimeout { .. } => "tool_timeout",
            Error::ToolNotFound(_) => "tool_not_found",
            Error::ScratchInUse(_) => "scratch_in_use",
            Error::BackupFailed { .. } => "backup_failed",
            Error::InvalidModuleName(_) => "invalid_module_name",
            Error::NoExports => "no_exports",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }

    /// Unresolved dependency names, if this is a `MissingDependencies` error
    pub fn missing_dependencies(&self) -> Option<&[String]> {
        match self {
            Error::MissingDependencies(names) => Some(names),
            _ => None,
        }
    }
}
