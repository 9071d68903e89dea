// src/lib.rs

//! modinject
//!
//! Retrofits a legacy jar (an archive with no module descriptor) with a
//! compiled `module-info.class` so module-aware tooling can consume it.
//!
//! # Architecture
//!
//! - Archive accessor: zip container reads and rename-based atomic rewrites
//! - Scratch workspace: extraction and build directories next to the archive,
//!   removed on every exit path
//! - Tool invoker: blocking analyzer/compiler runs with a bounded wait
//! - Repair loop: classifies tool output, removes exports the compiler
//!   rejects, and recompiles until the descriptor compiles
//! - Orchestrator: overwrite check, backup, patch, cleanup

pub mod archive;
pub mod config;
pub mod descriptor;
mod error;
pub mod inject;
pub mod modulepath;
pub mod repair;
pub mod tool;
pub mod workspace;

pub use config::{InjectConfig, ToolSpec};
pub use descriptor::{MODULE_INFO_CLASS, MODULE_INFO_SOURCE, ModuleDescriptor};
pub use error::{Error, Result};
pub use inject::{
    DescriptorSource, ExistingDescriptor, InjectOutcome, InjectReport, InjectRequest,
    InjectionHost, Injector, PatchStrategy, Preflight,
};
pub use modulepath::DependencySet;
pub use repair::{CompiledDescriptor, RepairLoop};
pub use tool::{ProcessRunner, ToolCommand, ToolInvocationResult, ToolRunner};
pub use workspace::ScratchWorkspace;
