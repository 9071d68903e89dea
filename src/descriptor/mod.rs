// src/descriptor/mod.rs

//! Module descriptor source (`module-info.java`)
//!
//! The descriptor is treated as text, not parsed as Java. The only edits the
//! engine makes are line-oriented: dropping `exports <pkg>;` statements the
//! compiler rejected.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Entry name of the compiled descriptor
pub const MODULE_INFO_CLASS: &str = "module-info.class";

/// Entry name of the descriptor source
pub const MODULE_INFO_SOURCE: &str = "module-info.java";

/// A descriptor source file and its current text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    path: PathBuf,
    source: String,
}

impl ModuleDescriptor {
    /// Load a descriptor written by the analyzer
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let source = fs::read_to_string(&path)?;
        Ok(Self { path, source })
    }

    /// Synthesize a descriptor from a module name and export list
    pub fn synthesize<S: AsRef<str>>(
        path: impl Into<PathBuf>,
        module_name: &str,
        exports: &[S],
    ) -> Result<Self> {
        let module_name = module_name.trim();
        if !is_qualified_name(module_name) {
            return Err(Error::InvalidModuleName(module_name.to_string()));
        }

        let exports: Vec<&str> = exports
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| !e.is_empty())
            .collect();
        if exports.is_empty() {
            return Err(Error::NoExports);
        }

        let mut source = format!("module {} {{\n", module_name);
        for export in exports {
            source.push_str(&format!("    exports {};\n", export));
        }
        source.push_str("}\n");

        Ok(Self {
            path: path.into(),
            source,
        })
    }

    /// Move the descriptor to a new source path (not written until `save`)
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Location of the source file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Write the current text to `path()`
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &self.source)?;
        Ok(())
    }

    /// Declared module name, if the header is recognizable
    pub fn module_name(&self) -> Option<String> {
        MODULE_HEADER_RE
            .captures(&self.source)
            .map(|c| c[1].to_string())
    }

    /// Exported package names in declaration order
    pub fn exports(&self) -> Vec<String> {
        EXPORT_RE
            .captures_iter(&self.source)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Delete every `exports <package>;` line, returning how many were removed
    pub fn remove_export(&mut self, package: &str) -> usize {
        let pattern = format!(
            r"(?m)^[ \t]*exports[ \t]+{}[ \t]*;[ \t]*(?:\r?\n)?",
            regex::escape(package)
        );
        let Ok(re) = Regex::new(&pattern) else {
            return 0;
        };

        let removed = re.find_iter(&self.source).count();
        if removed > 0 {
            self.source = re.replace_all(&self.source, "").into_owned();
        }
        removed
    }
}

static MODULE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:open\s+)?module\s+([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\s*\{")
        .unwrap()
});

static EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*exports\s+([A-Za-z_$][\w$.]*)\s*(?:;|to\b)").unwrap());

/// Dotted sequence of Java identifiers
fn is_qualified_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                }
                _ => false,
            }
        })
}
