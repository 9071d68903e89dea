// src/config.rs

//! Engine configuration
//!
//! All fields have working defaults, so a config file is optional. A TOML
//! file may override any subset:
//!
//! ```toml
//! java_home = "/usr/lib/jvm/java-21"
//! tool_timeout_secs = 120
//!
//! [compiler]
//! extra_args = ["--release", "11"]
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time budget for one analyzer or compiler run
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;

/// Analyzer used when none is configured
pub const DEFAULT_ANALYZER: &str = "jdeps";

/// Compiler used when none is configured
pub const DEFAULT_COMPILER: &str = "javac";

/// Default name of the scratch directory created next to the archive
pub const DEFAULT_SCRATCH_PREFIX: &str = "tmpClassPath";

/// An external tool and the extra arguments always passed to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSpec {
    /// Program name or path
    pub program: String,
    /// Arguments inserted before the engine's own arguments
    pub extra_args: Vec<String>,
}

impl ToolSpec {
    fn named(program: &str) -> Self {
        Self {
            program: program.to_string(),
            extra_args: Vec::new(),
        }
    }

    /// A `[compiler]` table with only `extra_args` leaves the program empty
    fn program_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.program.trim().is_empty() {
            default
        } else {
            &self.program
        }
    }
}

impl Default for ToolSpec {
    fn default() -> Self {
        Self::named("")
    }
}

/// Injection engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectConfig {
    /// Dependency analyzer (jdeps)
    pub analyzer: ToolSpec,

    /// Descriptor compiler (javac)
    pub compiler: ToolSpec,

    /// JDK root used to resolve bare program names
    pub java_home: Option<PathBuf>,

    /// Seconds before a hung tool is killed
    pub tool_timeout_secs: u64,

    /// Scratch directory name prefix
    pub scratch_prefix: String,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            analyzer: ToolSpec::named(DEFAULT_ANALYZER),
            compiler: ToolSpec::named(DEFAULT_COMPILER),
            java_home: None,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            scratch_prefix: DEFAULT_SCRATCH_PREFIX.to_string(),
        }
    }
}

impl InjectConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Parse a config from TOML text
    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Set the JDK root
    pub fn with_java_home(mut self, path: impl Into<PathBuf>) -> Self {
        self.java_home = Some(path.into());
        self
    }

    /// Set the tool timeout in seconds
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.tool_timeout_secs = secs;
        self
    }

    /// Set the analyzer program
    pub fn with_analyzer(mut self, program: impl Into<String>) -> Self {
        self.analyzer.program = program.into();
        self
    }

    /// Set the compiler program
    pub fn with_compiler(mut self, program: impl Into<String>) -> Self {
        self.compiler.program = program.into();
        self
    }

    /// Tool timeout as a duration (never zero)
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs.max(1))
    }

    /// Resolved analyzer program
    pub fn analyzer_program(&self) -> String {
        self.resolve_program(self.analyzer.program_or(DEFAULT_ANALYZER))
    }

    /// Resolved compiler program
    pub fn compiler_program(&self) -> String {
        self.resolve_program(self.compiler.program_or(DEFAULT_COMPILER))
    }

    /// Resolve a bare program name against `java_home`, then `$JAVA_HOME`
    ///
    /// Names containing a path separator, and names not present under the
    /// JDK's `bin/`, are returned unchanged for `PATH` lookup.
    fn resolve_program(&self, program: &str) -> String {
        if program.contains(std::path::is_separator) {
            return program.to_string();
        }

        let home = self
            .java_home
            .clone()
            .or_else(|| std::env::var_os("JAVA_HOME").map(PathBuf::from));

        if let Some(home) = home {
            let candidate = home.join("bin").join(program);
            if candidate.is_file() {
                return candidate.to_string_lossy().into_owned();
            }
        }

        program.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = InjectConfig::default();
        assert_eq!(config.analyzer.program, "jdeps");
        assert_eq!(config.compiler.program, "javac");
        assert_eq!(config.tool_timeout_secs, DEFAULT_TOOL_TIMEOUT_SECS);
        assert_eq!(config.scratch_prefix, "tmpClassPath");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = InjectConfig::parse(
            r#"
tool_timeout_secs = 30

[compiler]
extra_args = ["--release", "11"]
"#,
        )
        .unwrap();

        assert_eq!(config.tool_timeout_secs, 30);
        assert_eq!(config.compiler.extra_args, vec!["--release", "11"]);
        assert_eq!(config.analyzer.program, "jdeps");
        assert!(config.compiler_program().ends_with("javac"));
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config = InjectConfig::new().with_timeout_secs(0);
        assert_eq!(config.tool_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_resolve_program_under_java_home() {
        let temp_dir = TempDir::new().unwrap();
        let bin = temp_dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("jdeps"), "").unwrap();

        let config = InjectConfig::new().with_java_home(temp_dir.path());
        assert_eq!(
            config.analyzer_program(),
            bin.join("jdeps").to_string_lossy()
        );
    }

    #[test]
    fn test_explicit_path_is_not_resolved() {
        let config = InjectConfig::new()
            .with_java_home("/nonexistent")
            .with_compiler("/opt/jdk/bin/javac");
        assert_eq!(config.compiler_program(), "/opt/jdk/bin/javac");
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = InjectConfig::load("/nonexistent/modinject.toml").unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
