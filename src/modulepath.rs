// src/modulepath.rs

//! Dependency archives and the module path built from them

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Ordered archives the target depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    archives: Vec<PathBuf>,
}

impl DependencySet {
    pub fn new<I, P>(archives: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            archives: archives.into_iter().map(Into::into).collect(),
        }
    }

    /// An empty set: the analyzer sees only the platform modules
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    pub fn archives(&self) -> &[PathBuf] {
        &self.archives
    }

    /// Archives that do not exist on disk
    pub fn missing(&self) -> Vec<&Path> {
        self.archives
            .iter()
            .filter(|p| !p.exists())
            .map(PathBuf::as_path)
            .collect()
    }

    /// Archives joined with the host path-list separator, or `None` if empty
    pub fn module_path(&self) -> Result<Option<OsString>> {
        if self.archives.is_empty() {
            return Ok(None);
        }
        std::env::join_paths(&self.archives)
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid dependency archive path: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_has_no_module_path() {
        assert_eq!(DependencySet::empty().module_path().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_module_path_uses_host_separator() {
        let deps = DependencySet::new(["/libs/a.jar", "/libs/b.jar"]);
        assert_eq!(
            deps.module_path().unwrap(),
            Some(OsString::from("/libs/a.jar:/libs/b.jar"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_separator_inside_path_is_rejected() {
        let deps = DependencySet::new(["/libs/a:b.jar"]);
        assert!(deps.module_path().is_err());
    }
}
