// src/workspace/mod.rs

//! Scratch workspace next to the target archive
//!
//! Layout under `<archive dir>/<prefix>-<archive file name>/`:
//!
//! - `classes/`   extracted archive contents, also the compiler's class output
//! - `generated/` analyzer output directory
//! - `src/module-info.java` descriptor source while it is compiled and repaired
//!
//! The root name is derived from the archive path, so two concurrent runs
//! against the same archive collide on `create_dir` and the second one fails
//! with `ScratchInUse` instead of sharing the directory. The whole tree is
//! removed when the workspace is dropped.

use crate::descriptor::MODULE_INFO_SOURCE;
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A scratch directory tree owned by one injection run
#[derive(Debug)]
pub struct ScratchWorkspace {
    root: PathBuf,
    removed: bool,
}

impl ScratchWorkspace {
    /// Allocate the scratch tree for `archive` in the archive's directory
    pub fn acquire(archive: &Path, prefix: &str) -> Result<Self> {
        let base = match archive.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());

        Self::acquire_in(&base, &format!("{}-{}", prefix, file_name))
    }

    /// Allocate a scratch tree named `name` under `base_dir`
    pub fn acquire_in(base_dir: &Path, name: &str) -> Result<Self> {
        let root = base_dir.join(name);

        match fs::create_dir(&root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::ScratchInUse(root));
            }
            Err(e) => return Err(e.into()),
        }

        let workspace = Self {
            root,
            removed: false,
        };
        fs::create_dir(workspace.classes_dir())?;
        fs::create_dir(workspace.generated_dir())?;
        if let Some(parent) = workspace.source_path().parent() {
            fs::create_dir_all(parent)?;
        }

        debug!("Acquired scratch workspace {}", workspace.root.display());
        Ok(workspace)
    }

    /// Root of the scratch tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extraction directory
    pub fn classes_dir(&self) -> PathBuf {
        self.root.join("classes")
    }

    /// Analyzer output directory
    pub fn generated_dir(&self) -> PathBuf {
        self.root.join("generated")
    }

    /// Descriptor source path
    pub fn source_path(&self) -> PathBuf {
        self.root.join("src").join(MODULE_INFO_SOURCE)
    }

    /// Remove the scratch tree now, reporting failure
    pub fn cleanup(mut self) -> Result<()> {
        self.removed = true;
        remove_tree(&self.root)?;
        debug!("Removed scratch workspace {}", self.root.display());
        Ok(())
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match remove_tree(&self.root) {
            Ok(()) => debug!("Removed scratch workspace {}", self.root.display()),
            Err(e) => warn!(
                "Failed to remove scratch workspace {}: {}",
                self.root.display(),
                e
            ),
        }
    }
}

/// Recursively delete a file or directory; a missing path is not an error
pub fn remove_tree(path: &Path) -> io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_layout_and_drop_removes_it() {
        let temp_dir = TempDir::new().unwrap();
        let jar = temp_dir.path().join("lib.jar");

        let root = {
            let workspace = ScratchWorkspace::acquire(&jar, "tmpClassPath").unwrap();
            assert_eq!(workspace.root(), temp_dir.path().join("tmpClassPath-lib.jar"));
            assert!(workspace.classes_dir().is_dir());
            assert!(workspace.generated_dir().is_dir());
            assert!(workspace.source_path().parent().unwrap().is_dir());
            workspace.root().to_path_buf()
        };

        assert!(!root.exists());
    }

    #[test]
    fn test_second_acquire_is_detected() {
        let temp_dir = TempDir::new().unwrap();
        let jar = temp_dir.path().join("lib.jar");

        let _first = ScratchWorkspace::acquire(&jar, "tmpClassPath").unwrap();
        let second = ScratchWorkspace::acquire(&jar, "tmpClassPath");
        assert!(matches!(second, Err(Error::ScratchInUse(_))));
    }

    #[test]
    fn test_cleanup_tolerates_already_deleted_source() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = ScratchWorkspace::acquire_in(temp_dir.path(), "scratch").unwrap();
        let root = workspace.root().to_path_buf();

        remove_tree(&workspace.source_path()).unwrap();
        remove_tree(&root.join("generated")).unwrap();
        workspace.cleanup().unwrap();

        assert!(!root.exists());
        remove_tree(&root).unwrap();
    }
}
