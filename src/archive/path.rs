// src/archive/path.rs

//! Entry-name validation for extraction
//!
//! Entry names come from archives we did not build. Before an entry is
//! joined onto an extraction directory its name must resolve to a
//! descendant of that directory; names such as `../evil.class`,
//! `/etc/passwd` or `a/../../b` are rejected outright rather than
//! normalized.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Convert an archive entry name into a relative path
///
/// Both `/` and `\` are treated as separators so that archives built on
/// Windows cannot smuggle a traversal through a backslash.
pub fn entry_relative_path(name: &str) -> Result<PathBuf> {
    let unified = name.replace('\\', "/");

    if unified.starts_with('/') {
        return Err(Error::UnsafeEntryPath(name.to_string()));
    }

    let mut relative = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(c) => relative.push(c),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::UnsafeEntryPath(name.to_string()));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(Error::UnsafeEntryPath(name.to_string()));
    }

    Ok(relative)
}

/// Join an entry name onto `dest`, refusing anything that escapes it
pub fn safe_entry_path(dest: &Path, name: &str) -> Result<PathBuf> {
    let relative = entry_relative_path(name)?;
    let joined = dest.join(&relative);

    // The lexical check above already guarantees this; the canonical check
    // catches a destination reached through a symlinked parent.
    if !joined.starts_with(dest) {
        return Err(Error::UnsafeEntryPath(name.to_string()));
    }
    if let (Ok(root), Some(parent)) = (dest.canonicalize(), joined.parent())
        && let Ok(parent) = parent.canonicalize()
        && !parent.starts_with(&root)
    {
        return Err(Error::UnsafeEntryPath(name.to_string()));
    }

    Ok(joined)
}

/// Archive entry name for a file relative to a source directory
///
/// Entry names always use forward slashes regardless of host.
pub fn entry_name_for(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normal_names_accepted() {
        assert_eq!(
            entry_relative_path("com/example/Foo.class").unwrap(),
            PathBuf::from("com/example/Foo.class")
        );
        assert_eq!(
            entry_relative_path("./META-INF/MANIFEST.MF").unwrap(),
            PathBuf::from("META-INF/MANIFEST.MF")
        );
        assert_eq!(
            entry_relative_path("com/example/").unwrap(),
            PathBuf::from("com/example")
        );
    }

    #[test]
    fn test_traversal_rejected() {
        for name in [
            "../evil.class",
            "com/../../evil.class",
            "/etc/passwd",
            "..\\..\\evil.class",
            "",
            ".",
        ] {
            assert!(
                matches!(entry_relative_path(name), Err(Error::UnsafeEntryPath(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_safe_entry_path_stays_under_dest() {
        let temp_dir = TempDir::new().unwrap();
        let joined = safe_entry_path(temp_dir.path(), "a/b/C.class").unwrap();
        assert!(joined.starts_with(temp_dir.path()));
        assert!(safe_entry_path(temp_dir.path(), "a/../../C.class").is_err());
    }

    #[test]
    fn test_entry_name_uses_forward_slashes() {
        let relative: PathBuf = ["com", "example", "Foo.class"].iter().collect();
        assert_eq!(entry_name_for(&relative), "com/example/Foo.class");
    }
}
