// src/inject/backup.rs

//! Safety backup of the target archive
//!
//! Backups are named `<archive>.bak`, then `<archive>1.bak`, `<archive>2.bak`
//! and so on. A backup is created with create-new semantics, so an existing
//! backup is never overwritten, and is verified against the archive by
//! SHA-256 before the archive is touched.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Candidate backup path for the given attempt number
pub fn backup_candidate(archive: &Path, count: usize) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    if count > 0 {
        name.push(count.to_string());
    }
    name.push(".bak");
    PathBuf::from(name)
}

/// Copy `archive` to the first unused backup name and verify it
pub fn backup_archive(archive: &Path) -> Result<PathBuf> {
    let mut source = File::open(archive).map_err(|e| Error::BackupFailed {
        path: backup_candidate(archive, 0),
        reason: format!("cannot read {}: {}", archive.display(), e),
    })?;

    let mut count = 0;
    let (path, mut backup) = loop {
        let candidate = backup_candidate(archive, count);
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => break (candidate, file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => count += 1,
            Err(e) => {
                return Err(Error::BackupFailed {
                    path: candidate,
                    reason: e.to_string(),
                });
            }
        }
    };

    let failed = |reason: String| Error::BackupFailed {
        path: path.clone(),
        reason,
    };

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = source.read(&mut buf).map_err(|e| failed(e.to_string()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        backup
            .write_all(&buf[..n])
            .map_err(|e| failed(e.to_string()))?;
    }
    backup.sync_all().map_err(|e| failed(e.to_string()))?;
    drop(backup);

    let expected = hex::encode(hasher.finalize());
    let actual = sha256_file(&path).map_err(|e| failed(e.to_string()))?;
    if expected != actual {
        return Err(failed(format!(
            "checksum mismatch: archive {} backup {}",
            expected, actual
        )));
    }

    info!("Backed up {} to {}", archive.display(), path.display());
    Ok(path)
}

/// SHA-256 of a file as lowercase hex
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_backup_candidates() {
        let archive = Path::new("/libs/lib.jar");
        assert_eq!(backup_candidate(archive, 0), PathBuf::from("/libs/lib.jar.bak"));
        assert_eq!(backup_candidate(archive, 2), PathBuf::from("/libs/lib.jar2.bak"));
    }

    #[test]
    fn test_backups_never_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("lib.jar");
        fs::write(&archive, b"first").unwrap();

        let first = backup_archive(&archive).unwrap();
        fs::write(&archive, b"second").unwrap();
        let second = backup_archive(&archive).unwrap();

        assert_eq!(first, temp_dir.path().join("lib.jar.bak"));
        assert_eq!(second, temp_dir.path().join("lib.jar1.bak"));
        assert_eq!(fs::read(&first).unwrap(), b"first");
        assert_eq!(fs::read(&second).unwrap(), b"second");
    }

    #[test]
    fn test_backup_of_missing_archive_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = backup_archive(&temp_dir.path().join("missing.jar")).unwrap_err();
        assert!(matches!(err, Error::BackupFailed { .. }));
        assert!(!temp_dir.path().join("missing.jar.bak").exists());
    }
}
