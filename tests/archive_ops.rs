// tests/archive_ops.rs

//! Archive accessor behaviour on real zip files.

mod common;

use common::*;
use modinject::archive::{self, NewEntry};
use modinject::Error;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_backslash_and_absolute_names_are_refused() {
    for name in ["..\\..\\evil.class", "/etc/evil.class", "a/../../evil.class"] {
        let temp_dir = TempDir::new().unwrap();
        let jar = temp_dir.path().join("lib.jar");
        write_jar(&jar, &[("ok/A.class", b"A"), (name, b"evil")]);

        let dest = temp_dir.path().join("out").join("classes");
        let err = archive::extract_all(&jar, &dest).unwrap_err();

        assert!(matches!(err, Error::UnsafeEntryPath(_)), "{} accepted", name);
        assert!(!dest.join("ok/A.class").exists());
        assert!(!temp_dir.path().join("evil.class").exists());
    }
}

#[test]
fn test_rewrite_refuses_leftover_aside_copy() {
    let temp_dir = TempDir::new().unwrap();
    let jar = sample_jar(temp_dir.path());
    let original = fs::read(&jar).unwrap();
    fs::write(temp_dir.path().join("lib.jar.modinject-old"), b"stale").unwrap();

    let err = archive::remove_entry(&jar, "com/example/api/Client.class").unwrap_err();

    assert!(matches!(err, Error::PatchFailed { .. }));
    assert_eq!(fs::read(&jar).unwrap(), original);
}

#[test]
fn test_shadow_keeps_unrelated_entries_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let jar = sample_jar(temp_dir.path());
    let before = read_files(&jar);

    let replacement = temp_dir.path().join("messages.properties");
    fs::write(&replacement, b"greeting=bonjour\n").unwrap();
    archive::replace_entries(
        &jar,
        &[NewEntry::new("com/example/api/messages.properties", &replacement)],
    )
    .unwrap();

    let after = read_files(&jar);
    assert_eq!(after.len(), before.len());
    for (name, bytes) in &before {
        let now = read_file(&jar, name).unwrap();
        if name.ends_with("messages.properties") {
            assert_eq!(now, b"greeting=bonjour\n");
        } else {
            assert_eq!(&now, bytes, "{} changed", name);
        }
    }
    // Shadowed entry moves to the end
    assert_eq!(after.last().unwrap().0, "com/example/api/messages.properties");
    assert!(!temp_dir.path().join("lib.jar.modinject-old").exists());
}

#[test]
fn test_remove_absent_entry() {
    let temp_dir = TempDir::new().unwrap();
    let jar = sample_jar(temp_dir.path());

    let err = archive::remove_entry(&jar, "module-info.class").unwrap_err();
    assert!(matches!(err, Error::EntryNotFound { .. }));
    assert_eq!(err.kind(), "entry_not_found");
}
