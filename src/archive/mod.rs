// src/archive/mod.rs

//! Archive accessor for zip-compatible containers (jar files)
//!
//! Read operations open the archive once and never load payloads they do
//! not need. Write operations never read and write the same path through
//! overlapping handles: an in-place edit renames the archive aside, streams
//! the kept entries into a fresh file at the original path, appends the new
//! entries, and only then deletes the aside copy. If anything fails after
//! the rename, the fresh file is discarded and the aside copy is renamed
//! back, so callers observe either the old archive or the new one.

pub mod path;

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Manifest entry, written first when rebuilding a jar
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// Suffix of the aside copy held during an in-place rewrite
const ASIDE_SUFFIX: &str = "modinject-old";

/// A file to be added to an archive under the given entry name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Entry name inside the archive
    pub name: String,
    /// File whose bytes become the entry payload
    pub source: PathBuf,
}

impl NewEntry {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

fn open(archive: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(archive).map_err(|e| Error::ArchiveUnreadable {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })?;
    ZipArchive::new(file).map_err(|e| unreadable(archive, e))
}

fn unreadable(archive: &Path, e: ZipError) -> Error {
    Error::ArchiveUnreadable {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    }
}

fn extraction_failed(archive: &Path, reason: impl ToString) -> Error {
    Error::ExtractionFailed {
        path: archive.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn patch_failed(archive: &Path, reason: impl ToString) -> Error {
    Error::PatchFailed {
        path: archive.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn entry_options() -> FileOptions {
    FileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// List entry names in archive order without reading payloads
pub fn list_entries(archive: &Path) -> Result<Vec<String>> {
    let mut zip = open(archive)?;
    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip.by_index_raw(i).map_err(|e| unreadable(archive, e))?;
        names.push(entry.name().to_string());
    }
    Ok(names)
}

/// Check whether an entry with exactly this name exists
pub fn contains_entry(archive: &Path, name: &str) -> Result<bool> {
    Ok(list_entries(archive)?.iter().any(|n| n == name))
}

/// Read a named entry as text
///
/// Returns `Ok(None)` when the entry is absent; only an unreadable archive
/// is an error. Invalid UTF-8 is replaced rather than rejected since the
/// text is only ever shown to a person.
pub fn read_entry_text(archive: &Path, name: &str) -> Result<Option<String>> {
    let mut zip = open(archive)?;
    let mut entry = match zip.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(unreadable(archive, e)),
    };

    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| Error::ArchiveUnreadable {
            path: archive.to_path_buf(),
            reason: format!("failed to read {}: {}", name, e),
        })?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Extract every entry into `dest`, returning the number of files written
///
/// All entry names are validated before anything is written, so an archive
/// with a single escaping name writes nothing at all. Directory entries only
/// create directories. A failure part-way through leaves a partial tree in
/// `dest`; callers always extract into a fresh directory.
pub fn extract_all(archive: &Path, dest: &Path) -> Result<usize> {
    let mut zip = open(archive)?;
    fs::create_dir_all(dest).map_err(|e| extraction_failed(archive, e))?;

    let mut plan = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip.by_index_raw(i).map_err(|e| unreadable(archive, e))?;
        let target = match path::safe_entry_path(dest, entry.name()) {
            Ok(target) => target,
            Err(e) => {
                warn!("Refusing to extract {}: unsafe entry {:?}", archive.display(), entry.name());
                return Err(e);
            }
        };
        plan.push((i, target, entry.is_dir()));
    }

    let mut written = 0;
    for (i, target, is_dir) in plan {
        if is_dir {
            fs::create_dir_all(&target).map_err(|e| extraction_failed(archive, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| extraction_failed(archive, e))?;
        }

        let mut entry = zip.by_index(i).map_err(|e| extraction_failed(archive, e))?;
        let mut out = File::create(&target).map_err(|e| extraction_failed(archive, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| {
            extraction_failed(archive, format!("{}: {}", target.display(), e))
        })?;
        written += 1;
    }

    debug!("Extracted {} files from {} into {}", written, archive.display(), dest.display());
    Ok(written)
}

/// Delete a single entry in place
pub fn remove_entry(archive: &Path, name: &str) -> Result<()> {
    if !contains_entry(archive, name)? {
        return Err(Error::EntryNotFound {
            archive: archive.to_path_buf(),
            name: name.to_string(),
        });
    }

    rewrite_in_place(archive, |entry| entry != name, &[])?;
    info!("Removed {} from {}", name, archive.display());
    Ok(())
}

/// Delete every present entry among `names` in one rewrite
///
/// Absent names are ignored. Returns how many entries were removed; the
/// archive is left untouched when none of the names is present.
pub fn remove_entries(archive: &Path, names: &[&str]) -> Result<usize> {
    let present: HashSet<String> = list_entries(archive)?
        .into_iter()
        .filter(|e| names.contains(&e.as_str()))
        .collect();
    if present.is_empty() {
        return Ok(0);
    }

    rewrite_in_place(archive, |entry| !present.contains(entry), &[])?;
    info!("Removed {} entries from {}", present.len(), archive.display());
    Ok(present.len())
}

/// Rewrite the archive with `new_entries` shadowing same-named originals
///
/// Every original entry whose name matches a new entry is dropped, then the
/// new entries are appended. Nothing is merged.
pub fn replace_entries(archive: &Path, new_entries: &[NewEntry]) -> Result<()> {
    let shadowed: HashSet<&str> = new_entries.iter().map(|e| e.name.as_str()).collect();
    rewrite_in_place(archive, |entry| !shadowed.contains(entry), new_entries)?;
    info!(
        "Patched {} with {} new entries",
        archive.display(),
        new_entries.len()
    );
    Ok(())
}

/// Build a brand-new archive from every file and directory under `source_dir`
///
/// Entry names are paths relative to `source_dir` with forward slashes;
/// directories become `name/` entries. `META-INF/` and the manifest, if
/// present, are written first, everything else in name order. The archive is
/// written to a temporary file beside `dest_archive` and renamed over it, so
/// `dest_archive` never holds a partial archive.
pub fn rebuild_from_directory(dest_archive: &Path, source_dir: &Path) -> Result<usize> {
    let mut files = Vec::new();
    for entry in WalkDir::new(source_dir).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| patch_failed(dest_archive, e))?;
        let is_dir = entry.file_type().is_dir();
        if !is_dir && !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| patch_failed(dest_archive, e))?;
        let mut name = path::entry_name_for(relative);
        if is_dir {
            name.push('/');
        }
        files.push((name, entry.path().to_path_buf(), is_dir));
    }
    files.sort_by(|(a, _, _), (b, _, _)| {
        rebuild_rank(a)
            .cmp(&rebuild_rank(b))
            .then_with(|| a.cmp(b))
    });

    let parent = match dest_archive.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| patch_failed(dest_archive, e))?;

    {
        let mut zout = ZipWriter::new(tmp.as_file_mut());
        for (name, source, is_dir) in &files {
            if *is_dir {
                zout.add_directory(name.as_str(), entry_options())
                    .map_err(|e| patch_failed(dest_archive, e))?;
                continue;
            }
            zout.start_file(name.as_str(), entry_options())
                .map_err(|e| patch_failed(dest_archive, e))?;
            let mut input = File::open(source).map_err(|e| patch_failed(dest_archive, e))?;
            io::copy(&mut input, &mut zout).map_err(|e| patch_failed(dest_archive, e))?;
        }
        zout.finish().map_err(|e| patch_failed(dest_archive, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| patch_failed(dest_archive, e))?;

    tmp.persist(dest_archive)
        .map_err(|e| patch_failed(dest_archive, e.error))?;

    info!(
        "Rebuilt {} from {} ({} entries)",
        dest_archive.display(),
        source_dir.display(),
        files.len()
    );
    Ok(files.len())
}

fn rebuild_rank(name: &str) -> u8 {
    match name {
        "META-INF/" => 0,
        MANIFEST_ENTRY => 1,
        _ => 2,
    }
}

fn aside_path(archive: &Path) -> PathBuf {
    let mut name = archive
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(ASIDE_SUFFIX);
    archive.with_file_name(name)
}

/// Rename aside, stream kept entries into a new file, append, drop aside
fn rewrite_in_place(
    archive: &Path,
    keep: impl Fn(&str) -> bool,
    append: &[NewEntry],
) -> Result<()> {
    // Fail before touching anything if an appended source is missing.
    for entry in append {
        if !entry.source.is_file() {
            return Err(patch_failed(
                archive,
                format!("new entry source missing: {}", entry.source.display()),
            ));
        }
    }

    let aside = aside_path(archive);
    if aside.exists() {
        return Err(patch_failed(
            archive,
            format!("leftover rewrite copy exists: {}", aside.display()),
        ));
    }

    fs::rename(archive, &aside).map_err(|e| {
        patch_failed(
            archive,
            format!("could not move archive aside to {}: {}", aside.display(), e),
        )
    })?;
    debug!("Moved {} aside to {}", archive.display(), aside.display());

    match write_filtered(&aside, archive, &keep, append) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(&aside) {
                warn!("Failed to remove {}: {}", aside.display(), e);
            }
            Ok(())
        }
        Err(e) => {
            if let Err(remove) = fs::remove_file(archive)
                && remove.kind() != io::ErrorKind::NotFound
            {
                warn!(
                    "Failed to remove partial rewrite of {}: {}",
                    archive.display(),
                    remove
                );
            }
            if let Err(restore) = fs::rename(&aside, archive) {
                return Err(patch_failed(
                    archive,
                    format!(
                        "{}; original could not be restored and remains at {}: {}",
                        e,
                        aside.display(),
                        restore
                    ),
                ));
            }
            Err(patch_failed(archive, e))
        }
    }
}

fn write_filtered(
    source: &Path,
    dest: &Path,
    keep: &impl Fn(&str) -> bool,
    append: &[NewEntry],
) -> Result<()> {
    let mut zin = open(source)?;

    let output = OpenOptions::new().write(true).create_new(true).open(dest)?;
    let mut zout = ZipWriter::new(BufWriter::new(output));

    for i in 0..zin.len() {
        let entry = zin.by_index_raw(i).map_err(|e| unreadable(source, e))?;
        if !keep(entry.name()) {
            debug!("Dropping entry {}", entry.name());
            continue;
        }
        zout.raw_copy_file(entry).map_err(io::Error::from)?;
    }

    for entry in append {
        zout.start_file(entry.name.as_str(), entry_options())
            .map_err(io::Error::from)?;
        let mut input = File::open(&entry.source)?;
        io::copy(&mut input, &mut zout)?;
    }

    let mut writer = zout.finish().map_err(io::Error::from)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}
