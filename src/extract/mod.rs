//! # Extraction Module
//!
//! Finds the `*.zip` drops in a source directory and unpacks each one into
//! `output_root/<archive stem>`. One archive is handled by [`extract_archive`];
//! the whole drop goes through the bounded worker pool in [`parallel`].

mod parallel;

pub use parallel::{extract_all, extract_archives, ExtractedArchive};

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::StagerError;

/// Extension of the archives picked up from the source directory.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Archives directly inside `source_dir`, sorted by name.
pub fn discover_archives(source_dir: &Path) -> Result<Vec<PathBuf>, StagerError> {
    let mut archives = Vec::new();
    for entry in WalkDir::new(source_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| StagerError::Io {
            path: source_dir.to_path_buf(),
            source: e.into(),
        })?;
        let is_zip = entry
            .path()
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
        if entry.file_type().is_file() && is_zip {
            archives.push(entry.into_path());
        }
    }
    archives.sort();
    Ok(archives)
}

/// Folder an archive is extracted into: `output_root/<stem>`.
pub fn destination_for(archive: &Path, output_root: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "extracted".into());
    output_root.join(stem)
}

/// Extracts every entry of `archive` below `dest` and returns the number of
/// files written.
///
/// Entries whose names would land outside `dest` are skipped.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, StagerError> {
    let zip_err = |source| StagerError::Zip {
        archive: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(StagerError::io(archive))?;
    let mut zip = zip::ZipArchive::new(file).map_err(zip_err)?;

    let mut count = 0usize;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(zip_err)?;

        let relative = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                warn!(archive = %archive.display(), entry = entry.name(), "skipping entry with unsafe path");
                continue;
            }
        };
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(StagerError::io(&target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(StagerError::io(parent))?;
        }
        let mut out = File::create(&target).map_err(StagerError::io(&target))?;
        io::copy(&mut entry, &mut out).map_err(StagerError::io(&target))?;
        count += 1;
    }

    debug!(archive = %archive.display(), files = count, "archive unpacked");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zw = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            zw.start_file(*name, FileOptions::default()).unwrap();
            zw.write_all(data.as_bytes()).unwrap();
        }
        zw.finish().unwrap();
    }

    #[test]
    fn discover_only_zip_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.zip", "A.ZIP", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.zip")).unwrap();

        let found = discover_archives(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["A.ZIP", "b.zip"]);
    }

    #[test]
    fn destination_uses_archive_stem() {
        let dest = destination_for(Path::new("/drops/Report.zip"), Path::new("/out"));
        assert_eq!(dest, PathBuf::from("/out/Report"));
    }

    #[test]
    fn extract_writes_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("inv.zip");
        write_zip(&archive, &[("a.txt", "alpha"), ("sub/b.txt", "beta")]);
        let dest = dir.path().join("inv");
        fs::create_dir(&dest).unwrap();

        let n = extract_archive(&archive, &dest).unwrap();
        assert_eq!(n, 2);
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(dest.join("sub/b.txt")).unwrap(), b"beta");
    }

    #[test]
    fn corrupt_archive_is_a_zip_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("Report.zip");
        fs::write(&archive, b"this is not a zip file").unwrap();

        let err = extract_archive(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, StagerError::Zip { .. }));
    }
}
