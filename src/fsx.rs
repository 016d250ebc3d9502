//! Cross-platform filesystem helpers.
//!
//! Batch folders usually live on the same volume as the extracted files, so a
//! move is a plain rename. When the output root sits on another share the
//! rename fails with a cross-device error and we fall back to copy + remove.

use std::fs;
use std::io;
use std::path::Path;

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

/// Moves `from` to `to`. Both paths name files, not directories.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_file_relocates_contents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        let dst_dir = dir.path().join("batch");
        fs::create_dir(&dst_dir).unwrap();
        fs::write(&src, b"payload").unwrap();

        move_file(&src, &dst_dir.join("a.txt")).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(dst_dir.join("a.txt")).unwrap(), b"payload");
    }

    #[test]
    fn move_file_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = move_file(&dir.path().join("nope"), &dir.path().join("x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
