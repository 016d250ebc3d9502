//! Common utilities and types module.
// Shared helpers for directory listing and file-name matching.

use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::StagerError;

/// Glob that selects every file whose name contains an extension.
pub const ANY_FILE_GLOB: &str = "*.*";

/// A shell-style file-name glob (`*` and `?` wildcards), matched
/// case-insensitively against the file name only.
#[derive(Debug, Clone)]
pub struct FilePattern {
    glob: String,
    regex: Regex,
}

impl FilePattern {
    pub fn new(glob: &str) -> Result<Self, StagerError> {
        let mut expr = String::with_capacity(glob.len() * 2 + 6);
        expr.push_str("(?i)^");
        for ch in glob.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|source| StagerError::Pattern {
            pattern: glob.to_string(),
            source,
        })?;
        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.regex.is_match(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}

/// Regular files directly inside `dir` whose names match `pattern`, sorted by name.
///
/// Directory enumeration order is filesystem dependent, so callers always get
/// the explicit sort.
pub fn list_files(dir: &Path, pattern: &FilePattern) -> Result<Vec<PathBuf>, StagerError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| StagerError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && pattern.matches(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_file_glob_requires_a_dot() {
        let p = FilePattern::new(ANY_FILE_GLOB).unwrap();
        assert!(p.matches(Path::new("/x/a.txt")));
        assert!(p.matches(Path::new("archive.tar.gz")));
        assert!(!p.matches(Path::new("/x/2024-06-01_001")));
    }

    #[test]
    fn extension_glob_is_case_insensitive_and_literal() {
        let p = FilePattern::new("*.txt").unwrap();
        assert!(p.matches(Path::new("REPORT.TXT")));
        assert!(!p.matches(Path::new("reportXtxt")));
        assert!(!p.matches(Path::new("report.txt.bak")));

        let q = FilePattern::new("inv_??.csv").unwrap();
        assert!(q.matches(Path::new("inv_01.csv")));
        assert!(!q.matches(Path::new("inv_1.csv")));
    }

    #[test]
    fn list_files_skips_directories_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.txt", "a.txt", "b.log"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.dir")).unwrap();

        let all = list_files(dir.path(), &FilePattern::new(ANY_FILE_GLOB).unwrap()).unwrap();
        let names: Vec<_> = all
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.txt", "b.log", "c.txt"]);
    }
}
