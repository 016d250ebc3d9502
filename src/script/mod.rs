//! # Load Script Generation
//!
//! Writes `DJ.bat` into a batch folder: one command line per staged file.
//! Spreadsheets are loaded with `DJENGINE`, everything else goes through the
//! deployed SSIS package via `DTExec.exe`.
//!
//! A spreadsheet line logs to the source path with its extension replaced by
//! `.err` (`costs.xlsx` logs to `costs.err`), so the log never overwrites the
//! workbook being loaded.
//!
//! Rendering is pure. The same files and [`LoadTarget`] always give the same
//! bytes; table provisioning lives in [`crate::preflight`].

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::common::{list_files, FilePattern};
use crate::StagerError;

/// Fixed name of the generated script in every batch folder.
pub const SCRIPT_FILE_NAME: &str = "DJ.bat";

/// Batch files are consumed by `cmd.exe`.
const LINE_ENDING: &str = "\r\n";

/// Where and how the staged files are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    pub database: String,
    pub server: String,
    /// Server hosting the SSIS catalog.
    pub deployed_server: String,
    /// SSIS package path or DJENGINE map file.
    pub template_path: String,
    pub dtexec_path: String,
    /// Worksheet read from spreadsheet sources.
    pub sheet_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Spreadsheet,
    Delimited,
}

impl FileKind {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xls") => {
                FileKind::Spreadsheet
            }
            _ => FileKind::Delimited,
        }
    }
}

/// Destination table for a staged file: its stem.
pub fn table_name(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The command line that loads `file` into `target`.
pub fn render_line(file: &Path, target: &LoadTarget) -> String {
    let full = file.display();
    let name = table_name(file);

    match FileKind::of(file) {
        FileKind::Spreadsheet => {
            let log = file.with_extension("err");
            format!(
                "DJENGINE -l \"{log}\" -sc \"Database='{full}' ; Table='{sheet}'\" \
                 -tc \"Server='{server}';Database='{db}';Table='dbo.{name}'\" \"{map}\"",
                log = log.display(),
                sheet = target.sheet_name,
                server = target.server,
                db = target.database,
                map = target.template_path,
            )
        }
        FileKind::Delimited => format!(
            "\"{dtexec}\" /ISServer \"{map}\" /server \"{deployed}\" \
             /SET \"\\Package.Variables[User::SrcConnectionString].Properties[Value];'{full}'\" \
             /SET \"\\Package.Variables[User::DstServerName].Properties[Value];'{server}'\" \
             /SET \"\\Package.Variables[User::DstDatabaseName].Properties[Value];'{db}'\" \
             /SET \"\\Package.Variables[User::DstTableName].Properties[Value];'dbo.{name}'\"",
            dtexec = target.dtexec_path,
            map = target.template_path,
            deployed = target.deployed_server,
            server = target.server,
            db = target.database,
        ),
    }
}

/// Replaces every non-ASCII character with `?`. Returns whether anything changed.
fn to_ascii_lossy(line: &str) -> (String, bool) {
    if line.is_ascii() {
        return (line.to_string(), false);
    }
    let out = line.chars().map(|c| if c.is_ascii() { c } else { '?' }).collect();
    (out, true)
}

/// Files in `folder` a load line is written for, sorted by name.
pub fn matching_files(folder: &Path, pattern: &FilePattern) -> Result<Vec<PathBuf>, StagerError> {
    let mut files = list_files(folder, pattern)?;
    files.retain(|f| f.file_name().map_or(true, |n| n != SCRIPT_FILE_NAME));
    Ok(files)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub path: PathBuf,
    pub lines: usize,
}

/// Rebuilds `folder/DJ.bat` with one line per file matching `pattern`.
///
/// Returns `None` when the folder is missing or nothing matches; in both cases
/// no script is left behind.
pub fn generate_script(
    folder: &Path,
    target: &LoadTarget,
    pattern: &FilePattern,
) -> Result<Option<GeneratedScript>, StagerError> {
    if !folder.is_dir() {
        error!(folder = %folder.display(), "folder does not exist");
        return Ok(None);
    }

    let script = folder.join(SCRIPT_FILE_NAME);
    match fs::remove_file(&script) {
        Ok(()) => debug!(script = %script.display(), "removed previous script"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(StagerError::Io { source: e, path: script }),
    }

    let files = matching_files(folder, pattern)?;
    if files.is_empty() {
        info!(folder = %folder.display(), pattern = pattern.as_str(), "no matching files, no script written");
        return Ok(None);
    }

    let handle = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&script)
        .map_err(StagerError::io(&script))?;
    let mut out = BufWriter::new(handle);

    for file in &files {
        let (line, replaced) = to_ascii_lossy(&render_line(file, target));
        if replaced {
            warn!(file = %file.display(), "non-ASCII characters replaced with '?' in load line");
        }
        write!(out, "{}{}", line, LINE_ENDING).map_err(StagerError::io(&script))?;
        info!(file = %file.display(), "generated load line");
    }
    out.flush().map_err(StagerError::io(&script))?;

    Ok(Some(GeneratedScript {
        path: script,
        lines: files.len(),
    }))
}
