//! Parallel extraction of a whole drop.
//!
//! Every archive owns a distinct destination folder, so workers share nothing.
//! The pool is bounded by the configured worker count and the `collect` inside
//! `install` is the join point: when [`extract_archives`] returns, every
//! extraction has finished or failed and been logged.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info};

use super::{destination_for, discover_archives, extract_archive};
use crate::StagerError;

/// Outcome of one archive.
#[derive(Debug)]
pub struct ExtractedArchive {
    pub archive: PathBuf,
    pub destination: PathBuf,
    /// Number of files written, or why extraction failed.
    pub outcome: Result<usize, String>,
}

impl ExtractedArchive {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Extracts every archive in `source_dir` and returns the destination folders,
/// one per archive found, in archive-name order. Failed archives still
/// contribute their (possibly empty) folder.
pub fn extract_all(source_dir: &Path, output_root: &Path, workers: usize) -> Vec<PathBuf> {
    extract_archives(source_dir, output_root, workers)
        .into_iter()
        .map(|x| x.destination)
        .collect()
}

/// Reporting variant of [`extract_all`].
pub fn extract_archives(source_dir: &Path, output_root: &Path, workers: usize) -> Vec<ExtractedArchive> {
    if !source_dir.is_dir() {
        error!(folder = %source_dir.display(), "source folder does not exist");
        return Vec::new();
    }

    let archives = match discover_archives(source_dir) {
        Ok(a) => a,
        Err(e) => {
            error!(folder = %source_dir.display(), error = %e, "could not list archives");
            return Vec::new();
        }
    };
    if archives.is_empty() {
        info!(folder = %source_dir.display(), "no archives found");
        return Vec::new();
    }

    let workers = workers.max(1).min(archives.len());
    info!(archives = archives.len(), workers, "extracting archives");

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("extract-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            error!(error = %StagerError::from(e), "falling back to sequential extraction");
            None
        }
    };

    let run_one = |archive: &PathBuf| extract_one(archive, output_root);
    match pool {
        Some(pool) => pool.install(|| archives.par_iter().map(run_one).collect::<Vec<_>>()),
        None => archives.iter().map(run_one).collect(),
    }
}

fn extract_one(archive: &Path, output_root: &Path) -> ExtractedArchive {
    let destination = destination_for(archive, output_root);

    // The folder exists even when the archive turns out to be unreadable.
    let outcome = fs::create_dir_all(&destination)
        .map_err(StagerError::io(&destination))
        .and_then(|_| extract_archive(archive, &destination));

    let outcome = match outcome {
        Ok(files) => {
            info!(archive = %archive.display(), dest = %destination.display(), files, "extracted archive");
            Ok(files)
        }
        Err(e) => {
            error!(archive = %archive.display(), error = %e, "error processing archive");
            Err(e.to_string())
        }
    };

    ExtractedArchive {
        archive: archive.to_path_buf(),
        destination,
        outcome,
    }
}
