//! # Batch Partitioning
//!
//! Splits the files of an extracted folder into fixed-size batch folders.
//!
//! ## Strategy
//!
//! 1. List the files directly inside the folder and sort them by name.
//! 2. Cut the sorted list into contiguous chunks of `files_per_dir`; only the
//!    last chunk may be short.
//! 3. Create one folder per chunk, named `<date>_<NNN>`, and move the files in.
//!
//! There is no rollback: if a move fails, files already moved stay in their
//! batch folder and the error is returned.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::common::{list_files, FilePattern, ANY_FILE_GLOB};
use crate::{fsx, StagerError};

/// Cuts `files` into consecutive batches of at most `files_per_dir` entries.
///
/// Panics if `files_per_dir` is zero.
pub fn plan_batches<T: Clone>(files: &[T], files_per_dir: usize) -> Vec<Vec<T>> {
    files.chunks(files_per_dir).map(<[T]>::to_vec).collect()
}

/// Name of the `index`-th (1-based) batch folder.
///
/// The index is zero-padded to three digits so names sort in batch order;
/// past 999 it simply grows wider.
pub fn batch_dir_name(date: NaiveDate, index: usize) -> String {
    format!("{}_{:03}", date.format("%Y-%m-%d"), index)
}

/// Moves the files of `folder` into batch folders of `files_per_dir` files and
/// returns the created folders in order.
///
/// A missing folder or a folder without files yields an empty list.
pub fn split_into_batches(
    folder: &Path,
    files_per_dir: usize,
    date: NaiveDate,
) -> Result<Vec<PathBuf>, StagerError> {
    if files_per_dir == 0 {
        return Err(StagerError::Config(
            "files per batch folder must be greater than 0".to_string(),
        ));
    }
    if !folder.is_dir() {
        error!(folder = %folder.display(), "folder does not exist");
        return Ok(Vec::new());
    }

    let files = list_files(folder, &FilePattern::new(ANY_FILE_GLOB)?)?;
    if files.is_empty() {
        info!(folder = %folder.display(), "no files found in folder");
        return Ok(Vec::new());
    }

    let batches = plan_batches(&files, files_per_dir);
    let mut created = Vec::with_capacity(batches.len());

    for (i, batch) in batches.iter().enumerate() {
        let sub_dir = folder.join(batch_dir_name(date, i + 1));
        fs::create_dir_all(&sub_dir).map_err(StagerError::io(&sub_dir))?;
        created.push(sub_dir.clone());

        for file in batch {
            let Some(name) = file.file_name() else { continue };
            let target = sub_dir.join(name);
            fsx::move_file(file, &target).map_err(StagerError::io(file))?;
        }
        debug!(dir = %sub_dir.display(), files = batch.len(), "batch folder filled");
    }

    info!(folder = %folder.display(), files = files.len(), batches = created.len(), "split folder into batches");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn batches_have_capacity_except_last() {
        for n in 1..=23usize {
            for k in 1..=7usize {
                let files: Vec<usize> = (0..n).collect();
                let batches = plan_batches(&files, k);
                assert_eq!(batches.len(), (n + k - 1) / k, "n={n} k={k}");
                for b in &batches[..batches.len() - 1] {
                    assert_eq!(b.len(), k);
                }
                let last = batches.last().unwrap().len();
                assert_eq!(last, if n % k == 0 { k } else { n % k });
                assert_eq!(batches.concat(), files);
            }
        }
    }

    #[test]
    fn empty_input_plans_no_batches() {
        assert!(plan_batches::<u8>(&[], 3).is_empty());
    }

    #[test]
    fn batch_names_stay_unique_past_nine() {
        let names: Vec<_> = (1..=12).map(|i| batch_dir_name(date(), i)).collect();
        assert_eq!(names[0], "2024-06-01_001");
        assert_eq!(names[9], "2024-06-01_010");
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, names);
        assert_eq!(batch_dir_name(date(), 1000), "2024-06-01_1000");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            split_into_batches(dir.path(), 0, date()),
            Err(StagerError::Config(_))
        ));
    }
}
