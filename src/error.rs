use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all operations in the `etl-stager` crate.
#[derive(Debug, Error)]
pub enum StagerError {
    /// An I/O error occurred, typically while reading, moving or writing a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", .path.display())]
    Io { source: std::io::Error, path: PathBuf },

    /// The zip reader rejected an archive (corrupt, truncated, unsupported method).
    #[error("could not extract '{}': {source}", .archive.display())]
    Zip {
        archive: PathBuf,
        source: zip::result::ZipError,
    },

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A configuration file exists but is not valid TOML for `StagingConfig`.
    #[error("could not parse config file '{}': {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A file-matching glob could not be compiled.
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    /// The extraction worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The SQL client could not be started or reported a failure.
    #[error("table provisioning failed for `{command}`: {detail}")]
    Preflight { command: String, detail: String },

    /// An error while serializing the run summary.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StagerError {
    /// Attaches `path` to an I/O error.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StagerError::Io { source, path }
    }
}

// Generic IO error conversion that doesn't require a path
impl From<std::io::Error> for StagerError {
    fn from(err: std::io::Error) -> Self {
        StagerError::Io {
            source: err,
            path: PathBuf::new(),
        }
    }
}
