//! Error types for a scan run.
//!
//! Errors fall into two classes. Fatal errors end the whole run: without a file
//! list, or with a worker that died mid-scan, no partial report is meaningful.
//! Per-file errors are reported by the orchestrator as skipped files and never
//! propagate past the file that raised them.
//!
//! ```rust,ignore
//! match scan(&config) {
//!     Ok(report) => print!("{}", report),
//!     Err(e) if e.is_fatal() => // abort,
//!     Err(e) => // unreachable from `scan`, per-file errors are absorbed
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while discovering, scanning or aggregating log files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read log directory {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Compressed log file not supported, decompress it first: {0}")]
    CompressedFile(PathBuf),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Malformed date {fragment:?} in {path} at line {line_number}")]
    MalformedDate {
        path: PathBuf,
        line_number: usize,
        fragment: String,
    },
    #[error("Scanner for {0} panicked")]
    WorkerPanicked(PathBuf),
    #[error("Failed to build scan thread pool: {0}")]
    ThreadPool(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScanError {
    pub fn root_unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RootUnreadable {
            path: path.into(),
            source,
        }
    }

    pub fn compressed_file(path: impl Into<PathBuf>) -> Self {
        Self::CompressedFile(path.into())
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn malformed_date(
        path: impl Into<PathBuf>,
        line_number: usize,
        fragment: impl Into<String>,
    ) -> Self {
        Self::MalformedDate {
            path: path.into(),
            line_number,
            fragment: fragment.into(),
        }
    }

    pub fn worker_panicked(path: impl Into<PathBuf>) -> Self {
        Self::WorkerPanicked(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Maps an error from opening `path` onto the matching variant
    pub fn from_open(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    /// Whether this error ends the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RootUnreadable { .. }
                | Self::MalformedDate { .. }
                | Self::WorkerPanicked(_)
                | Self::ThreadPool(_)
                | Self::ConfigError(_)
        )
    }
}
