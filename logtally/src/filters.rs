use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::errors::{ScanError, ScanResult};

/// Extensions of compressed logs, which are recognized but not read
const COMPRESSED_EXTENSIONS: &[&str] = &["gz", "bz2", "xz", "zst", "zip"];

/// Checks if a file is a compressed log by its extension
pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            COMPRESSED_EXTENSIONS
                .iter()
                .any(|c| c.eq_ignore_ascii_case(ext))
        })
}

/// Checks if a file name selects it for scanning
pub fn matches_log_type(file_name: &str, log_type: &str) -> bool {
    file_name.contains(log_type)
}

/// Lists the regular files directly inside `root` whose name contains `log_type`.
///
/// Subdirectories are not descended into. The result is sorted by path. An
/// unreadable `root` is an error; a directory with no matching files is not.
pub fn discover_log_files(root: &Path, log_type: &str) -> ScanResult<Vec<PathBuf>> {
    let entries = fs::read_dir(root).map_err(|e| ScanError::root_unreadable(root, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ScanError::root_unreadable(root, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        trace!("Found entry: {}", name);

        if !matches_log_type(&name, log_type) {
            continue;
        }

        // Follows symlinks so a linked log file still counts as a file
        let path = entry.path();
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => debug!("Skipping non-file entry: {}", path.display()),
            Err(e) => debug!("Skipping unreadable entry {}: {}", path.display(), e),
        }
    }

    files.sort();
    Ok(files)
}
