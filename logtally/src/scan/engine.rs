use rayon::prelude::*;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::processor::FileScanner;
use crate::aggregate::Aggregator;
use crate::config::ScanConfig;
use crate::errors::{ScanError, ScanResult};
use crate::filters::discover_log_files;
use crate::results::{FileSummary, ScanReport};

/// Scans every matching log file under `config.root_folder` concurrently and
/// returns the aggregated counts.
///
/// Only an unreadable root folder, an invalid config, a panicking scanner or a
/// malformed date under [`DateErrorPolicy::Abort`](crate::config::DateErrorPolicy::Abort)
/// fail the run. Every other per-file problem shows up as a skipped or
/// truncated [`FileSummary`].
pub fn scan(config: &ScanConfig) -> ScanResult<ScanReport> {
    config.validate()?;
    let started = Instant::now();
    info!(
        "Starting scan of {} for '{}' files",
        config.root_folder.display(),
        config.log_type
    );

    let files = discover_log_files(&config.root_folder, &config.log_type)?;
    info!("Found {} log files to scan", files.len());

    let aggregator = Aggregator::new(
        config.search_for.iter().cloned(),
        config.forwarded_from.clone(),
        config.bucket_by_date,
    );
    if aggregator.terms().is_empty() {
        warn!("No search terms given, nothing will be counted");
    } else {
        debug!("Search terms: {:?}", aggregator.terms());
    }

    let scanner = FileScanner::from_config(config);
    let outcomes = match config.max_concurrency {
        None => scan_per_file(&files, &scanner, &aggregator)?,
        Some(limit) => scan_bounded(&files, &scanner, &aggregator, limit)?,
    };

    // Every scanner has joined by now; the aggregator is no longer shared.
    let mut summaries = Vec::with_capacity(files.len());
    for (path, outcome) in files.iter().zip(outcomes) {
        let summary = match outcome {
            Ok(summary) => summary,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                FileSummary::skipped(path, e.to_string())
            }
        };
        scanner.metrics().record_file(&summary);
        summaries.push(summary);
    }

    let metrics = scanner.metrics();
    metrics.log_stats();

    let report = ScanReport::from_terms(aggregator.into_report(), summaries, metrics.get_stats());
    info!(
        "Scan complete in {}. Counted {} matches across {} terms",
        humantime::format_duration(started.elapsed()),
        report.total,
        report.terms.len()
    );

    Ok(report)
}

/// One scoped thread per file, no cap
fn scan_per_file(
    files: &[PathBuf],
    scanner: &FileScanner,
    aggregator: &Aggregator,
) -> ScanResult<Vec<ScanResult<FileSummary>>> {
    debug!("Spawning {} scanner threads", files.len());

    thread::scope(|s| -> ScanResult<Vec<ScanResult<FileSummary>>> {
        let mut handles = Vec::with_capacity(files.len());
        for (i, path) in files.iter().enumerate() {
            let handle = thread::Builder::new()
                .name(format!("logtally-scan-{}", i))
                .spawn_scoped(s, move || scanner.scan_file(path, aggregator))?;
            handles.push((path, handle));
        }

        Ok(handles
            .into_iter()
            .map(|(path, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(ScanError::worker_panicked(path)))
            })
            .collect())
    })
}

/// Files spread over a rayon pool of `limit` threads
fn scan_bounded(
    files: &[PathBuf],
    scanner: &FileScanner,
    aggregator: &Aggregator,
    limit: NonZeroUsize,
) -> ScanResult<Vec<ScanResult<FileSummary>>> {
    debug!("Scanning {} files on {} threads", files.len(), limit);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(limit.get())
        .thread_name(|i| format!("logtally-scan-{}", i))
        .build()
        .map_err(|e| ScanError::ThreadPool(e.to_string()))?;

    Ok(pool.install(|| {
        files
            .par_iter()
            .map(|path| scan_catching_panics(path, scanner, aggregator))
            .collect()
    }))
}

fn scan_catching_panics(
    path: &Path,
    scanner: &FileScanner,
    aggregator: &Aggregator,
) -> ScanResult<FileSummary> {
    panic::catch_unwind(AssertUnwindSafe(|| scanner.scan_file(path, aggregator)))
        .unwrap_or_else(|_| Err(ScanError::worker_panicked(path)))
}
