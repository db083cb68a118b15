use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::results::{FileStatus, FileSummary};

/// Run-wide counters shared by all file scanners
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    // File metrics
    files_scanned: Arc<AtomicU64>,
    files_truncated: Arc<AtomicU64>,
    files_skipped: Arc<AtomicU64>,

    // Line metrics
    lines_read: Arc<AtomicU64>,
    records: Arc<AtomicU64>,
    status_filtered: Arc<AtomicU64>,
    malformed_dates: Arc<AtomicU64>,

    // Aggregation metrics
    term_matches: Arc<AtomicU64>,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance
    pub fn new() -> Self {
        Self {
            files_scanned: Arc::new(AtomicU64::new(0)),
            files_truncated: Arc::new(AtomicU64::new(0)),
            files_skipped: Arc::new(AtomicU64::new(0)),
            lines_read: Arc::new(AtomicU64::new(0)),
            records: Arc::new(AtomicU64::new(0)),
            status_filtered: Arc::new(AtomicU64::new(0)),
            malformed_dates: Arc::new(AtomicU64::new(0)),
            term_matches: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Folds a finished file's summary into the run totals
    pub fn record_file(&self, summary: &FileSummary) {
        let counter = match summary.status {
            FileStatus::Complete => &self.files_scanned,
            FileStatus::Truncated(_) => &self.files_truncated,
            FileStatus::Skipped(_) => &self.files_skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.lines_read
            .fetch_add(summary.lines_read, Ordering::Relaxed);
        self.records.fetch_add(summary.records, Ordering::Relaxed);
        self.status_filtered
            .fetch_add(summary.status_filtered, Ordering::Relaxed);
        self.malformed_dates
            .fetch_add(summary.malformed_dates, Ordering::Relaxed);
    }

    /// Records how many terms a single record incremented
    pub fn record_term_matches(&self, matched: usize) {
        if matched > 0 {
            self.term_matches
                .fetch_add(matched as u64, Ordering::Relaxed);
        }
    }

    /// Gets a snapshot of the counters
    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_truncated: self.files_truncated.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            status_filtered: self.status_filtered.load(Ordering::Relaxed),
            malformed_dates: self.malformed_dates.load(Ordering::Relaxed),
            term_matches: self.term_matches.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Files scanned/truncated/skipped: {}/{}/{}\n\
             Lines read: {}\n\
             Records counted: {}\n\
             Lines filtered by status: {}\n\
             Lines with malformed dates: {}\n\
             Term matches: {}",
            stats.files_scanned,
            stats.files_truncated,
            stats.files_skipped,
            stats.lines_read,
            stats.records,
            stats.status_filtered,
            stats.malformed_dates,
            stats.term_matches
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub files_scanned: u64,
    pub files_truncated: u64,
    pub files_skipped: u64,
    pub lines_read: u64,
    pub records: u64,
    pub status_filtered: u64,
    pub malformed_dates: u64,
    pub term_matches: u64,
}
