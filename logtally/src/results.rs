use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::errors::ScanResult;
use crate::metrics::ScanStats;
use crate::scan::parser::DATE_FORMAT;

/// Count for one day, or for the whole run when dates are not bucketed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateCount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub count: u64,
}

/// Final counts for one search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermReport {
    /// The search term as supplied
    pub term: String,
    /// Per-day counts, oldest first
    pub buckets: Vec<DateCount>,
    /// Sum of all buckets
    pub total: u64,
}

/// What happened to one discovered file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum FileStatus {
    /// Read to the end
    Complete,
    /// A read error stopped the scan; lines before it were counted
    Truncated(String),
    /// Not scanned at all
    Skipped(String),
}

/// Per-file scan summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub status: FileStatus,
    /// Lines read, including skipped ones
    pub lines_read: u64,
    /// Records handed to the aggregator
    pub records: u64,
    /// Lines dropped for a non-accepted status
    pub status_filtered: u64,
    /// Lines dropped for an unparseable date
    pub malformed_dates: u64,
}

impl FileSummary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Complete,
            lines_read: 0,
            records: 0,
            status_filtered: 0,
            malformed_dates: 0,
        }
    }

    pub fn skipped(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Skipped(reason.into()),
            ..Self::new(path)
        }
    }
}

/// Complete result of a scan run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Terms with at least one match, in the order they were given
    pub terms: Vec<TermReport>,
    /// Grand total across all terms and days
    pub total: u64,
    /// One summary per discovered file, in discovery order
    pub files: Vec<FileSummary>,
    /// Counters gathered while scanning
    pub stats: ScanStats,
}

impl ScanReport {
    /// Creates a new empty report
    pub fn new() -> Self {
        Default::default()
    }

    /// Builds a report from aggregated terms, computing the grand total
    pub fn from_terms(terms: Vec<TermReport>, files: Vec<FileSummary>, stats: ScanStats) -> Self {
        let total = terms.iter().map(|t| t.total).sum();
        Self {
            terms,
            total,
            files,
            stats,
        }
    }

    /// Looks up the report for a term
    pub fn term(&self, term: &str) -> Option<&TermReport> {
        self.terms.iter().find(|t| t.term == term)
    }

    /// Count for `term` on `date`, zero when absent
    pub fn count_on(&self, term: &str, date: NaiveDate) -> u64 {
        self.term(term)
            .and_then(|t| t.buckets.iter().find(|b| b.date == Some(date)))
            .map_or(0, |b| b.count)
    }

    /// Number of files that were not scanned
    pub fn files_skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Skipped(_)))
            .count()
    }

    pub fn to_json(&self) -> ScanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Renders `<term>: [<dd/Mon/yyyy>] <count>` lines followed by `Total: <n>`
impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for term in &self.terms {
            for bucket in &term.buckets {
                match bucket.date {
                    Some(date) => writeln!(
                        f,
                        "{}: [{}] {}",
                        term.term,
                        date.format(DATE_FORMAT),
                        bucket.count
                    )?,
                    None => writeln!(f, "{}: {}", term.term, bucket.count)?,
                }
            }
        }
        writeln!(f, "Total: {}", self.total)
    }
}
