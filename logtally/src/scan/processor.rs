use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace, warn};

use super::parser::{LineOutcome, LineParser};
use crate::aggregate::Aggregator;
use crate::config::{DateErrorPolicy, ScanConfig};
use crate::errors::{ScanError, ScanResult};
use crate::filters::is_compressed;
use crate::metrics::ScanMetrics;
use crate::results::{FileStatus, FileSummary};

const BUFFER_CAPACITY: usize = 65536;
const LINE_CAPACITY: usize = 512;

/// Streams log files line by line into an [`Aggregator`]
#[derive(Debug, Clone)]
pub struct FileScanner {
    parser: LineParser,
    date_error_policy: DateErrorPolicy,
    metrics: ScanMetrics,
}

impl FileScanner {
    pub fn new(parser: LineParser, date_error_policy: DateErrorPolicy) -> Self {
        Self {
            parser,
            date_error_policy,
            metrics: ScanMetrics::new(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            LineParser::new(config.accepted_status.clone(), config.bucket_by_date),
            config.date_error_policy,
        )
    }

    /// Gets the run-wide counters
    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Scans one file into `aggregator`.
    ///
    /// Compressed and unopenable files are returned as errors without touching
    /// the aggregator. A read error part way through ends the scan of this file
    /// and is reported through [`FileStatus::Truncated`].
    pub fn scan_file(&self, path: &Path, aggregator: &Aggregator) -> ScanResult<FileSummary> {
        if is_compressed(path) {
            return Err(ScanError::compressed_file(path));
        }

        let file = File::open(path).map_err(|e| ScanError::from_open(path, e))?;
        debug!("Scanning file: {}", path.display());

        let reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        self.scan_reader(path, reader, aggregator)
    }

    /// Scans already-opened content; `path` is only used for reporting
    pub fn scan_reader<R: BufRead>(
        &self,
        path: &Path,
        mut reader: R,
        aggregator: &Aggregator,
    ) -> ScanResult<FileSummary> {
        let mut summary = FileSummary::new(path);
        let mut line = String::with_capacity(LINE_CAPACITY);

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "Stopped reading {} after line {}: {}",
                        path.display(),
                        summary.lines_read,
                        e
                    );
                    summary.status = FileStatus::Truncated(e.to_string());
                    break;
                }
            }
            summary.lines_read += 1;

            let content = line.trim_end_matches(['\n', '\r']);
            match self.parser.parse(content) {
                LineOutcome::Record(record) => {
                    summary.records += 1;
                    let matched = aggregator.record_match(&record);
                    self.metrics.record_term_matches(matched);
                }
                LineOutcome::Empty => {}
                LineOutcome::StatusFiltered => summary.status_filtered += 1,
                LineOutcome::MalformedDate(fragment) => match self.date_error_policy {
                    DateErrorPolicy::Skip => {
                        trace!(
                            "Skipping line {} of {}: malformed date {:?}",
                            summary.lines_read,
                            path.display(),
                            fragment
                        );
                        summary.malformed_dates += 1;
                    }
                    DateErrorPolicy::Abort => {
                        return Err(ScanError::malformed_date(
                            path,
                            summary.lines_read as usize,
                            fragment,
                        ));
                    }
                },
            }
        }

        debug!(
            "Finished {}: {} lines, {} records",
            path.display(),
            summary.lines_read,
            summary.records
        );
        Ok(summary)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new(LineParser::default(), DateErrorPolicy::default())
    }
}
