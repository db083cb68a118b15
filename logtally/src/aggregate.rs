use chrono::NaiveDate;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::results::{DateCount, TermReport};
use crate::scan::parser::RequestRecord;

/// Counter state for one search term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationEntry {
    /// One running total
    Total(u64),
    /// Counts per day, kept in chronological order
    Daily(BTreeMap<NaiveDate, u64>),
}

impl AggregationEntry {
    fn new(bucket_by_date: bool) -> Self {
        if bucket_by_date {
            Self::Daily(BTreeMap::new())
        } else {
            Self::Total(0)
        }
    }

    fn increment(&mut self, date: Option<NaiveDate>) {
        match (self, date) {
            (Self::Daily(buckets), Some(date)) => *buckets.entry(date).or_insert(0) += 1,
            (Self::Daily(_), None) => {}
            (Self::Total(count), _) => *count += 1,
        }
    }

    /// Sum over all buckets
    pub fn total(&self) -> u64 {
        match self {
            Self::Total(count) => *count,
            Self::Daily(buckets) => buckets.values().sum(),
        }
    }

    fn into_buckets(self) -> Vec<DateCount> {
        match self {
            Self::Total(count) => vec![DateCount { date: None, count }],
            Self::Daily(buckets) => buckets
                .into_iter()
                .map(|(date, count)| DateCount {
                    date: Some(date),
                    count,
                })
                .collect(),
        }
    }
}

/// Shared counting structure fed by every file scanner.
///
/// Each term's counters sit behind their own mutex, so scanners matching
/// different terms never wait on each other's counter lock. The map itself only
/// takes a write lock the first time a term matches.
///
/// Counts are read by consuming the aggregator with [`Aggregator::into_report`],
/// which cannot happen while any scanner still holds a reference to it.
#[derive(Debug)]
pub struct Aggregator {
    terms: Vec<String>,
    forwarded_from: String,
    bucket_by_date: bool,
    entries: DashMap<String, Mutex<AggregationEntry>>,
}

impl Aggregator {
    /// Creates an aggregator for the given terms. Empty and repeated terms are dropped.
    pub fn new<I, S>(search_for: I, forwarded_from: impl Into<String>, bucket_by_date: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terms: Vec<String> = Vec::new();
        for term in search_for.into_iter().map(Into::into) {
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }

        Self {
            entries: DashMap::with_capacity(terms.len()),
            terms,
            forwarded_from: forwarded_from.into(),
            bucket_by_date,
        }
    }

    /// Terms that will be matched, in reporting order
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Whether a record's forwarded-for column passes the global filter
    pub fn accepts_forwarded(&self, forwarded_for: &str) -> bool {
        self.forwarded_from.is_empty() || forwarded_for.contains(self.forwarded_from.as_str())
    }

    /// Counts `record` against every term its path contains.
    ///
    /// Returns the number of terms incremented. A record rejected by the
    /// forwarded-for filter increments nothing.
    pub fn record_match(&self, record: &RequestRecord<'_>) -> usize {
        if !self.accepts_forwarded(record.forwarded_for) {
            return 0;
        }

        let mut matched = 0;
        for term in &self.terms {
            if record.path.contains(term.as_str()) {
                self.increment(term, record.date);
                matched += 1;
            }
        }
        matched
    }

    fn increment(&self, term: &str, date: Option<NaiveDate>) {
        if let Some(entry) = self.entries.get(term) {
            entry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .increment(date);
            return;
        }

        let entry = self
            .entries
            .entry(term.to_string())
            .or_insert_with(|| Mutex::new(AggregationEntry::new(self.bucket_by_date)));
        entry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .increment(date);
    }

    /// Consumes the aggregator into per-term reports.
    ///
    /// Terms keep the order they were given in; terms that never matched are left out.
    pub fn into_report(self) -> Vec<TermReport> {
        let Self { terms, entries, .. } = self;
        terms
            .into_iter()
            .filter_map(|term| {
                let (term, entry) = entries.remove(&term)?;
                let entry = entry.into_inner().unwrap_or_else(PoisonError::into_inner);
                let total = entry.total();
                Some(TermReport {
                    term,
                    buckets: entry.into_buckets(),
                    total,
                })
            })
            .collect()
    }
}
