//! Concurrent scanning of access-log files.
//!
//! The pipeline, leaves first:
//!
//! 1. [`parser`]: turns one line into a [`RequestRecord`] by column position
//! 2. [`processor`]: streams one file through the parser into the shared
//!    [`Aggregator`](crate::aggregate::Aggregator)
//! 3. [`engine`]: discovers files, runs one scanner per file and joins them
//!    before the aggregator is read
//!
//! ```rust,ignore
//! let config = ScanConfig {
//!     root_folder: "/var/log/nginx".into(),
//!     search_for: vec!["/api".to_string()],
//!     ..ScanConfig::default()
//! };
//! let report = scan(&config)?;
//! print!("{}", report);
//! ```

pub mod engine;
pub mod parser;
pub mod processor;

pub use engine::scan;
pub use parser::{LineOutcome, LineParser, RequestRecord};
pub use processor::FileScanner;
