pub mod aggregate;
pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod scan;

pub use aggregate::Aggregator;
pub use config::{DateErrorPolicy, ScanConfig};
pub use errors::{ScanError, ScanResult};
pub use results::{DateCount, FileStatus, FileSummary, ScanReport, TermReport};
pub use scan::scan;
