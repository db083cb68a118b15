use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use logtally::{
    config::{split_search_terms, CliOverrides},
    scan, DateErrorPolicy, FileStatus, ScanConfig, ScanReport,
};
use std::{num::NonZeroUsize, path::PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Count access-log requests by path substring and day
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the log files (not searched recursively) [default: .]
    #[arg(short = 'd', long = "root-folder")]
    root_folder: Option<PathBuf>,

    /// Only files whose name contains this are scanned [default: access]
    #[arg(short = 't', long = "log-type")]
    log_type: Option<String>,

    /// Comma-separated path substrings to count (e.g. /api,/login)
    #[arg(short = 's', long = "search-for")]
    search_for: Option<String>,

    /// Only count requests whose forwarded-for column contains this
    #[arg(short = 'f', long = "forwarded-from")]
    forwarded_from: Option<String>,

    /// Status code a line must carry to be counted [default: 200]
    #[arg(long = "status")]
    accepted_status: Option<String>,

    /// Report one total per term instead of per-day counts
    #[arg(long, overrides_with = "dates")]
    no_dates: bool,

    /// Count per day even if the config file turns it off
    #[arg(long, overrides_with = "no_dates")]
    dates: bool,

    /// What to do with an unparseable date (skip|abort) [default: skip]
    #[arg(long = "date-errors")]
    date_errors: Option<DateErrorPolicy>,

    /// Maximum number of files scanned at once (default: one thread per file)
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error) [default: warn]
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let bucket_by_date = match (self.dates, self.no_dates) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };

        CliOverrides {
            root_folder: self.root_folder.clone(),
            log_type: self.log_type.clone(),
            search_for: self.search_for.as_deref().map(split_search_terms),
            forwarded_from: self.forwarded_from.clone(),
            accepted_status: self.accepted_status.clone(),
            bucket_by_date,
            date_error_policy: self.date_errors,
            max_concurrency: self.threads,
            log_level: self.log_level.clone(),
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = ScanConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let config = file_config.merge_with_cli(cli.overrides());

    init_logging(&config.log_level);
    info!("Root folder: {}", config.root_folder.display());
    info!("Log type: {}", config.log_type);

    let report = scan(&config)
        .with_context(|| format!("Scan of {} failed", config.root_folder.display()))?;

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
    }
    print_file_warnings(&report);
    Ok(())
}

fn print_file_warnings(report: &ScanReport) {
    for file in &report.files {
        match &file.status {
            FileStatus::Complete => {}
            FileStatus::Truncated(reason) => eprintln!(
                "{} {} ({})",
                "truncated:".yellow().bold(),
                file.path.display(),
                reason
            ),
            FileStatus::Skipped(reason) => eprintln!(
                "{} {} ({})",
                "skipped:".yellow().bold(),
                file.path.display(),
                reason
            ),
        }
    }
}
