use config::{Config as ConfigBuilder, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{ScanError, ScanResult};

/// Configuration for a scan run.
///
/// # Configuration Locations
///
/// Sources are layered, later ones overriding earlier ones:
/// 1. Global `$HOME/.config/logtally/config.yaml`
/// 2. Local `.logtally.yaml` in the current directory
/// 3. Custom config file specified via `--config`
/// 4. Command-line flags (see [`ScanConfig::merge_with_cli`])
///
/// The explicit file is always read as YAML, whatever its extension.
///
/// # Configuration Format
///
/// ```yaml
/// # Directory holding the log files (not searched recursively)
/// root_folder: "/var/log/nginx"
///
/// # Only files whose name contains this are scanned
/// log_type: "access"
///
/// # Path substrings to count
/// search_for:
///   - "/api"
///   - "/login"
///
/// # Only count requests whose forwarded-for column contains this
/// forwarded_from: ""
///
/// # Status code a line must carry to be counted
/// accepted_status: "200"
///
/// # Count per day (true) or a single total per term (false)
/// bucket_by_date: true
///
/// # What to do with an unparseable date: skip the line or abort the run
/// date_error_policy: skip
///
/// # Cap on files scanned at once (default: one thread per file)
/// max_concurrency: 8
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory to list log files from
    #[serde(default = "default_root_folder")]
    pub root_folder: PathBuf,

    /// Substring a file name must contain to be scanned
    #[serde(default = "default_log_type")]
    pub log_type: String,

    /// Path substrings to count; empty entries are ignored
    #[serde(default)]
    pub search_for: Vec<String>,

    /// Substring the forwarded-for column must contain; empty disables the filter
    #[serde(default)]
    pub forwarded_from: String,

    /// Status code token a line must carry to be counted
    #[serde(default = "default_accepted_status")]
    pub accepted_status: String,

    /// Whether counts are kept per calendar day
    #[serde(default = "default_bucket_by_date")]
    pub bucket_by_date: bool,

    /// Handling of lines whose timestamp cannot be parsed
    #[serde(default)]
    pub date_error_policy: DateErrorPolicy,

    /// Maximum number of files scanned at once. None spawns one scanner per file.
    #[serde(default)]
    pub max_concurrency: Option<NonZeroUsize>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// What a scanner does with a status-accepted line whose date does not parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateErrorPolicy {
    /// Drop the line and keep scanning
    #[default]
    Skip,
    /// Fail the whole run
    Abort,
}

impl FromStr for DateErrorPolicy {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(ScanError::config_error(format!(
                "unknown date error policy '{}', expected 'skip' or 'abort'",
                other
            ))),
        }
    }
}

impl fmt::Display for DateErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

fn default_root_folder() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_type() -> String {
    "access".to_string()
}

fn default_accepted_status() -> String {
    "200".to_string()
}

fn default_bucket_by_date() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_type: default_log_type(),
            search_for: Vec::new(),
            forwarded_from: String::new(),
            accepted_status: default_accepted_status(),
            bucket_by_date: default_bucket_by_date(),
            date_error_policy: DateErrorPolicy::default(),
            max_concurrency: None,
            log_level: default_log_level(),
        }
    }
}

/// Settings given on the command line. `None` leaves the file value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub log_type: Option<String>,
    pub search_for: Option<Vec<String>>,
    pub forwarded_from: Option<String>,
    pub accepted_status: Option<String>,
    pub bucket_by_date: Option<bool>,
    pub date_error_policy: Option<DateErrorPolicy>,
    pub max_concurrency: Option<NonZeroUsize>,
    pub log_level: Option<String>,
}

/// Splits a comma-separated search list, trimming each entry.
///
/// Empty entries are kept here and dropped by the aggregator, so `"/api,,/web"`
/// and `"/api,/web"` count the same.
pub fn split_search_terms(list: &str) -> Vec<String> {
    list.split(',').map(|term| term.trim().to_string()).collect()
}

impl ScanConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an explicit file.
    ///
    /// The explicit file is required to exist; the default locations are optional.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let default_files = [
            dirs::config_dir().map(|p| p.join("logtally/config.yaml")),
            Some(PathBuf::from(".logtally.yaml")),
        ];

        for path in default_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            let name = path.to_string_lossy();
            builder = builder.add_source(File::new(&name, FileFormat::Yaml).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values.
    ///
    /// Every flag the user passed wins, even when it repeats the built-in default.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(root_folder) = cli.root_folder {
            self.root_folder = root_folder;
        }
        if let Some(log_type) = cli.log_type {
            self.log_type = log_type;
        }
        if let Some(search_for) = cli.search_for {
            self.search_for = search_for;
        }
        if let Some(forwarded_from) = cli.forwarded_from {
            self.forwarded_from = forwarded_from;
        }
        if let Some(accepted_status) = cli.accepted_status {
            self.accepted_status = accepted_status;
        }
        if let Some(bucket_by_date) = cli.bucket_by_date {
            self.bucket_by_date = bucket_by_date;
        }
        if let Some(policy) = cli.date_error_policy {
            self.date_error_policy = policy;
        }
        if cli.max_concurrency.is_some() {
            self.max_concurrency = cli.max_concurrency;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Rejects settings that would make every line unmatchable
    pub fn validate(&self) -> ScanResult<()> {
        if self.root_folder.as_os_str().is_empty() {
            return Err(ScanError::config_error("root_folder must not be empty"));
        }
        if self.accepted_status.trim().is_empty() {
            return Err(ScanError::config_error("accepted_status must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            root_folder: "/var/log/nginx"
            log_type: "ssl_access"
            search_for: ["/api", "/login"]
            forwarded_from: "10.1."
            accepted_status: "304"
            bucket_by_date: false
            date_error_policy: abort
            max_concurrency: 4
            log_level: "debug"
        "#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = ScanConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.root_folder, PathBuf::from("/var/log/nginx"));
        assert_eq!(config.log_type, "ssl_access");
        assert_eq!(config.search_for, vec!["/api", "/login"]);
        assert_eq!(config.forwarded_from, "10.1.");
        assert_eq!(config.accepted_status, "304");
        assert!(!config.bucket_by_date);
        assert_eq!(config.date_error_policy, DateErrorPolicy::Abort);
        assert_eq!(config.max_concurrency, NonZeroUsize::new(4));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"search_for: [\"/api\"]\n").unwrap();

        let config = ScanConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.search_for, vec!["/api"]);
        assert_eq!(config.root_folder, PathBuf::from("."));
        assert_eq!(config.log_type, "access");
        assert_eq!(config.forwarded_from, "");
        assert_eq!(config.accepted_status, "200");
        assert!(config.bucket_by_date);
        assert_eq!(config.date_error_policy, DateErrorPolicy::Skip);
        assert_eq!(config.max_concurrency, None);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_merge_with_cli() {
        let from_file = ScanConfig {
            root_folder: PathBuf::from("/var/log/nginx"),
            search_for: vec!["/api".to_string()],
            forwarded_from: "proxy".to_string(),
            max_concurrency: NonZeroUsize::new(2),
            ..ScanConfig::default()
        };

        let cli = CliOverrides {
            search_for: Some(vec!["/web".to_string()]),
            bucket_by_date: Some(false),
            date_error_policy: Some(DateErrorPolicy::Abort),
            log_level: Some("debug".to_string()),
            ..CliOverrides::default()
        };

        let merged = from_file.merge_with_cli(cli);
        assert_eq!(merged.root_folder, PathBuf::from("/var/log/nginx")); // File value (not on CLI)
        assert_eq!(merged.search_for, vec!["/web"]); // CLI value
        assert_eq!(merged.forwarded_from, "proxy"); // File value (not on CLI)
        assert!(!merged.bucket_by_date); // CLI value
        assert_eq!(merged.date_error_policy, DateErrorPolicy::Abort); // CLI value
        assert_eq!(merged.max_concurrency, NonZeroUsize::new(2)); // File value (CLI None)
        assert_eq!(merged.log_level, "debug"); // CLI value
    }

    #[test]
    fn test_cli_default_values_override_file() {
        let from_file = ScanConfig {
            root_folder: PathBuf::from("/var/log/nginx"),
            log_type: "ssl_access".to_string(),
            accepted_status: "304".to_string(),
            bucket_by_date: false,
            date_error_policy: DateErrorPolicy::Abort,
            log_level: "debug".to_string(),
            ..ScanConfig::default()
        };

        let cli = CliOverrides {
            root_folder: Some(PathBuf::from(".")),
            log_type: Some("access".to_string()),
            accepted_status: Some("200".to_string()),
            bucket_by_date: Some(true),
            date_error_policy: Some(DateErrorPolicy::Skip),
            log_level: Some("warn".to_string()),
            ..CliOverrides::default()
        };

        let merged = from_file.merge_with_cli(cli);
        assert_eq!(merged.root_folder, PathBuf::from("."));
        assert_eq!(merged.log_type, "access");
        assert_eq!(merged.accepted_status, "200");
        assert!(merged.bucket_by_date);
        assert_eq!(merged.date_error_policy, DateErrorPolicy::Skip);
        assert_eq!(merged.log_level, "warn");
    }

    #[test]
    fn test_empty_overrides_keep_file_values() {
        let from_file = ScanConfig {
            log_type: "ssl_access".to_string(),
            search_for: vec!["/api".to_string()],
            ..ScanConfig::default()
        };
        let merged = from_file.clone().merge_with_cli(CliOverrides::default());
        assert_eq!(merged, from_file);
    }

    #[test]
    fn test_config_file_without_yaml_extension() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("logtally.conf");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"log_type: \"ssl_access\"\naccepted_status: \"304\"\n")
            .unwrap();

        let config = ScanConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.log_type, "ssl_access");
        assert_eq!(config.accepted_status, "304");
    }

    #[test]
    fn test_invalid_config() {
        let config_content = r#"
            search_for: 123  # Should be a list
            max_concurrency: "many"  # Should be a number
        "#;

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let result = ScanConfig::load_from(Some(&config_path));
        assert!(result.is_err(), "Expected error loading invalid config");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ScanConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_split_search_terms() {
        assert_eq!(split_search_terms("/api,/web"), vec!["/api", "/web"]);
        assert_eq!(split_search_terms("/api, /web ,"), vec!["/api", "/web", ""]);
        assert_eq!(split_search_terms(""), vec![""]);
    }

    #[test]
    fn test_date_error_policy_parsing() {
        assert_eq!("skip".parse::<DateErrorPolicy>().unwrap(), DateErrorPolicy::Skip);
        assert_eq!("ABORT".parse::<DateErrorPolicy>().unwrap(), DateErrorPolicy::Abort);
        assert!("ignore".parse::<DateErrorPolicy>().is_err());
        assert_eq!(DateErrorPolicy::Abort.to_string(), "abort");
    }

    #[test]
    fn test_validate() {
        assert!(ScanConfig::default().validate().is_ok());

        let config = ScanConfig {
            root_folder: PathBuf::new(),
            ..ScanConfig::default()
        };
        assert!(matches!(config.validate(), Err(ScanError::ConfigError(_))));

        let config = ScanConfig {
            accepted_status: " ".to_string(),
            ..ScanConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
