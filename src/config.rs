//! Run configuration.
//!
//! Both binaries read one TOML file. Every field has a default matching the
//! historical constants (six attempts, 300 s timeout, 5 s delay, five skipped
//! header lines, the 2013-01-01..2013-08-01 window), so a config file only
//! needs the paths that differ per machine.
//!
//! The file path comes from `ASOS_HARVEST_CONFIG` (a `.env` file is honored),
//! falling back to `./asos_harvest.toml`.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::iem::{ASOS_SERVICE_URL, IEM_BASE_URL, ServiceQuery};
use crate::ingest::retry::RetryPolicy;
use crate::logging::LogLevel;
use crate::model::{HarvestError, RequestWindow};
use crate::stations::{DEFAULT_STATES, find_group};

pub const CONFIG_ENV_VAR: &str = "ASOS_HARVEST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./asos_harvest.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceSection {
    /// Download endpoint, including the trailing `?`
    pub asos_url: String,
    /// Host used for network metadata requests
    pub metadata_url: String,
    pub data: String,
    pub tz: String,
    pub format: String,
    pub latlon: bool,
}

impl Default for ServiceSection {
    fn default() -> Self {
        let query = ServiceQuery::default();
        ServiceSection {
            asos_url: ASOS_SERVICE_URL.to_string(),
            metadata_url: IEM_BASE_URL.to_string(),
            data: query.data,
            tz: query.tz,
            format: query.format,
            latlon: query.latlon,
        }
    }
}

impl ServiceSection {
    pub fn query(&self) -> ServiceQuery {
        ServiceQuery {
            data: self.data.clone(),
            tz: self.tz.clone(),
            format: self.format.clone(),
            latlon: self.latlon,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowSection {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for WindowSection {
    fn default() -> Self {
        WindowSection {
            start: NaiveDate::from_ymd_opt(2013, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2013, 8, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub delay_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        RetrySection {
            max_attempts: policy.max_attempts,
            timeout_secs: policy.timeout.as_secs(),
            delay_secs: policy.delay.as_secs(),
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            timeout: Duration::from_secs(self.timeout_secs),
            delay: Duration::from_secs(self.delay_secs),
        }
    }
}

/// Where the station list comes from.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StationSource {
    /// `<STATE>_ASOS` network metadata from IEM
    Networks,
    /// A local file, one code per line
    File,
}

/// Per-station files, or one file per day for all stations.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    PerStation,
    DailyAllStations,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchSection {
    pub mode: FetchMode,
    pub output_dir: PathBuf,
    /// Leading lines of each response to skip before the header row
    pub header_lines: usize,
    pub station_source: StationSource,
    pub station_file: Option<PathBuf>,
    pub states: Vec<String>,
    /// Name of a built-in station group; `None` fetches every station
    pub station_group: Option<String>,
}

impl Default for FetchSection {
    fn default() -> Self {
        FetchSection {
            mode: FetchMode::PerStation,
            output_dir: PathBuf::from("origin data"),
            header_lines: 5,
            station_source: StationSource::Networks,
            station_file: None,
            states: DEFAULT_STATES.iter().map(|s| s.to_string()).collect(),
            station_group: Some("origin".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub log_file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            level: "info".to_string(),
            log_file: None,
            console_timestamps: false,
        }
    }
}

impl LoggingSection {
    pub fn min_level(&self) -> Result<LogLevel, HarvestError> {
        LogLevel::parse(&self.level)
            .ok_or_else(|| HarvestError::Config(format!("unknown log level '{}'", self.level)))
    }
}

/// One folder of per-station CSV files and the combined file it produces.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CombineGroup {
    pub input_dir: PathBuf,
    pub output_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CombineSection {
    pub groups: Vec<CombineGroup>,
}

impl Default for CombineSection {
    fn default() -> Self {
        let group = |dir: &str, out: &str| CombineGroup {
            input_dir: PathBuf::from(dir),
            output_file: PathBuf::from(out),
        };
        CombineSection {
            groups: vec![
                group("dest history data", "dest_his.csv"),
                group("dest test data", "dest_tes.csv"),
                group("origin data", "origin.csv"),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarvestConfig {
    pub service: ServiceSection,
    pub window: WindowSection,
    pub retry: RetrySection,
    pub fetch: FetchSection,
    pub logging: LoggingSection,
    pub combine: CombineSection,
}

impl HarvestConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, HarvestError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads and parses a TOML config file. Does not validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HarvestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Resolves the config path from the environment (after loading `.env`)
    /// and loads it.
    pub fn load_from_env() -> Result<Self, HarvestError> {
        dotenv::dotenv().ok();
        let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    pub fn request_window(&self) -> Result<RequestWindow, HarvestError> {
        RequestWindow::new(self.window.start, self.window.end)
    }

    /// Checks settings used by the fetcher.
    pub fn validate_fetch(&self) -> Result<(), HarvestError> {
        self.request_window()?;
        self.logging.min_level()?;

        if self.retry.max_attempts == 0 {
            return Err(HarvestError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.fetch.output_dir.as_os_str().is_empty() {
            return Err(HarvestError::Config(
                "fetch.output_dir must not be empty".to_string(),
            ));
        }
        if self.fetch.station_source == StationSource::File && self.fetch.station_file.is_none() {
            return Err(HarvestError::Config(
                "fetch.station_file is required when station_source = \"file\"".to_string(),
            ));
        }
        if let Some(name) = &self.fetch.station_group {
            if find_group(name).is_none() {
                return Err(HarvestError::Config(format!(
                    "unknown station group '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Checks settings used by the combiner.
    pub fn validate_combine(&self) -> Result<(), HarvestError> {
        self.logging.min_level()?;

        if self.combine.groups.is_empty() {
            return Err(HarvestError::Config(
                "combine.groups must list at least one folder".to_string(),
            ));
        }
        for group in &self.combine.groups {
            if !group.input_dir.is_dir() {
                return Err(HarvestError::Config(format!(
                    "combine input folder {} does not exist",
                    group.input_dir.display()
                )));
            }
            if writes_into_input(group) {
                return Err(HarvestError::Config(format!(
                    "combine output {} is inside its input folder {}",
                    group.output_file.display(),
                    group.input_dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// True when the group's output file would land directly in its input folder
/// and be read back on the next run.
fn writes_into_input(group: &CombineGroup) -> bool {
    let parent = match group.output_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), group.input_dir.canonicalize()) {
        (Ok(out_dir), Ok(in_dir)) => out_dir == in_dir,
        _ => parent == group.input_dir.as_path(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_historical_defaults() {
        let config = HarvestConfig::from_toml_str("").unwrap();
        assert_eq!(config.retry.policy(), RetryPolicy::default());
        assert_eq!(config.fetch.header_lines, 5);
        assert_eq!(config.fetch.mode, FetchMode::PerStation);
        assert_eq!(config.fetch.station_group.as_deref(), Some("origin"));
        assert_eq!(config.fetch.states.len(), 50);
        assert_eq!(config.combine.groups.len(), 3);
        assert_eq!(
            config.window.start,
            NaiveDate::from_ymd_opt(2013, 1, 1).unwrap()
        );
        assert!(config.validate_fetch().is_ok());
    }

    #[test]
    fn test_parses_all_sections() {
        let text = r#"
            [service]
            data = "tmpf,p01i"
            latlon = false

            [window]
            start = "2014-02-01"
            end = "2014-02-03"

            [retry]
            max_attempts = 3
            delay_secs = 1

            [fetch]
            mode = "daily_all_stations"
            output_dir = "/data/asos"
            station_source = "file"
            station_file = "stations.txt"
            station_group = "dest_test"

            [logging]
            level = "debug"
            log_file = "harvest.log"

            [[combine.groups]]
            input_dir = "a"
            output_file = "a.csv"
        "#;

        let config = HarvestConfig::from_toml_str(text).unwrap();
        assert_eq!(config.service.data, "tmpf,p01i");
        assert!(!config.service.latlon);
        assert_eq!(config.service.tz, "Etc/UTC");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.timeout_secs, 300);
        assert_eq!(config.fetch.mode, FetchMode::DailyAllStations);
        assert_eq!(config.fetch.station_source, StationSource::File);
        assert_eq!(config.logging.min_level().unwrap(), LogLevel::Debug);
        assert_eq!(config.combine.groups.len(), 1);
        assert!(config.validate_fetch().is_ok());
    }

    #[test]
    fn test_rejects_reversed_window() {
        let text = "[window]\nstart = \"2013-08-01\"\nend = \"2013-01-01\"\n";
        let config = HarvestConfig::from_toml_str(text).unwrap();
        assert!(matches!(config.validate_fetch(), Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let config = HarvestConfig::from_toml_str("[retry]\nmax_attempts = 0\n").unwrap();
        assert!(config.validate_fetch().is_err());
    }

    #[test]
    fn test_file_source_requires_path() {
        let config = HarvestConfig::from_toml_str("[fetch]\nstation_source = \"file\"\n").unwrap();
        assert!(config.validate_fetch().is_err());
    }

    #[test]
    fn test_rejects_unknown_group_and_level() {
        let config =
            HarvestConfig::from_toml_str("[fetch]\nstation_group = \"moon\"\n").unwrap();
        assert!(config.validate_fetch().is_err());

        let config = HarvestConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap();
        assert!(config.validate_fetch().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = HarvestConfig::from_toml_str("[retry\nmax_attempts = ");
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_combine_rejects_missing_folder() {
        let text = "[[combine.groups]]\ninput_dir = \"/definitely/not/here\"\noutput_file = \"x.csv\"\n";
        let config = HarvestConfig::from_toml_str(text).unwrap();
        assert!(config.validate_combine().is_err());
    }

    #[test]
    fn test_combine_rejects_output_inside_input_folder() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("origin data");
        std::fs::create_dir(&input).unwrap();

        let mut config = HarvestConfig::default();
        config.combine.groups = vec![CombineGroup {
            input_dir: input.clone(),
            output_file: input.join("origin.csv"),
        }];
        assert!(matches!(config.validate_combine(), Err(HarvestError::Config(_))));

        // Same folder spelled differently
        config.combine.groups[0].output_file = input.join(".").join("origin.csv");
        assert!(config.validate_combine().is_err());

        config.combine.groups[0].output_file = dir.path().join("origin.csv");
        assert!(config.validate_combine().is_ok());
    }
}
