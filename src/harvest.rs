/// Fetch pipeline: enumerate stations, download each with retries, and
/// write the results to the output directory.
///
/// A station whose download is exhausted is logged and counted as failed;
/// the run carries on with the next station. Parse and write failures stop
/// the run.

use std::path::{Path, PathBuf};

use crate::config::{FetchMode, HarvestConfig, StationSource};
use crate::ingest::iem::{build_day_uri, build_query_prefix, build_service_url, build_station_uri};
use crate::ingest::retry::{RetryFetcher, Sleeper, Transport};
use crate::logging::{self, Component};
use crate::model::{HarvestError, StationId};
use crate::stations;
use crate::table::{parse_delimited, write_indexed_csv};

/// Counts for one fetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Files written, in fetch order.
    pub written: Vec<PathBuf>,
}

impl FetchSummary {
    fn record_success(&mut self, path: PathBuf) {
        self.total += 1;
        self.successful += 1;
        self.written.push(path);
    }

    fn record_failure(&mut self) {
        self.total += 1;
        self.failed += 1;
    }
}

/// Enumerates stations from the configured source and narrows them to the
/// configured group.
pub fn resolve_stations<T: Transport>(
    config: &HarvestConfig,
    transport: &T,
) -> Result<Vec<StationId>, HarvestError> {
    let enumerated = match config.fetch.station_source {
        StationSource::File => {
            let path = config.fetch.station_file.as_ref().ok_or_else(|| {
                HarvestError::Config("fetch.station_file is not set".to_string())
            })?;
            stations::load_station_file(path)?
        }
        StationSource::Networks => {
            let networks = stations::network_names(config.fetch.states.as_slice());
            stations::stations_from_networks(transport, &config.service.metadata_url, networks.as_slice())?
        }
    };
    logging::info(
        Component::Stations,
        None,
        &format!("Enumerated {} stations", enumerated.len()),
    );

    let selected = match &config.fetch.station_group {
        Some(name) => {
            let group = stations::find_group(name)
                .ok_or_else(|| HarvestError::Config(format!("unknown station group '{}'", name)))?;
            stations::filter_to_group(enumerated, group)
        }
        None => enumerated,
    };
    logging::info(
        Component::Stations,
        None,
        &format!("{} stations selected for download", selected.len()),
    );
    Ok(selected)
}

fn ensure_dir(dir: &Path) -> Result<(), HarvestError> {
    std::fs::create_dir_all(dir).map_err(|e| HarvestError::io(dir, e))
}

/// Downloads every station in `stations` over the configured window and
/// writes `<output_dir>/<station>.csv`.
pub fn fetch_stations<T: Transport, S: Sleeper>(
    config: &HarvestConfig,
    fetcher: &RetryFetcher<T, S>,
    stations: &[StationId],
) -> Result<FetchSummary, HarvestError> {
    let window = config.request_window()?;
    let service_url = build_service_url(&config.service.asos_url, &config.service.query(), &window);
    let output_dir = &config.fetch.output_dir;
    ensure_dir(output_dir)?;

    let mut summary = FetchSummary::default();
    for station in stations {
        logging::info(Component::Fetch, Some(station.as_str()), &format!("Downloading: {}", station));
        let uri = build_station_uri(&service_url, station);
        let data = fetcher.fetch(&uri);

        if data.is_empty() {
            logging::error(Component::Fetch, Some(station.as_str()), "no data obtained, skipping");
            summary.record_failure();
            continue;
        }

        let table = parse_delimited(&data, config.fetch.header_lines)?;
        let path = output_dir.join(format!("{}.csv", station));
        write_indexed_csv(&table, &path)?;
        logging::debug(
            Component::Fetch,
            Some(station.as_str()),
            &format!("wrote {} rows to {}", table.len(), path.display()),
        );
        summary.record_success(path);
    }

    Ok(summary)
}

/// Downloads all stations one day at a time and writes the raw text to
/// `<output_dir>/<YYYYMMDD>.txt`.
pub fn fetch_daily<T: Transport, S: Sleeper>(
    config: &HarvestConfig,
    fetcher: &RetryFetcher<T, S>,
) -> Result<FetchSummary, HarvestError> {
    let window = config.request_window()?;
    let prefix = build_query_prefix(&config.service.asos_url, &config.service.query());
    let output_dir = &config.fetch.output_dir;
    ensure_dir(output_dir)?;

    let mut summary = FetchSummary::default();
    for day in window.days() {
        let label = day.format("%Y%m%d").to_string();
        logging::info(Component::Fetch, None, &format!("Downloading: {}", day));
        let data = fetcher.fetch(&build_day_uri(&prefix, day));

        if data.is_empty() {
            logging::error(Component::Fetch, Some(label.as_str()), "no data obtained, skipping");
            summary.record_failure();
            continue;
        }

        let path = output_dir.join(format!("{}.txt", label));
        std::fs::write(&path, data.as_bytes()).map_err(|e| HarvestError::io(&path, e))?;
        summary.record_success(path);
    }

    Ok(summary)
}

/// Runs the configured fetch mode end to end and logs a summary.
pub fn run_fetch<T: Transport, S: Sleeper>(
    config: &HarvestConfig,
    fetcher: &RetryFetcher<T, S>,
) -> Result<FetchSummary, HarvestError> {
    let summary = match config.fetch.mode {
        FetchMode::PerStation => {
            let stations = resolve_stations(config, fetcher.transport())?;
            fetch_stations(config, fetcher, &stations)?
        }
        FetchMode::DailyAllStations => fetch_daily(config, fetcher)?,
    };

    logging::log_run_summary(Component::Fetch, summary.total, summary.successful, summary.failed);
    Ok(summary)
}
