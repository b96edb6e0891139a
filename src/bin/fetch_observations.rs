/// Downloads IEM ASOS observations for the configured stations and window.
///
/// Configuration: `ASOS_HARVEST_CONFIG` (or `./asos_harvest.toml`).

use std::error::Error;

use asos_harvest::config::HarvestConfig;
use asos_harvest::harvest;
use asos_harvest::ingest::iem::HttpTransport;
use asos_harvest::ingest::retry::RetryFetcher;
use asos_harvest::logging::{self, Component};

fn main() -> Result<(), Box<dyn Error>> {
    let config = HarvestConfig::load_from_env()?;
    config.validate_fetch()?;

    logging::init_logger(
        config.logging.min_level()?,
        config.logging.log_file.as_deref(),
        config.logging.console_timestamps,
    );

    let window = config.request_window()?;
    logging::info(
        Component::System,
        None,
        &format!("Fetching ASOS observations {} to {}", window.start, window.end),
    );

    let policy = config.retry.policy();
    let transport = HttpTransport::new(policy.timeout)?;
    let fetcher = RetryFetcher::new(transport, policy);

    let summary = harvest::run_fetch(&config, &fetcher)?;
    println!(
        "{} of {} downloads written to {}",
        summary.successful,
        summary.total,
        config.fetch.output_dir.display()
    );
    Ok(())
}
