/// Concatenates each configured folder of per-station CSV files into one file.
///
/// Configuration: `ASOS_HARVEST_CONFIG` (or `./asos_harvest.toml`).

use std::error::Error;

use asos_harvest::combine;
use asos_harvest::config::HarvestConfig;
use asos_harvest::logging;

fn main() -> Result<(), Box<dyn Error>> {
    let config = HarvestConfig::load_from_env()?;
    config.validate_combine()?;

    logging::init_logger(
        config.logging.min_level()?,
        config.logging.log_file.as_deref(),
        config.logging.console_timestamps,
    );

    for summary in combine::run_combine(&config)? {
        println!(
            "{}: {} rows from {} files",
            summary.output_file.display(),
            summary.rows_written,
            summary.files_read
        );
    }
    Ok(())
}
