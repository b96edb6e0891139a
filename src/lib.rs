/// ASOS observation harvesting.
///
/// Two independent tools share this crate:
/// - the fetcher (`harvest`) downloads IEM ASOS observations per station
///   with bounded retries and writes one CSV per station;
/// - the combiner (`combine`) concatenates folders of per-station CSV files
///   into one file per folder.

pub mod combine;
pub mod config;
pub mod harvest;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod stations;
pub mod table;
