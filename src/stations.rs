/// Station list construction for the ASOS fetcher.
///
/// Stations come either from a plain text file (one code per line) or from
/// the IEM network metadata endpoints, one GeoJSON document per state
/// network. The enumerated list is then narrowed to one of the airport
/// groups defined here.

use serde::Deserialize;
use std::path::Path;

use crate::ingest::iem::build_network_url;
use crate::ingest::retry::Transport;
use crate::model::{HarvestError, StationId};

// ---------------------------------------------------------------------------
// Networks
// ---------------------------------------------------------------------------

/// State codes whose `<STATE>_ASOS` networks are enumerated by default.
pub const DEFAULT_STATES: &[&str] = &[
    "AK", "AL", "AR", "AZ", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "IA", "ID", "IL", "IN",
    "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC", "ND", "NE", "NH",
    "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VA",
    "VT", "WA", "WI", "WV", "WY",
];

/// Maps state codes to IEM network names, e.g. "NY" -> "NY_ASOS".
pub fn network_names<S: AsRef<str>>(states: &[S]) -> Vec<String> {
    states
        .iter()
        .map(|s| format!("{}_ASOS", s.as_ref().trim().to_ascii_uppercase()))
        .collect()
}

// ---------------------------------------------------------------------------
// Station groups
// ---------------------------------------------------------------------------

/// A named set of airports to restrict fetching to.
pub struct StationGroup {
    pub name: &'static str,
    pub description: &'static str,
    pub stations: &'static [&'static str],
}

/// New York area departure airports.
pub static ORIGIN_AIRPORTS: StationGroup = StationGroup {
    name: "origin",
    description: "New York area origin airports",
    stations: &["EWR", "LGA", "JFK"],
};

/// Destinations seen in the historical flight records.
pub static DEST_HISTORY_AIRPORTS: StationGroup = StationGroup {
    name: "dest_history",
    description: "Destination airports in the historical flight records",
    stations: &[
        "LGB", "TUL", "SAN", "CAE", "DFW", "CLE", "DCA", "BQN", "RDU", "MYR", "ORF", "ACK",
        "OMA", "OAK", "CMH", "IND", "BNA", "PWM", "FLL", "BDL", "SAT", "MSN", "AVL", "STT",
        "EGE", "CAK", "SJU", "RSW", "HOU", "BGR", "RIC", "GRR", "ROC", "GSO", "SMF", "SDF",
        "TYS", "BUR", "CVG", "PIT", "SFO", "HNL", "PBI", "BUF", "MCI", "BWI", "OKC", "TVC",
        "GSP", "ABQ", "PSE", "TPA", "EYW", "PVD", "SAV", "BHM", "XNA", "MVY", "BOS", "IAD",
        "SRQ", "MKE", "MEM", "SYR", "MDW", "MIA", "CHS", "SNA", "MHT", "DAY", "CRW", "PSP",
        "IAH", "JAX", "LAX", "MSP", "MTJ", "BZN", "BTV", "SEA", "PHX", "JAC", "MSY", "PHL",
        "ATL", "MCO", "HDN", "ALB", "DTW", "SJC", "ORD", "DSM", "SLC", "LAS", "AUS", "DEN",
        "CLT", "PDX", "CHO", "STL",
    ],
};

/// Destinations seen in the test flight records.
pub static DEST_TEST_AIRPORTS: StationGroup = StationGroup {
    name: "dest_test",
    description: "Destination airports in the test flight records",
    stations: &[
        "LGB", "TUL", "SAN", "CAE", "DFW", "CLE", "DCA", "BQN", "RDU", "MYR", "ORF", "ACK",
        "OMA", "OAK", "CMH", "IND", "BNA", "PWM", "FLL", "SAT", "MSN", "AVL", "STT", "CAK",
        "SJU", "RSW", "HOU", "BGR", "RIC", "GRR", "ROC", "GSO", "SMF", "SDF", "TYS", "BUR",
        "CVG", "PIT", "SFO", "HNL", "BUF", "PBI", "MCI", "BWI", "OKC", "TVC", "GSP", "ABQ",
        "PSE", "TPA", "PVD", "SAV", "ANC", "BHM", "XNA", "MVY", "BOS", "IAD", "SRQ", "MKE",
        "MEM", "SYR", "MDW", "MIA", "CHS", "SNA", "MHT", "DAY", "IAH", "JAX", "LAX", "MSP",
        "BZN", "BTV", "SEA", "PHX", "MSY", "PHL", "ATL", "MCO", "ALB", "DTW", "SJC", "ORD",
        "DSM", "SLC", "LAS", "AUS", "DEN", "CLT", "PDX", "STL",
    ],
};

pub static STATION_GROUPS: &[&StationGroup] =
    &[&ORIGIN_AIRPORTS, &DEST_HISTORY_AIRPORTS, &DEST_TEST_AIRPORTS];

/// Looks up a station group by name. Returns `None` if not found.
pub fn find_group(name: &str) -> Option<&'static StationGroup> {
    STATION_GROUPS.iter().copied().find(|g| g.name == name)
}

/// Keeps only stations belonging to `group`, in enumeration order.
pub fn filter_to_group(stations: Vec<StationId>, group: &StationGroup) -> Vec<StationId> {
    stations
        .into_iter()
        .filter(|s| group.stations.contains(&s.as_str()))
        .collect()
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Reads one station code per line. Lines are trimmed; blank lines skipped.
pub fn load_station_file(path: impl AsRef<Path>) -> Result<Vec<StationId>, HarvestError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
    Ok(parse_station_lines(&text))
}

pub fn parse_station_lines(text: &str) -> Vec<StationId> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Deserialize)]
struct NetworkCollection {
    features: Vec<NetworkFeature>,
}

#[derive(Debug, Deserialize)]
struct NetworkFeature {
    properties: NetworkProperties,
}

#[derive(Debug, Deserialize)]
struct NetworkProperties {
    sid: String,
}

/// Extracts `features[].properties.sid` from an IEM network GeoJSON document.
pub fn station_ids_from_geojson(text: &str) -> Result<Vec<StationId>, HarvestError> {
    let collection: NetworkCollection = serde_json::from_str(text)?;
    Ok(collection
        .features
        .into_iter()
        .map(|f| f.properties.sid)
        .collect())
}

/// Fetches station ids for every network, in network order.
///
/// Metadata requests are not retried; the first failure aborts enumeration.
pub fn stations_from_networks<T: Transport, S: AsRef<str>>(
    transport: &T,
    base_url: &str,
    networks: &[S],
) -> Result<Vec<StationId>, HarvestError> {
    let mut stations = Vec::new();
    for network in networks {
        let url = build_network_url(base_url, network.as_ref());
        let text = transport.get_text(&url)?;
        stations.extend(station_ids_from_geojson(&text)?);
    }
    Ok(stations)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
