/// IEM (Iowa Environmental Mesonet) ASOS download client
///
/// Builds request URLs for the IEM ASOS bulk download service and provides
/// the blocking HTTP transport used by the retry fetcher.
///
/// API Documentation: https://mesonet.agron.iastate.edu/request/download.phtml
/// Network metadata: https://mesonet.agron.iastate.edu/geojson/network/IA_ASOS.geojson

use chrono::{Duration as DayDuration, NaiveDate};
use std::time::Duration;

use crate::ingest::retry::Transport;
use crate::model::{HarvestError, RequestWindow};

pub const IEM_BASE_URL: &str = "https://mesonet.agron.iastate.edu";

/// ASOS bulk download endpoint, including the query separator.
pub const ASOS_SERVICE_URL: &str = "https://mesonet.agron.iastate.edu/cgi-bin/request/asos.py?";

// ============================================================================
// Query Parameters
// ============================================================================

/// Fixed query parameters shared by every request in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceQuery {
    /// Which variables to return ("all" or a comma list such as "tmpf,p01i")
    pub data: String,
    /// Timezone for the `valid` column
    pub tz: String,
    /// Output format ("comma", "onlycomma", "tdf", ...)
    pub format: String,
    /// Whether to include lat/lon columns
    pub latlon: bool,
}

impl Default for ServiceQuery {
    fn default() -> Self {
        ServiceQuery {
            data: "all".to_string(),
            tz: "Etc/UTC".to_string(),
            format: "comma".to_string(),
            latlon: true,
        }
    }
}

// ============================================================================
// URL Builders
// ============================================================================

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn date_params(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}&{}",
        start.format("year1=%Y&month1=%m&day1=%d"),
        end.format("year2=%Y&month2=%m&day2=%d")
    )
}

/// Service URL without any date or station parameters.
///
/// # Example
/// `...asos.py?data=all&tz=Etc/UTC&format=comma&latlon=yes&`
pub fn build_query_prefix(base: &str, query: &ServiceQuery) -> String {
    format!(
        "{}data={}&tz={}&format={}&latlon={}&",
        base,
        query.data,
        query.tz,
        query.format,
        yes_no(query.latlon)
    )
}

/// Service URL for the whole request window, ready for a station suffix.
pub fn build_service_url(base: &str, query: &ServiceQuery, window: &RequestWindow) -> String {
    format!(
        "{}{}",
        build_query_prefix(base, query),
        date_params(window.start, window.end)
    )
}

/// Per-station request URI.
pub fn build_station_uri(service_url: &str, station: &str) -> String {
    format!("{}&station={}", service_url, station)
}

/// All-stations request URI covering the 24 hours starting at `day`.
/// The service caps station-less requests at one day of data.
pub fn build_day_uri(query_prefix: &str, day: NaiveDate) -> String {
    let next = day + DayDuration::days(1);
    format!("{}{}", query_prefix, date_params(day, next))
}

/// GeoJSON metadata URL for a network such as "NY_ASOS".
pub fn build_network_url(base: &str, network: &str) -> String {
    format!("{}/geojson/network/{}.geojson", base.trim_end_matches('/'), network)
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// Blocking reqwest transport with a fixed per-request timeout.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, HarvestError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HarvestError::Network(e.to_string()))?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, uri: &str) -> Result<String, HarvestError> {
        let response = self
            .client
            .get(uri)
            .send()
            .map_err(|e| HarvestError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HarvestError::Http(response.status().as_u16()));
        }

        let bytes = response
            .bytes()
            .map_err(|e| HarvestError::Network(e.to_string()))?;
        decode_body(&bytes)
    }
}

/// Strict UTF-8 decode of a response body. Invalid bytes fail the attempt
/// rather than being replaced.
pub fn decode_body(bytes: &[u8]) -> Result<String, HarvestError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| HarvestError::Network(format!("response is not valid UTF-8: {}", e)))
}

// ============================================================================
// Tests
// ============================================================================
