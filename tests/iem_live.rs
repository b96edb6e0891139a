/// Live checks against the IEM service.
///
/// Prerequisites:
/// - Internet access to mesonet.agron.iastate.edu
///
/// Run with: cargo test --test iem_live -- --ignored

use asos_harvest::ingest::iem::{
    build_service_url, build_station_uri, HttpTransport, ServiceQuery, ASOS_SERVICE_URL, IEM_BASE_URL,
};
use asos_harvest::ingest::retry::{RetryFetcher, RetryPolicy};
use asos_harvest::model::RequestWindow;
use asos_harvest::stations::stations_from_networks;
use asos_harvest::table::parse_delimited;
use chrono::NaiveDate;
use std::time::Duration;

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        timeout: Duration::from_secs(60),
        delay: Duration::from_secs(5),
    }
}

#[test]
#[ignore = "requires network access"]
fn test_ny_network_lists_jfk() {
    let transport = HttpTransport::new(Duration::from_secs(60)).expect("client should build");
    let stations = stations_from_networks(&transport, IEM_BASE_URL, &["NY_ASOS"])
        .expect("NY_ASOS metadata should load");
    assert!(stations.iter().any(|s| s == "JFK"), "JFK missing from NY_ASOS");
}

#[test]
#[ignore = "requires network access"]
fn test_jfk_one_day_download_parses() {
    let window = RequestWindow::new(
        NaiveDate::from_ymd_opt(2013, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2013, 1, 2).unwrap(),
    )
    .unwrap();
    let service = build_service_url(ASOS_SERVICE_URL, &ServiceQuery::default(), &window);
    let transport = HttpTransport::new(policy().timeout).expect("client should build");
    let fetcher = RetryFetcher::new(transport, policy());

    let body = fetcher.fetch(&build_station_uri(&service, "JFK"));
    assert!(!body.is_empty(), "IEM returned no data for JFK");

    let table = parse_delimited(&body, 5).expect("IEM body should parse");
    assert!(!table.headers.is_empty(), "no header row in IEM body");
}
