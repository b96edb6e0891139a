/// Core data types for the ASOS harvest tools.
///
/// This module defines the shared domain model imported by all other modules:
/// the request window, the fetch outcome, and the crate error type.
/// It contains no I/O.

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Station / window types
// ---------------------------------------------------------------------------

/// Short station code naming an observation site, e.g. "JFK".
/// Identity is the code string itself.
pub type StationId = String;

/// Start/end calendar dates shared by every request in one run.
///
/// Both bounds are passed to the IEM service as-is; the service treats the
/// end date as exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RequestWindow {
    /// Builds a window, rejecting an end date before the start date.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, HarvestError> {
        if end < start {
            return Err(HarvestError::Config(format!(
                "request window ends ({}) before it starts ({})",
                end, start
            )));
        }
        Ok(RequestWindow { start, end })
    }

    /// Every day in `[start, end)`, in order.
    pub fn days(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|day| *day < self.end)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Fetch outcome
// ---------------------------------------------------------------------------

/// Final state of one bounded-retry fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A usable body was obtained on attempt number `attempts`.
    Success { body: String, attempts: u32 },
    /// Every attempt failed.
    Exhausted { attempts: u32 },
}

impl FetchOutcome {
    /// Collapses the outcome to the string contract: the body on success,
    /// an empty string when retries ran out.
    pub fn into_body(self) -> String {
        match self {
            FetchOutcome::Success { body, .. } => body,
            FetchOutcome::Exhausted { .. } => String::new(),
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            FetchOutcome::Success { attempts, .. } | FetchOutcome::Exhausted { attempts } => {
                *attempts
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while fetching, parsing, or writing station data.
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestError {
    /// Non-2xx HTTP response.
    Http(u16),
    /// Connection, timeout, or body decoding failure.
    Network(String),
    /// The service answered with a body starting with `ERROR`.
    ServiceError(String),
    /// Delimited text or JSON could not be parsed.
    Parse(String),
    /// A file or directory could not be read or written.
    Io { path: String, message: String },
    /// Invalid or unreadable configuration.
    Config(String),
}

impl HarvestError {
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        HarvestError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for HarvestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarvestError::Http(code) => write!(f, "HTTP error: {}", code),
            HarvestError::Network(msg) => write!(f, "Network error: {}", msg),
            HarvestError::ServiceError(msg) => write!(f, "Service error: {}", msg),
            HarvestError::Parse(msg) => write!(f, "Parse error: {}", msg),
            HarvestError::Io { path, message } => write!(f, "I/O error on {}: {}", path, message),
            HarvestError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for HarvestError {}

impl From<csv::Error> for HarvestError {
    fn from(err: csv::Error) -> Self {
        HarvestError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for HarvestError {
    fn from(err: toml::de::Error) -> Self {
        HarvestError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_rejects_end_before_start() {
        let result = RequestWindow::new(date(2013, 8, 1), date(2013, 1, 1));
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_window_days_excludes_end() {
        let window = RequestWindow::new(date(2013, 1, 1), date(2013, 1, 3)).unwrap();
        assert_eq!(window.days(), vec![date(2013, 1, 1), date(2013, 1, 2)]);
    }

    #[test]
    fn test_exhausted_outcome_collapses_to_empty_string() {
        let outcome = FetchOutcome::Exhausted { attempts: 6 };
        assert_eq!(outcome.attempts(), 6);
        assert_eq!(outcome.into_body(), "");
    }

    #[test]
    fn test_error_display_names_the_cause() {
        assert_eq!(HarvestError::Http(503).to_string(), "HTTP error: 503");
        let io = HarvestError::Io {
            path: "/tmp/x".to_string(),
            message: "denied".to_string(),
        };
        assert_eq!(io.to_string(), "I/O error on /tmp/x: denied");
    }
}
