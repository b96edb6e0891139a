//! Bounded-retry text download.
//!
//! The IEM download service rate-limits inbound requests, so individual
//! downloads are retried a fixed number of times with a constant pause in
//! between. The fetcher never returns an error: a URI that fails on every
//! attempt yields `FetchOutcome::Exhausted`, which collapses to an empty
//! string for callers using the string contract.
//!
//! # Injection
//! The network call and the pause sit behind the `Transport` and `Sleeper`
//! traits so the retry loop runs in tests without a network or a real clock.

use std::time::Duration;

use crate::logging;
use crate::model::{FetchOutcome, HarvestError};

/// Bodies starting with this marker are service-side refusals.
pub const SERVICE_ERROR_MARKER: &str = "ERROR";

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Blocking text GET.
pub trait Transport {
    fn get_text(&self, uri: &str) -> Result<String, HarvestError>;
}

/// Blocking pause between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get_text(&self, uri: &str) -> Result<String, HarvestError> {
        (**self).get_text(uri)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Sleeps the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Retry parameters, fixed for the lifetime of a fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Per-request timeout; applied by the transport.
    pub timeout: Duration,
    /// Constant pause after a failed attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 6,
            timeout: Duration::from_secs(300),
            delay: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Retry loop state. `Attempt(n)` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchState {
    Attempt(u32),
    Done(FetchOutcome),
}

/// Classifies one transport result: a body not starting with `ERROR` is
/// usable, anything else is a failed attempt.
pub fn classify_response(result: Result<String, HarvestError>) -> Result<String, HarvestError> {
    let body = result?;
    if body.starts_with(SERVICE_ERROR_MARKER) {
        let first_line = body.lines().next().unwrap_or_default().to_string();
        return Err(HarvestError::ServiceError(first_line));
    }
    Ok(body)
}

pub struct RetryFetcher<T: Transport, S: Sleeper = ThreadSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl<T: Transport> RetryFetcher<T, ThreadSleeper> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, ThreadSleeper, policy)
    }
}

impl<T: Transport, S: Sleeper> RetryFetcher<T, S> {
    pub fn with_sleeper(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        RetryFetcher {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs the retry loop to completion for `uri`.
    pub fn fetch_outcome(&self, uri: &str) -> FetchOutcome {
        let max = self.policy.max_attempts;
        if max == 0 {
            logging::log_fetch_exhausted(uri, 0);
            return FetchOutcome::Exhausted { attempts: 0 };
        }

        let mut state = FetchState::Attempt(1);
        loop {
            state = match state {
                FetchState::Done(outcome) => return outcome,
                FetchState::Attempt(n) => {
                    match classify_response(self.transport.get_text(uri)) {
                        Ok(body) => FetchState::Done(FetchOutcome::Success { body, attempts: n }),
                        Err(err) => {
                            logging::log_fetch_failure(uri, n, max, &err);
                            if n < max {
                                self.sleeper.sleep(self.policy.delay);
                                FetchState::Attempt(n + 1)
                            } else {
                                logging::log_fetch_exhausted(uri, n);
                                FetchState::Done(FetchOutcome::Exhausted { attempts: n })
                            }
                        }
                    }
                }
            };
        }
    }

    /// String contract: the body, or `""` when every attempt failed.
    pub fn fetch(&self, uri: &str) -> String {
        self.fetch_outcome(uri).into_body()
    }
}
