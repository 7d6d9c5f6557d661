//! Wait engine.
//!
//! Polls a predicate until it holds or the timeout elapses. A wait moves
//! `Pending -> Satisfied | TimedOut` exactly once; the first satisfying poll
//! ends it. Waiting never mutates the page.
//!
//! Time is measured with `tokio::time::Instant` so paused-clock tests run
//! instantly and deterministically.

use crate::assertion::{AssertionOutcome, ElementPredicate, Observation, PagePredicate};
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::VigiaResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default assertion timeout (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Floor for any polling interval; shorter intervals are raised to it
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Network idle threshold (500ms without new requests)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Page load states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// The `load` event fired
    #[default]
    Load,
    /// `DOMContentLoaded` fired
    #[serde(alias = "domcontentloaded")]
    DomContentLoaded,
    /// No new network requests for 500ms
    #[serde(alias = "networkidle")]
    NetworkIdle,
}

impl LoadState {
    /// Event name as used by browser tooling
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

// =============================================================================
// WAIT STATE AND OPTIONS
// =============================================================================

/// Lifecycle of one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    /// Still polling
    Pending,
    /// Predicate held
    Satisfied,
    /// Deadline passed first
    TimedOut,
}

impl WaitState {
    /// Terminal states never change again
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Satisfied => "satisfied",
            Self::TimedOut => "timed out",
        })
    }
}

pub(crate) const fn clamp_poll_interval(interval: Duration) -> Duration {
    if interval.as_millis() < MIN_POLL_INTERVAL_MS as u128 {
        Duration::from_millis(MIN_POLL_INTERVAL_MS)
    } else {
        interval
    }
}

/// Timeout and polling interval for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Defaults: 5000ms timeout, 100ms polling
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval, raised to at least [`MIN_POLL_INTERVAL_MS`]
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = clamp_poll_interval(poll_interval);
        self
    }

    /// Timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Polling interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// What one poll found
#[derive(Debug, Clone)]
pub(crate) struct Probe {
    pub(crate) satisfied: bool,
    pub(crate) found: bool,
    pub(crate) observation: Observation,
}

async fn poll_until<F, Fut>(
    subject: String,
    predicate: String,
    options: WaitOptions,
    mut probe: F,
) -> VigiaResult<AssertionOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = VigiaResult<Probe>>,
{
    let start = Instant::now();
    let mut polls = 0u32;
    let mut last_observed = Observation::NotPolled;
    let mut candidates_seen = false;

    let state = loop {
        polls += 1;
        match probe().await {
            Ok(found) => {
                candidates_seen |= found.found;
                last_observed = found.observation;
                if found.satisfied {
                    break WaitState::Satisfied;
                }
            }
            Err(e) if e.is_transient() => {
                trace!(error = %e, "transient error while polling");
                last_observed = Observation::Error {
                    message: e.to_string(),
                };
            }
            Err(e) => return Err(e),
        }

        let elapsed = start.elapsed();
        if elapsed >= options.timeout {
            break WaitState::TimedOut;
        }
        sleep(options.poll_interval.min(options.timeout - elapsed)).await;
    };

    let outcome = AssertionOutcome {
        subject,
        predicate,
        state,
        timeout_ms: options.timeout.as_millis() as u64,
        elapsed_ms: start.elapsed().as_millis() as u64,
        polls,
        last_observed,
        candidates_seen,
    };
    debug!(
        subject = %outcome.subject,
        predicate = %outcome.predicate,
        state = %outcome.state,
        polls = outcome.polls,
        elapsed_ms = outcome.elapsed_ms,
        "wait finished"
    );
    Ok(outcome)
}

async fn probe_element(
    page: &dyn PageDriver,
    locator: &Locator,
    predicate: &ElementPredicate,
) -> VigiaResult<Probe> {
    let handles = locator.resolve(page).await?;
    let satisfied = predicate.evaluate(locator, &handles)?;
    Ok(Probe {
        satisfied,
        found: !handles.is_empty(),
        observation: Observation::from_handles(&handles),
    })
}

async fn probe_page(page: &dyn PageDriver, predicate: &PagePredicate) -> VigiaResult<Probe> {
    let url = page.url().await?;
    let title = page.title().await?;
    Ok(Probe {
        satisfied: predicate.evaluate(&url, &title),
        found: true,
        observation: Observation::Page { url, title },
    })
}

/// Poll `predicate` on the element `locator` designates.
///
/// Returns the terminal outcome; a timeout is a value, not an error. Errors
/// are reserved for non-transient failures such as a strict-mode violation
/// or an invalid selector.
pub async fn wait_until(
    page: &dyn PageDriver,
    locator: &Locator,
    predicate: &ElementPredicate,
    options: WaitOptions,
) -> VigiaResult<AssertionOutcome> {
    poll_until(locator.to_string(), predicate.to_string(), options, || {
        probe_element(page, locator, predicate)
    })
    .await
}

/// Poll a page-level predicate (title, url)
pub async fn wait_for_page(
    page: &dyn PageDriver,
    predicate: &PagePredicate,
    options: WaitOptions,
) -> VigiaResult<AssertionOutcome> {
    poll_until("page".to_string(), predicate.to_string(), options, || {
        probe_page(page, predicate)
    })
    .await
}
