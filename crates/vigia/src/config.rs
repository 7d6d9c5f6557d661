//! Harness configuration.
//!
//! Layers, later wins: built-in defaults, a YAML file, then environment
//! variables (`VIGIA_BASE_URL`, `VIGIA_TIMEOUT_MS`, `VIGIA_POLL_INTERVAL_MS`,
//! `VIGIA_HEADLESS`, `CHROMIUM_PATH`).

use crate::result::{VigiaError, VigiaResult};
use crate::wait::{
    clamp_poll_interval, LoadState, WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Base URL override
pub const ENV_BASE_URL: &str = "VIGIA_BASE_URL";
/// Default timeout override (milliseconds)
pub const ENV_TIMEOUT_MS: &str = "VIGIA_TIMEOUT_MS";
/// Poll interval override (milliseconds)
pub const ENV_POLL_INTERVAL_MS: &str = "VIGIA_POLL_INTERVAL_MS";
/// Headless override (`true`/`false`/`1`/`0`)
pub const ENV_HEADLESS: &str = "VIGIA_HEADLESS";
/// Chromium executable
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";

/// Settings shared by every scenario of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Joined with relative `goto` URLs
    pub base_url: Option<String>,
    /// Assertion timeout when a step gives none
    pub default_timeout_ms: u64,
    /// Delay between polls
    pub poll_interval_ms: u64,
    /// How long a fallback chain keeps probing (0 = single check)
    pub probe_timeout_ms: u64,
    /// Navigation and load-state timeout
    pub navigation_timeout_ms: u64,
    /// Load state awaited after `goto`
    pub load_state: LoadState,
    /// Run the browser headless
    pub headless: bool,
    /// Chromium executable
    pub chromium_path: Option<String>,
    /// Keep the Chromium sandbox (containers usually need it off)
    pub sandbox: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Capture a screenshot when a scenario fails
    pub screenshot_on_failure: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            probe_timeout_ms: 0,
            navigation_timeout_ms: 30_000,
            load_state: LoadState::Load,
            headless: true,
            chromium_path: None,
            sandbox: true,
            viewport_width: 1280,
            viewport_height: 720,
            screenshot_on_failure: false,
        }
    }
}

impl HarnessConfig {
    /// Defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> VigiaResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> VigiaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Defaults, optional file, process environment, then validation
    pub fn load(path: Option<&Path>) -> VigiaResult<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> VigiaResult<Self> {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            self.default_timeout_ms = parse_ms(ENV_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_ms(ENV_POLL_INTERVAL_MS, &ms)?;
        }
        if let Some(flag) = lookup(ENV_HEADLESS) {
            self.headless = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(VigiaError::config(format!(
                        "{ENV_HEADLESS} must be true or false, got '{other}'"
                    )))
                }
            };
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH).filter(|v| !v.is_empty()) {
            self.chromium_path = Some(path);
        }
        Ok(self)
    }

    /// Reject settings that would make every wait meaningless
    pub fn validate(&self) -> VigiaResult<()> {
        if self.default_timeout_ms == 0 {
            return Err(VigiaError::config("default_timeout_ms must be greater than 0"));
        }
        if self.navigation_timeout_ms == 0 {
            return Err(VigiaError::config(
                "navigation_timeout_ms must be greater than 0",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(VigiaError::config("poll_interval_ms must be greater than 0"));
        }
        if self.poll_interval_ms > self.default_timeout_ms {
            return Err(VigiaError::config(format!(
                "poll_interval_ms ({}) exceeds default_timeout_ms ({})",
                self.poll_interval_ms, self.default_timeout_ms
            )));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(VigiaError::config("viewport dimensions must be non-zero"));
        }
        Ok(())
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the default assertion timeout
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the fallback probe window
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Enable or disable the Chromium sandbox
    #[must_use]
    pub const fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Set the load state awaited after navigation
    #[must_use]
    pub const fn with_load_state(mut self, state: LoadState) -> Self {
        self.load_state = state;
        self
    }

    /// Capture screenshots of failing scenarios
    #[must_use]
    pub const fn with_screenshot_on_failure(mut self, enabled: bool) -> Self {
        self.screenshot_on_failure = enabled;
        self
    }

    /// Default assertion timeout
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Polling interval, never below the wait engine's floor
    pub const fn poll_interval(&self) -> Duration {
        clamp_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }

    /// Fallback probe window
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Navigation timeout
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Wait options with an optional timeout override
    pub fn wait_options(&self, timeout: Option<Duration>) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(timeout.unwrap_or_else(|| self.default_timeout()))
            .with_poll_interval(self.poll_interval())
    }
}

fn parse_ms(key: &str, value: &str) -> VigiaResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| VigiaError::config(format!("{key} must be milliseconds: {e}")))
}
