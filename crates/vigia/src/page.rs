//! A page session: driver plus configuration.
//!
//! Actions wait for their target to be actionable (visible and enabled)
//! before dispatching input, the way a user would.

use crate::assertion::{AssertionOutcome, ElementPredicate, PagePredicate};
use crate::config::HarnessConfig;
use crate::driver::PageDriver;
use crate::fallback::{FallbackChain, FallbackMatch};
use crate::keyboard::KeyChord;
use crate::locator::Locator;
use crate::result::VigiaResult;
use crate::wait::{self, LoadState};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Join a possibly relative URL onto a base
pub fn join_url(base: Option<&str>, url: &str) -> String {
    match base {
        Some(base) if !url.contains("://") && !url.starts_with("about:") => {
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        }
        _ => url.to_string(),
    }
}

/// One browser page and the settings that govern waits on it
#[derive(Debug, Clone)]
pub struct Page {
    driver: Arc<dyn PageDriver>,
    config: Arc<HarnessConfig>,
}

impl Page {
    /// Wrap a driver
    pub fn new(driver: Arc<dyn PageDriver>, config: HarnessConfig) -> Self {
        Self {
            driver,
            config: Arc::new(config),
        }
    }

    /// Underlying driver
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    /// Configuration
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Navigate, then wait for the configured load state
    pub async fn goto(&self, url: &str) -> VigiaResult<()> {
        let target = join_url(self.config.base_url.as_deref(), url);
        debug!(url = %target, "navigating");
        self.driver.goto(&target).await?;
        self.wait_for_load_state(self.config.load_state).await
    }

    /// Wait for a load state within the navigation timeout
    pub async fn wait_for_load_state(&self, state: LoadState) -> VigiaResult<()> {
        self.driver
            .wait_for_load_state(state, self.config.navigation_timeout())
            .await
    }

    /// Current URL
    pub async fn url(&self) -> VigiaResult<String> {
        self.driver.url().await
    }

    /// Document title
    pub async fn title(&self) -> VigiaResult<String> {
        self.driver.title().await
    }

    /// Number of elements a locator matches right now
    pub async fn count(&self, locator: &Locator) -> VigiaResult<usize> {
        locator.count(self.driver()).await
    }

    /// Poll an element predicate; a timeout is returned as an outcome
    pub async fn wait_until(
        &self,
        locator: &Locator,
        predicate: &ElementPredicate,
        timeout: Option<Duration>,
    ) -> VigiaResult<AssertionOutcome> {
        wait::wait_until(
            self.driver(),
            locator,
            predicate,
            self.config.wait_options(timeout),
        )
        .await
    }

    /// Poll a page predicate; a timeout is returned as an outcome
    pub async fn wait_for_page(
        &self,
        predicate: &PagePredicate,
        timeout: Option<Duration>,
    ) -> VigiaResult<AssertionOutcome> {
        wait::wait_for_page(self.driver(), predicate, self.config.wait_options(timeout)).await
    }

    async fn actionable(&self, locator: &Locator, timeout: Option<Duration>) -> VigiaResult<()> {
        for predicate in [ElementPredicate::Visible, ElementPredicate::Enabled] {
            self.wait_until(locator, &predicate, timeout)
                .await?
                .into_result()?;
        }
        Ok(())
    }

    /// Click once the target is visible and enabled
    pub async fn click(&self, locator: &Locator, timeout: Option<Duration>) -> VigiaResult<()> {
        self.actionable(locator, timeout).await?;
        let target = locator.target(self.driver()).await?;
        debug!(locator = %locator, node = %target.node(), "click");
        self.driver
            .click(target.node())
            .await
            .map_err(|e| e.with_selector(locator.to_string()))
    }

    /// Fill once the target is visible and enabled
    pub async fn fill(
        &self,
        locator: &Locator,
        text: &str,
        timeout: Option<Duration>,
    ) -> VigiaResult<()> {
        self.actionable(locator, timeout).await?;
        let target = locator.target(self.driver()).await?;
        debug!(locator = %locator, node = %target.node(), "fill");
        self.driver
            .fill(target.node(), text)
            .await
            .map_err(|e| e.with_selector(locator.to_string()))
    }

    /// Press a chord against whatever has focus
    pub async fn press(&self, chord: &KeyChord) -> VigiaResult<()> {
        debug!(chord = %chord, "press");
        self.driver.press(chord).await
    }

    /// Pick the first fallback entry with a visible candidate
    pub async fn resolve_first_available(&self, chain: &FallbackChain) -> VigiaResult<FallbackMatch> {
        chain
            .resolve_first_available(
                self.driver(),
                self.config.probe_timeout(),
                self.config.poll_interval(),
            )
            .await
    }

    /// Screenshot of the viewport
    pub async fn screenshot(&self) -> VigiaResult<Vec<u8>> {
        self.driver.screenshot().await
    }

    /// Release the page
    pub async fn close(&self) -> VigiaResult<()> {
        self.driver.close().await
    }
}
