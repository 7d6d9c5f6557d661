//! Suites of scenarios and their aggregated results.

use crate::config::HarnessConfig;
use crate::driver::PageSource;
use crate::keyboard::Platform;
use crate::page::Page;
use crate::result::VigiaResult;
use crate::scenario::{Failure, Scenario, ScenarioOutcome, ScenarioRunner, ScenarioStatus, Step, SuiteScript};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// What the suite does after a scenario fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Run every scenario and report all failures
    #[default]
    CollectAll,
    /// Skip the remaining scenarios
    StopOnFirstFailure,
}

/// Named scenarios sharing setup steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    /// Suite name
    pub name: String,
    /// Steps run at the start of every scenario
    pub before_each: Vec<Step>,
    /// Scenarios in order
    pub scenarios: Vec<Scenario>,
    /// Failure handling
    pub failure_mode: FailureMode,
}

impl Suite {
    /// Empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before_each: Vec::new(),
            scenarios: Vec::new(),
            failure_mode: FailureMode::default(),
        }
    }

    /// Compile a YAML script for the current platform
    pub fn from_yaml_str(yaml: &str) -> VigiaResult<Self> {
        SuiteScript::from_yaml_str(yaml)?.compile(Platform::current())
    }

    /// Compile a YAML script file for the current platform
    pub fn from_file(path: impl AsRef<Path>) -> VigiaResult<Self> {
        SuiteScript::from_file(path)?.compile(Platform::current())
    }

    /// Set the shared setup steps
    #[must_use]
    pub fn with_before_each(mut self, steps: Vec<Step>) -> Self {
        self.before_each = steps;
        self
    }

    /// Add a scenario
    #[must_use]
    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Set the failure mode
    #[must_use]
    pub const fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Number of scenarios
    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }

    /// Run every scenario on its own page from `pages`.
    ///
    /// Scenario failures, including a page that cannot be opened, are
    /// reported in the results. Errors are returned only for an invalid
    /// `config`, before any page is opened.
    pub async fn run(
        &self,
        pages: &dyn PageSource,
        config: &HarnessConfig,
    ) -> VigiaResult<SuiteResults> {
        config.validate()?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let start = Instant::now();
        let runner = ScenarioRunner::new();
        info!(suite = %self.name, %run_id, scenarios = self.scenarios.len(), "suite started");

        let mut outcomes = Vec::with_capacity(self.scenarios.len());
        let mut stopped = false;
        for scenario in &self.scenarios {
            if stopped || scenario.skip {
                outcomes.push(ScenarioOutcome::skipped(&scenario.name));
                continue;
            }
            let outcome = match pages.new_page().await {
                Ok(driver) => {
                    let page = Page::new(driver, config.clone());
                    let outcome = runner
                        .run_with_setup(&page, scenario, &self.before_each)
                        .await;
                    if let Err(e) = page.close().await {
                        warn!(scenario = %scenario.name, error = %e, "page did not close cleanly");
                    }
                    outcome
                }
                Err(e) => {
                    warn!(scenario = %scenario.name, error = %e, "page could not be opened");
                    ScenarioOutcome::aborted(&scenario.name, &e)
                }
            };
            if outcome.status == ScenarioStatus::Failed
                && self.failure_mode == FailureMode::StopOnFirstFailure
            {
                stopped = true;
            }
            outcomes.push(outcome);
        }

        let results = SuiteResults {
            run_id,
            suite_name: self.name.clone(),
            started_at,
            outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            suite = %results.suite_name,
            passed = results.passed_count(),
            failed = results.failed_count(),
            skipped = results.skipped_count(),
            "suite finished"
        );
        Ok(results)
    }
}

/// Results of one suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResults {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Suite name
    pub suite_name: String,
    /// RFC 3339 start time
    pub started_at: String,
    /// Per-scenario outcomes, in suite order
    pub outcomes: Vec<ScenarioOutcome>,
    /// Total duration
    pub duration_ms: u64,
}

impl SuiteResults {
    /// Check if no scenario failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(ScenarioStatus::Passed)
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(ScenarioStatus::Failed)
    }

    /// Count skipped scenarios
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(ScenarioStatus::Skipped)
    }

    fn count(&self, status: ScenarioStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Failed scenarios with their failures
    #[must_use]
    pub fn failures(&self) -> Vec<(&str, &Failure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.failure.as_ref().map(|f| (o.name.as_str(), f)))
            .collect()
    }

    /// Outcome by scenario name
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// JSON report
    pub fn to_json(&self) -> VigiaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `Ok` when every scenario passed, otherwise the first failure
    pub fn into_result(self) -> VigiaResult<Self> {
        for outcome in &self.outcomes {
            outcome.clone().into_result()?;
        }
        Ok(self)
    }
}

impl fmt::Display for SuiteResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "suite {} (run {})", self.suite_name, self.run_id)?;
        for outcome in &self.outcomes {
            writeln!(f, "  {outcome}")?;
        }
        write!(
            f,
            "{} passed; {} failed; {} skipped; finished in {}ms",
            self.passed_count(),
            self.failed_count(),
            self.skipped_count(),
            self.duration_ms
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::assertion::PagePredicate;
    use crate::driver::{MemoryPage, MemoryPageSource, PageDriver};
    use crate::result::{FailureKind, VigiaError};
    use crate::text::TextMatcher;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn source() -> MemoryPageSource {
        MemoryPageSource::new(|| {
            let page = MemoryPage::new();
            page.route("https://docs.test/", |s| s.set_title("Docs"));
            page
        })
    }

    fn title_is(text: &str) -> Step {
        Step::expect_page(PagePredicate::Title(TextMatcher::exact(text)))
            .with_timeout(Duration::from_millis(200))
    }

    fn suite() -> Suite {
        Suite::new("docs")
            .with_before_each(vec![Step::goto("https://docs.test/")])
            .scenario(Scenario::new("good").step(title_is("Docs")))
            .scenario(Scenario::new("bad").step(title_is("Other")))
            .scenario(Scenario::new("after").step(title_is("Docs")))
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_all_runs_every_scenario_on_fresh_pages() {
        let pages = source();
        let results = suite().run(&pages, &HarnessConfig::default()).await.unwrap();
        assert_eq!(pages.pages_opened(), 3);
        assert_eq!(results.passed_count(), 2);
        assert_eq!(results.failed_count(), 1);
        assert!(!results.all_passed());
        let failures = results.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad");
        // setup step is index 0
        assert_eq!(failures[0].1.step_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_on_first_failure_skips_rest() {
        let pages = source();
        let results = suite()
            .with_failure_mode(FailureMode::StopOnFirstFailure)
            .run(&pages, &HarnessConfig::default())
            .await
            .unwrap();
        assert_eq!(pages.pages_opened(), 2);
        assert_eq!(results.skipped_count(), 1);
        assert_eq!(
            results.outcome("after").unwrap().status,
            ScenarioStatus::Skipped
        );
        assert!(results.into_result().is_err());
    }

    /// Opens pages from `inner`, failing the `fail_on`th request (1-based)
    #[derive(Debug)]
    struct CrashingSource {
        inner: MemoryPageSource,
        fail_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for CrashingSource {
        async fn new_page(&self) -> VigiaResult<Arc<dyn PageDriver>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                return Err(VigiaError::page("target crashed"));
            }
            self.inner.new_page().await
        }
    }

    fn crashing_on(fail_on: usize) -> CrashingSource {
        CrashingSource {
            inner: source(),
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }

    fn passing_suite() -> Suite {
        Suite::new("docs")
            .with_before_each(vec![Step::goto("https://docs.test/")])
            .scenario(Scenario::new("a").step(title_is("Docs")))
            .scenario(Scenario::new("b").step(title_is("Docs")))
            .scenario(Scenario::new("c").step(title_is("Docs")))
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_open_failure_is_scoped_to_its_scenario() {
        let pages = crashing_on(2);
        let results = passing_suite()
            .run(&pages, &HarnessConfig::default())
            .await
            .unwrap();

        assert_eq!(results.outcomes.len(), 3);
        assert!(results.outcome("a").unwrap().passed());
        assert!(results.outcome("c").unwrap().passed());
        let b = results.outcome("b").unwrap();
        assert_eq!(b.status, ScenarioStatus::Failed);
        assert!(b.steps.is_empty());
        let failure = b.failure.as_ref().unwrap();
        assert_eq!(failure.step_index, 0);
        assert_eq!(failure.kind, FailureKind::Driver);
        assert!(failure.message.contains("target crashed"));
        assert_eq!(pages.inner.pages_opened(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_open_failure_respects_stop_mode() {
        let pages = crashing_on(1);
        let results = passing_suite()
            .with_failure_mode(FailureMode::StopOnFirstFailure)
            .run(&pages, &HarnessConfig::default())
            .await
            .unwrap();
        assert_eq!(results.failed_count(), 1);
        assert_eq!(results.skipped_count(), 2);
        assert_eq!(pages.inner.pages_opened(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_rejected_before_any_page() {
        let pages = source();
        let err = suite()
            .run(
                &pages,
                &HarnessConfig::default().with_poll_interval(Duration::ZERO),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VigiaError::Config { .. }));
        assert_eq!(pages.pages_opened(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_json_and_summary() {
        let pages = source();
        let results = suite().run(&pages, &HarnessConfig::default()).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&results.to_json().unwrap()).unwrap();
        assert_eq!(json["suite_name"], "docs");
        assert_eq!(json["outcomes"].as_array().unwrap().len(), 3);
        assert!(json["started_at"].as_str().unwrap().ends_with('Z'));
        let summary = results.to_string();
        assert!(summary.ends_with(&format!(
            "2 passed; 1 failed; 0 skipped; finished in {}ms",
            results.duration_ms
        )));
    }
}
