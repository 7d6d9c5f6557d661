//! Fail-fast scenario execution.

use super::{Failure, Scenario, ScenarioOutcome, ScenarioStatus, Step, StepRecord, StepStatus};
use crate::affordance::Affordance;
use crate::assertion::AssertionOutcome;
use crate::page::Page;
use crate::result::VigiaResult;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Runs scenarios step by step, stopping at the first failure
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioRunner;

#[derive(Debug, Default)]
struct StepRun {
    assertions: Vec<AssertionOutcome>,
    detail: Option<String>,
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Run `scenario` on `page`
    pub async fn run(&self, page: &Page, scenario: &Scenario) -> ScenarioOutcome {
        self.run_with_setup(page, scenario, &[]).await
    }

    /// Run `setup` and then `scenario` on `page`; setup steps count as
    /// ordinary steps of the scenario
    pub async fn run_with_setup(
        &self,
        page: &Page,
        scenario: &Scenario,
        setup: &[Step],
    ) -> ScenarioOutcome {
        if scenario.skip {
            info!(scenario = %scenario.name, "skipped");
            return ScenarioOutcome::skipped(&scenario.name);
        }

        let start = Instant::now();
        info!(scenario = %scenario.name, "scenario started");
        let mut records = Vec::new();
        let mut failure = None;

        for (index, step) in setup.iter().chain(&scenario.steps).enumerate() {
            let step_start = Instant::now();
            let mut run = StepRun::default();
            let result = self.execute(page, step, &mut run).await;
            let status = if result.is_ok() {
                StepStatus::Passed
            } else {
                StepStatus::Failed
            };
            debug!(index, step = %step, ?status, "step finished");
            records.push(StepRecord {
                index,
                description: step.to_string(),
                status,
                elapsed_ms: step_start.elapsed().as_millis() as u64,
                assertions: run.assertions,
                detail: run.detail,
            });

            if let Err(e) = result {
                warn!(scenario = %scenario.name, index, error = %e, "step failed");
                let mut f = Failure::from_error(index, &e);
                if page.config().screenshot_on_failure {
                    f.screenshot = match page.screenshot().await {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            warn!(error = %e, "failure screenshot unavailable");
                            None
                        }
                    };
                }
                failure = Some(f);
                break;
            }
        }

        let status = if failure.is_some() {
            ScenarioStatus::Failed
        } else {
            ScenarioStatus::Passed
        };
        let outcome = ScenarioOutcome {
            name: scenario.name.clone(),
            status,
            steps: records,
            failure,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            scenario = %outcome.name,
            status = %outcome.status,
            duration_ms = outcome.duration_ms,
            "scenario finished"
        );
        outcome
    }

    async fn execute(&self, page: &Page, step: &Step, run: &mut StepRun) -> VigiaResult<()> {
        match step {
            Step::Goto { url } => page.goto(url).await,
            Step::WaitForLoadState(state) => page.wait_for_load_state(*state).await,
            Step::Press(chord) => page.press(chord).await,
            Step::Click { target, timeout } => {
                let resolved = target.resolve(page).await?;
                run.detail = note_fallback(resolved.fallback_index);
                page.click(&resolved.locator, *timeout)
                    .await
                    .map_err(|e| e.with_subject(&resolved.description))
            }
            Step::Fill {
                target,
                text,
                timeout,
            } => {
                let resolved = target.resolve(page).await?;
                run.detail = note_fallback(resolved.fallback_index);
                page.fill(&resolved.locator, text, *timeout)
                    .await
                    .map_err(|e| e.with_subject(&resolved.description))
            }
            Step::Invoke { button, shortcut } => {
                let affordance = Affordance::probe(page, button, shortcut).await?;
                run.detail = Some(affordance.to_string());
                affordance.invoke(page, None).await
            }
            Step::Expect {
                target,
                predicates,
                timeout,
            } => {
                let resolved = target.resolve(page).await?;
                run.detail = note_fallback(resolved.fallback_index);
                for predicate in predicates {
                    let outcome = page
                        .wait_until(&resolved.locator, predicate, *timeout)
                        .await
                        .map_err(|e| e.with_subject(&resolved.description))?
                        .with_subject(&resolved.description);
                    let satisfied = outcome.is_satisfied();
                    run.assertions.push(outcome);
                    if !satisfied {
                        return Err(run.assertions[run.assertions.len() - 1].to_error());
                    }
                }
                Ok(())
            }
            Step::ExpectPage { predicate, timeout } => {
                let outcome = page.wait_for_page(predicate, *timeout).await?;
                let error = (!outcome.is_satisfied()).then(|| outcome.to_error());
                run.assertions.push(outcome);
                error.map_or(Ok(()), Err)
            }
        }
    }
}

fn note_fallback(index: Option<usize>) -> Option<String> {
    index.map(|i| format!("fallback entry {i}"))
}
