//! Scenarios: ordered steps run against one fresh page.
//!
//! A scenario stops at its first failing step. Outcomes record each step
//! that ran, every assertion state it produced, and the failure that ended
//! the run.

mod runner;
mod script;
mod step;

pub use runner::ScenarioRunner;
pub use script::{
    LocatorScript, NthScript, PredicateScript, ScenarioScript, StepScript, SuiteScript,
    TargetScript,
};
pub use step::{ResolvedTarget, Step, Target};

use crate::assertion::AssertionOutcome;
use crate::result::{FailureKind, VigiaError, VigiaResult};
use crate::wait::WaitState;
use serde::Serialize;
use std::fmt;

/// A named sequence of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Steps in order
    pub steps: Vec<Step>,
    /// Listed but not run
    pub skip: bool,
}

impl Scenario {
    /// Empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            skip: false,
        }
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Mark the scenario skipped
    #[must_use]
    pub const fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// No steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Final status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Every step succeeded
    Passed,
    /// A step failed
    Failed,
    /// Not run
    Skipped,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Status of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Completed
    Passed,
    /// Ended the scenario
    Failed,
}

/// What one step did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Zero-based index
    pub index: usize,
    /// Step description
    pub description: String,
    /// Status
    pub status: StepStatus,
    /// Time spent
    pub elapsed_ms: u64,
    /// Assertions evaluated, including the unsatisfied one on failure
    pub assertions: Vec<AssertionOutcome>,
    /// Resolution notes, such as the fallback entry or affordance chosen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Why a scenario failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Step that failed
    pub step_index: usize,
    /// Classification
    pub kind: FailureKind,
    /// Error text
    pub message: String,
    /// Screenshot taken after the failure
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
}

impl Failure {
    /// Failure of step `step_index` with `error`
    pub fn from_error(step_index: usize, error: &VigiaError) -> Self {
        Self {
            step_index,
            kind: error.kind(),
            message: error.to_string(),
            screenshot: None,
        }
    }
}

/// Result of running one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario name
    pub name: String,
    /// Final status
    pub status: ScenarioStatus,
    /// Steps that ran
    pub steps: Vec<StepRecord>,
    /// Failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    /// Total time
    pub duration_ms: u64,
}

impl ScenarioOutcome {
    /// Outcome for a scenario that was not run
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Skipped,
            steps: Vec::new(),
            failure: None,
            duration_ms: 0,
        }
    }

    /// Outcome for a scenario that never got a page; the failure points
    /// at step 0
    pub fn aborted(name: impl Into<String>, error: &VigiaError) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Failed,
            steps: Vec::new(),
            failure: Some(Failure::from_error(0, error)),
            duration_ms: 0,
        }
    }

    /// Passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    /// Terminal states of every assertion, in evaluation order
    #[must_use]
    pub fn assertion_states(&self) -> Vec<WaitState> {
        self.steps
            .iter()
            .flat_map(|s| s.assertions.iter().map(|a| a.state))
            .collect()
    }

    /// `Ok` unless the scenario failed
    pub fn into_result(self) -> VigiaResult<Self> {
        match &self.failure {
            Some(failure) if self.status == ScenarioStatus::Failed => {
                Err(VigiaError::ScenarioFailed {
                    name: self.name.clone(),
                    step: failure.step_index,
                    message: failure.message.clone(),
                })
            }
            _ => Ok(self),
        }
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ... {} ({}ms)", self.name, self.status, self.duration_ms)?;
        if let Some(failure) = &self.failure {
            write!(f, "\n    step {}: {}", failure.step_index, failure.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn failed() -> ScenarioOutcome {
        ScenarioOutcome {
            name: "search".to_string(),
            status: ScenarioStatus::Failed,
            steps: Vec::new(),
            failure: Some(Failure::from_error(
                2,
                &VigiaError::ElementNotFound {
                    selector: "css=input".to_string(),
                    timeout_ms: 7000,
                },
            )),
            duration_ms: 7012,
        }
    }

    #[test]
    fn test_builder() {
        let scenario = Scenario::new("home")
            .step(Step::goto("/"))
            .steps([Step::goto("/docs"), Step::goto("/api")]);
        assert_eq!(scenario.len(), 3);
        assert!(!scenario.skip);
        assert!(Scenario::new("x").skipped().skip);
    }

    #[test]
    fn test_failed_outcome_into_result() {
        let err = failed().into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Scenario 'search' failed at step 2: No element matched css=input within 7000ms"
        );
        assert!(ScenarioOutcome::skipped("later").into_result().is_ok());
    }

    #[test]
    fn test_display_and_json() {
        let outcome = failed();
        assert!(outcome.to_string().starts_with("search ... failed (7012ms)"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failure"]["kind"], "element_not_found");
        assert!(json["failure"].get("screenshot").is_none());
    }
}
