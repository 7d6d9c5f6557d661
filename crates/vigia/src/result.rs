//! Result and error types for Vigia.

use serde::Serialize;
use thiserror::Error;

/// Result type for Vigia operations
pub type VigiaResult<T> = Result<T, VigiaError>;

/// Errors that can occur while locating, waiting, or driving a page
#[derive(Debug, Error)]
pub enum VigiaError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser failed to start
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page-level driver error (evaluation, protocol, closed page)
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation failed
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// Target URL
        url: String,
        /// Error message
        message: String,
    },

    /// A load state was not reached in time
    #[error("Timed out after {timeout_ms}ms waiting for load state '{state}'")]
    LoadStateTimeout {
        /// Load state name
        state: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// No candidate element was ever observed for the selector
    #[error("No element matched {selector} within {timeout_ms}ms")]
    ElementNotFound {
        /// Selector that was attempted
        selector: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Candidates existed but the predicate never held
    #[error(
        "Timed out after {timeout_ms}ms waiting for {selector} to be {predicate}; last observed: {last_observed}"
    )]
    AssertionTimeout {
        /// Selector (or page) the predicate was evaluated against
        selector: String,
        /// Predicate description
        predicate: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
        /// Last observation before the deadline
        last_observed: String,
    },

    /// A click, fill, or key press could not be dispatched
    #[error("{action} on {selector} failed: {message}")]
    ActionFailure {
        /// Action name
        action: String,
        /// Selector of the target
        selector: String,
        /// Error message
        message: String,
    },

    /// A strict locator matched more than one element
    #[error("Strict mode violation: {selector} resolved to {count} elements")]
    StrictModeViolation {
        /// Selector
        selector: String,
        /// Number of matches
        count: usize,
    },

    /// Selector could not be parsed or evaluated
    #[error("Invalid selector {selector}: {message}")]
    InvalidSelector {
        /// Selector text
        selector: String,
        /// Error message
        message: String,
    },

    /// Text pattern could not be compiled
    #[error("Invalid text pattern {pattern}: {message}")]
    InvalidPattern {
        /// Pattern text
        pattern: String,
        /// Error message
        message: String,
    },

    /// Key or chord could not be parsed
    #[error("Invalid key {key}: {message}")]
    InvalidKey {
        /// Key text
        key: String,
        /// Error message
        message: String,
    },

    /// Scenario script is malformed
    #[error("Invalid scenario script: {message}")]
    InvalidScript {
        /// Error message
        message: String,
    },

    /// A scenario finished with a failure
    #[error("Scenario '{name}' failed at step {step}: {message}")]
    ScenarioFailed {
        /// Scenario name
        name: String,
        /// Zero-based step index
        step: usize,
        /// Failure message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Coarse classification of a failure for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Nothing matched the selector before the timeout
    ElementNotFound,
    /// Something matched but the predicate never held
    AssertionTimeout,
    /// Input could not be dispatched to the target
    ActionFailure,
    /// Strict locator matched several elements
    StrictModeViolation,
    /// Browser or page level error
    Driver,
    /// Invalid selector, key, pattern, script, or configuration
    Invalid,
}

impl VigiaError {
    /// Create a page error
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Create an action failure
    pub fn action(
        action: impl Into<String>,
        selector: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ActionFailure {
            action: action.into(),
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a script error
    pub fn script(message: impl Into<String>) -> Self {
        Self::InvalidScript {
            message: message.into(),
        }
    }

    /// Replace the selector of an action failure with a locator description.
    ///
    /// Drivers only know node ids; the page layer knows which locator the
    /// node came from.
    #[must_use]
    pub fn with_selector(self, selector: impl Into<String>) -> Self {
        match self {
            Self::ActionFailure {
                action, message, ..
            } => Self::ActionFailure {
                action,
                selector: selector.into(),
                message,
            },
            other => other,
        }
    }

    /// Replace the selector of any locator-bearing error.
    ///
    /// Used when a step's target was a fallback chain, so the report names
    /// every entry that was attempted rather than just the last.
    #[must_use]
    pub fn with_subject(self, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        match self {
            Self::ElementNotFound { timeout_ms, .. } => Self::ElementNotFound {
                selector: subject,
                timeout_ms,
            },
            Self::AssertionTimeout {
                predicate,
                timeout_ms,
                last_observed,
                ..
            } => Self::AssertionTimeout {
                selector: subject,
                predicate,
                timeout_ms,
                last_observed,
            },
            Self::StrictModeViolation { count, .. } => Self::StrictModeViolation {
                selector: subject,
                count,
            },
            other => other.with_selector(subject),
        }
    }

    /// Whether a poll that hit this error should keep polling
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::PageError { .. })
    }

    /// Classify the error
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::ElementNotFound { .. } => FailureKind::ElementNotFound,
            Self::AssertionTimeout { .. } | Self::LoadStateTimeout { .. } => {
                FailureKind::AssertionTimeout
            }
            Self::ActionFailure { .. } => FailureKind::ActionFailure,
            Self::StrictModeViolation { .. } => FailureKind::StrictModeViolation,
            Self::InvalidSelector { .. }
            | Self::InvalidPattern { .. }
            | Self::InvalidKey { .. }
            | Self::InvalidScript { .. }
            | Self::Config { .. } => FailureKind::Invalid,
            Self::BrowserNotFound
            | Self::BrowserLaunchError { .. }
            | Self::PageError { .. }
            | Self::NavigationError { .. }
            | Self::ScenarioFailed { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => FailureKind::Driver,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_element_not_found_display() {
        let err = VigiaError::ElementNotFound {
            selector: "css=#missing".to_string(),
            timeout_ms: 7000,
        };
        assert_eq!(
            err.to_string(),
            "No element matched css=#missing within 7000ms"
        );
        assert_eq!(err.kind(), FailureKind::ElementNotFound);
    }

    #[test]
    fn test_assertion_timeout_display_carries_observation() {
        let err = VigiaError::AssertionTimeout {
            selector: "getByRole('button')".to_string(),
            predicate: "hidden".to_string(),
            timeout_ms: 100,
            last_observed: "1 candidate, visible".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("100ms"));
        assert!(text.contains("hidden"));
        assert!(text.contains("1 candidate, visible"));
    }

    #[test]
    fn test_with_selector_rewrites_action_failure_only() {
        let err = VigiaError::action("click", "node#4", "element is detached")
            .with_selector("getByRole('link', { name: /Install/i })");
        assert!(err.to_string().starts_with("click on getByRole('link'"));

        let other = VigiaError::page("closed").with_selector("ignored");
        assert_eq!(other.to_string(), "Page error: closed");
    }

    #[test]
    fn test_with_subject_rewrites_locator_errors() {
        let err = VigiaError::ElementNotFound {
            selector: "css=[data-search]".to_string(),
            timeout_ms: 7000,
        }
        .with_subject("first available of [a | b]");
        assert_eq!(
            err.to_string(),
            "No element matched first available of [a | b] within 7000ms"
        );
        let err = VigiaError::config("bad").with_subject("ignored");
        assert_eq!(err.to_string(), "Configuration error: bad");
    }

    #[test]
    fn test_only_page_errors_are_transient() {
        assert!(VigiaError::page("evaluation failed").is_transient());
        assert!(!VigiaError::StrictModeViolation {
            selector: "css=a".to_string(),
            count: 2
        }
        .is_transient());
        assert!(!VigiaError::config("bad").is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: VigiaError = io.into();
        assert!(matches!(err, VigiaError::Io(_)));
        assert_eq!(err.kind(), FailureKind::Driver);
    }
}
