//! Element and page predicates, observations, and assertion outcomes.
//!
//! Predicates are pure: evaluating one against a set of handles never
//! touches the page. Polling lives in [`crate::wait`].

use crate::dom::ElementHandle;
use crate::locator::{check_strict, Locator};
use crate::page::Page;
use crate::result::{VigiaError, VigiaResult};
use crate::text::{normalize_whitespace, TextMatcher};
use crate::wait::WaitState;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

// =============================================================================
// PREDICATES
// =============================================================================

/// Condition on the element a locator designates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementPredicate {
    /// Rendered with a non-empty box
    Visible,
    /// Not visible, or no element matches
    Hidden,
    /// Not disabled
    Enabled,
    /// Disabled
    Disabled,
    /// Has keyboard focus
    Focused,
    /// Text content matches
    HasText(TextMatcher),
    /// Text content contains a substring (case-sensitive)
    ContainsText(String),
    /// Exactly this many matches
    Count(usize),
}

impl ElementPredicate {
    /// Evaluate against handles resolved for `locator`.
    ///
    /// `Count` is never strict. Every other predicate inspects the single
    /// designated element and fails with `StrictModeViolation` when a strict
    /// locator matched several.
    pub fn evaluate(&self, locator: &Locator, handles: &[ElementHandle]) -> VigiaResult<bool> {
        let target = || designated(locator, handles);
        let holds = match self {
            Self::Count(expected) => handles.len() == *expected,
            Self::Hidden => target()?.map_or(true, |h| !h.is_visible()),
            Self::Visible => target()?.is_some_and(ElementHandle::is_visible),
            Self::Enabled => target()?.is_some_and(ElementHandle::is_enabled),
            Self::Disabled => target()?.is_some_and(|h| !h.is_enabled()),
            Self::Focused => target()?.is_some_and(ElementHandle::is_focused),
            Self::HasText(matcher) => target()?.is_some_and(|h| matcher.matches(&h.text())),
            Self::ContainsText(needle) => {
                let needle = normalize_whitespace(needle);
                target()?.is_some_and(|h| h.text().contains(&needle))
            }
        };
        Ok(holds)
    }
}

fn designated<'a>(
    locator: &Locator,
    handles: &'a [ElementHandle],
) -> VigiaResult<Option<&'a ElementHandle>> {
    check_strict(locator, handles)?;
    Ok(handles.first())
}

impl fmt::Display for ElementPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => write!(f, "visible"),
            Self::Hidden => write!(f, "hidden"),
            Self::Enabled => write!(f, "enabled"),
            Self::Disabled => write!(f, "disabled"),
            Self::Focused => write!(f, "focused"),
            Self::HasText(matcher) => write!(f, "text {matcher}"),
            Self::ContainsText(text) => write!(f, "containing text '{text}'"),
            Self::Count(n) => write!(f, "count {n}"),
        }
    }
}

/// Condition on the page itself
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PagePredicate {
    /// Document title matches
    Title(TextMatcher),
    /// URL matches
    Url(TextMatcher),
}

impl PagePredicate {
    /// Evaluate against an observed url and title
    pub fn evaluate(&self, url: &str, title: &str) -> bool {
        match self {
            Self::Title(matcher) => matcher.matches(title),
            Self::Url(matcher) => matcher.matches(url),
        }
    }
}

impl fmt::Display for PagePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title(matcher) => write!(f, "title {matcher}"),
            Self::Url(matcher) => write!(f, "url {matcher}"),
        }
    }
}

// =============================================================================
// OBSERVATIONS AND OUTCOMES
// =============================================================================

/// What the most recent poll saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// No poll completed
    NotPolled,
    /// The locator matched nothing
    NoCandidates,
    /// The locator matched elements
    Candidates {
        /// Number of matches
        count: usize,
        /// Summary of the first match
        first: String,
    },
    /// Page url and title
    Page {
        /// URL
        url: String,
        /// Title
        title: String,
    },
    /// The poll hit a transient driver error
    Error {
        /// Error text
        message: String,
    },
}

impl Observation {
    /// Summarize resolved handles
    pub fn from_handles(handles: &[ElementHandle]) -> Self {
        handles.first().map_or(Self::NoCandidates, |first| Self::Candidates {
            count: handles.len(),
            first: first.to_string(),
        })
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPolled => write!(f, "not polled"),
            Self::NoCandidates => write!(f, "no matching elements"),
            Self::Candidates { count: 1, first } => write!(f, "1 element: {first}"),
            Self::Candidates { count, first } => write!(f, "{count} elements, first: {first}"),
            Self::Page { url, title } => write!(f, "url {url}, title '{title}'"),
            Self::Error { message } => write!(f, "error: {message}"),
        }
    }
}

/// Result of one wait: terminal state plus diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionOutcome {
    /// Locator (or `page`) the predicate was evaluated against
    pub subject: String,
    /// Predicate description
    pub predicate: String,
    /// Terminal wait state
    pub state: WaitState,
    /// Timeout that applied
    pub timeout_ms: u64,
    /// Time spent waiting
    pub elapsed_ms: u64,
    /// Number of polls
    pub polls: u32,
    /// Last observation
    pub last_observed: Observation,
    /// Some poll observed at least one candidate
    pub candidates_seen: bool,
}

impl AssertionOutcome {
    /// Predicate held
    pub fn is_satisfied(&self) -> bool {
        self.state == WaitState::Satisfied
    }

    /// Replace the subject shown in diagnostics
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Error describing an unsatisfied outcome
    pub fn to_error(&self) -> VigiaError {
        if self.candidates_seen || matches!(self.last_observed, Observation::Error { .. }) {
            VigiaError::AssertionTimeout {
                selector: self.subject.clone(),
                predicate: self.predicate.clone(),
                timeout_ms: self.timeout_ms,
                last_observed: self.last_observed.to_string(),
            }
        } else {
            VigiaError::ElementNotFound {
                selector: self.subject.clone(),
                timeout_ms: self.timeout_ms,
            }
        }
    }

    /// `Ok` when satisfied, otherwise the matching error
    pub fn into_result(self) -> VigiaResult<Self> {
        if self.is_satisfied() {
            Ok(self)
        } else {
            Err(self.to_error())
        }
    }
}

impl fmt::Display for AssertionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} after {}ms ({} polls)",
            self.subject, self.predicate, self.state, self.elapsed_ms, self.polls
        )
    }
}

// =============================================================================
// EXPECT API
// =============================================================================

/// Start an element assertion
pub fn expect(locator: impl Into<Locator>) -> Expect {
    Expect {
        locator: locator.into(),
    }
}

/// Start a page assertion
pub const fn expect_page() -> ExpectPage {
    ExpectPage
}

/// Element assertion builder
#[derive(Debug, Clone)]
pub struct Expect {
    locator: Locator,
}

impl Expect {
    fn assertion(&self, predicate: ElementPredicate) -> ElementAssertion {
        ElementAssertion {
            locator: self.locator.clone(),
            predicate,
            timeout: None,
        }
    }

    /// Element becomes visible
    pub fn to_be_visible(&self) -> ElementAssertion {
        self.assertion(ElementPredicate::Visible)
    }

    /// Element becomes hidden or disappears
    pub fn to_be_hidden(&self) -> ElementAssertion {
        self.assertion(ElementPredicate::Hidden)
    }

    /// Element is enabled
    pub fn to_be_enabled(&self) -> ElementAssertion {
        self.assertion(ElementPredicate::Enabled)
    }

    /// Element is disabled
    pub fn to_be_disabled(&self) -> ElementAssertion {
        self.assertion(ElementPredicate::Disabled)
    }

    /// Element has focus
    pub fn to_be_focused(&self) -> ElementAssertion {
        self.assertion(ElementPredicate::Focused)
    }

    /// Element text matches
    pub fn to_have_text(&self, matcher: TextMatcher) -> ElementAssertion {
        self.assertion(ElementPredicate::HasText(matcher))
    }

    /// Element text contains a substring
    pub fn to_contain_text(&self, text: impl Into<String>) -> ElementAssertion {
        self.assertion(ElementPredicate::ContainsText(text.into()))
    }

    /// Locator matches exactly `count` elements
    pub fn to_have_count(&self, count: usize) -> ElementAssertion {
        self.assertion(ElementPredicate::Count(count))
    }
}

/// A predicate bound to a locator, with an optional timeout override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementAssertion {
    locator: Locator,
    predicate: ElementPredicate,
    timeout: Option<Duration>,
}

impl ElementAssertion {
    /// Override the page's default timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Locator
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Predicate
    pub const fn predicate(&self) -> &ElementPredicate {
        &self.predicate
    }

    /// Wait on `page`; errors when the predicate does not hold in time
    pub async fn check(&self, page: &Page) -> VigiaResult<AssertionOutcome> {
        page.wait_until(&self.locator, &self.predicate, self.timeout)
            .await?
            .into_result()
    }
}

/// Page assertion builder
#[derive(Debug, Clone, Copy)]
pub struct ExpectPage;

impl ExpectPage {
    /// Title matches
    pub fn to_have_title(self, matcher: TextMatcher) -> PageAssertion {
        PageAssertion {
            predicate: PagePredicate::Title(matcher),
            timeout: None,
        }
    }

    /// URL matches
    pub fn to_have_url(self, matcher: TextMatcher) -> PageAssertion {
        PageAssertion {
            predicate: PagePredicate::Url(matcher),
            timeout: None,
        }
    }
}

/// A page predicate with an optional timeout override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAssertion {
    predicate: PagePredicate,
    timeout: Option<Duration>,
}

impl PageAssertion {
    /// Override the page's default timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait on `page`; errors when the predicate does not hold in time
    pub async fn check(&self, page: &Page) -> VigiaResult<AssertionOutcome> {
        page.wait_for_page(&self.predicate, self.timeout)
            .await?
            .into_result()
    }
}
