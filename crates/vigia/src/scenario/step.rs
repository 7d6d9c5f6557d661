//! Scenario steps and their targets.

use crate::assertion::{ElementPredicate, PagePredicate};
use crate::fallback::FallbackChain;
use crate::keyboard::{Key, KeyChord, Platform};
use crate::locator::Locator;
use crate::page::Page;
use crate::result::VigiaResult;
use crate::selector::Selector;
use crate::wait::LoadState;
use std::fmt;
use std::time::Duration;

/// What a step acts on or asserts about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One locator
    Locator(Locator),
    /// First entry of a chain with a visible candidate
    FirstAvailable(FallbackChain),
}

/// A target resolved for one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Locator to act on
    pub locator: Locator,
    /// Name used in diagnostics
    pub description: String,
    /// Chain entry chosen, if the target was a chain
    pub fallback_index: Option<usize>,
}

impl Target {
    /// Pick the locator this step will use.
    ///
    /// An exhausted chain yields its last entry, described by every entry
    /// that was attempted.
    pub async fn resolve(&self, page: &Page) -> VigiaResult<ResolvedTarget> {
        match self {
            Self::Locator(locator) => Ok(ResolvedTarget {
                locator: locator.clone(),
                description: locator.to_string(),
                fallback_index: None,
            }),
            Self::FirstAvailable(chain) => {
                let found = page.resolve_first_available(chain).await?;
                let description = if found.matched {
                    found.locator.to_string()
                } else {
                    chain.to_string()
                };
                Ok(ResolvedTarget {
                    locator: found.locator,
                    description,
                    fallback_index: found.matched.then_some(found.index),
                })
            }
        }
    }
}

impl From<Locator> for Target {
    fn from(locator: Locator) -> Self {
        Self::Locator(locator)
    }
}

impl From<Selector> for Target {
    fn from(selector: Selector) -> Self {
        Self::Locator(Locator::new(selector))
    }
}

impl From<FallbackChain> for Target {
    fn from(chain: FallbackChain) -> Self {
        Self::FirstAvailable(chain)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locator(locator) => write!(f, "{locator}"),
            Self::FirstAvailable(chain) => write!(f, "{chain}"),
        }
    }
}

/// One action or expectation in a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Navigate (relative URLs join the configured base)
    Goto {
        /// URL
        url: String,
    },
    /// Wait for a load state
    WaitForLoadState(LoadState),
    /// Click once actionable
    Click {
        /// Target
        target: Target,
        /// Actionability timeout override
        timeout: Option<Duration>,
    },
    /// Fill once actionable
    Fill {
        /// Target
        target: Target,
        /// Text to enter
        text: String,
        /// Actionability timeout override
        timeout: Option<Duration>,
    },
    /// Press a chord
    Press(KeyChord),
    /// Click the button if present, otherwise press the shortcut
    Invoke {
        /// Button locator
        button: Locator,
        /// Shortcut chord, resolved for the platform at construction
        shortcut: KeyChord,
    },
    /// Every predicate must hold, in order
    Expect {
        /// Target
        target: Target,
        /// Predicates
        predicates: Vec<ElementPredicate>,
        /// Timeout override per predicate
        timeout: Option<Duration>,
    },
    /// Page-level predicate must hold
    ExpectPage {
        /// Predicate
        predicate: PagePredicate,
        /// Timeout override
        timeout: Option<Duration>,
    },
}

impl Step {
    /// Navigate to `url`
    pub fn goto(url: impl Into<String>) -> Self {
        Self::Goto { url: url.into() }
    }

    /// Wait for a load state
    pub const fn wait_for_load_state(state: LoadState) -> Self {
        Self::WaitForLoadState(state)
    }

    /// Click a target
    pub fn click(target: impl Into<Target>) -> Self {
        Self::Click {
            target: target.into(),
            timeout: None,
        }
    }

    /// Fill a target
    pub fn fill(target: impl Into<Target>, text: impl Into<String>) -> Self {
        Self::Fill {
            target: target.into(),
            text: text.into(),
            timeout: None,
        }
    }

    /// Press a chord
    pub fn press(chord: impl Into<KeyChord>) -> Self {
        Self::Press(chord.into())
    }

    /// Press the platform's primary modifier with `key`
    pub fn shortcut(key: Key, platform: Platform) -> Self {
        Self::Press(KeyChord::primary(key, platform))
    }

    /// Click `button` if it exists, otherwise press primary modifier + `key`
    pub fn invoke(button: Locator, key: Key, platform: Platform) -> Self {
        Self::Invoke {
            button,
            shortcut: KeyChord::primary(key, platform),
        }
    }

    /// Expect predicates on a target
    pub fn expect(
        target: impl Into<Target>,
        predicates: impl IntoIterator<Item = ElementPredicate>,
    ) -> Self {
        Self::Expect {
            target: target.into(),
            predicates: predicates.into_iter().collect(),
            timeout: None,
        }
    }

    /// Expect a page predicate
    pub const fn expect_page(predicate: PagePredicate) -> Self {
        Self::ExpectPage {
            predicate,
            timeout: None,
        }
    }

    /// Override the timeout of a waiting step; other steps are unchanged
    #[must_use]
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        match &mut self {
            Self::Click { timeout, .. }
            | Self::Fill { timeout, .. }
            | Self::Expect { timeout, .. }
            | Self::ExpectPage { timeout, .. } => *timeout = Some(duration),
            Self::Goto { .. } | Self::WaitForLoadState(_) | Self::Press(_) | Self::Invoke { .. } => {}
        }
        self
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Goto { url } => write!(f, "goto {url}"),
            Self::WaitForLoadState(state) => write!(f, "wait for load state {state}"),
            Self::Click { target, .. } => write!(f, "click {target}"),
            Self::Fill { target, text, .. } => write!(f, "fill {target} with '{text}'"),
            Self::Press(chord) => write!(f, "press {chord}"),
            Self::Invoke { button, shortcut } => {
                write!(f, "invoke {button} or press {shortcut}")
            }
            Self::Expect {
                target, predicates, ..
            } => {
                write!(f, "expect {target} to be ")?;
                for (i, p) in predicates.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    write!(f, "{p}")?;
                }
                Ok(())
            }
            Self::ExpectPage { predicate, .. } => write!(f, "expect page {predicate}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::aria::AriaRole;
    use crate::text::TextMatcher;

    #[test]
    fn test_shortcut_resolved_at_construction() {
        assert_eq!(
            Step::shortcut(Key::Char('k'), Platform::MacOs),
            Step::Press(KeyChord::parse("Meta+k", Platform::MacOs).unwrap())
        );
        assert_eq!(
            Step::shortcut(Key::Char('k'), Platform::Windows).to_string(),
            "press Control+k"
        );
    }

    #[test]
    fn test_with_timeout_only_touches_waiting_steps() {
        let d = Duration::from_millis(7000);
        let expect = Step::expect(Selector::role(AriaRole::Button), [ElementPredicate::Visible])
            .with_timeout(d);
        assert!(matches!(expect, Step::Expect { timeout: Some(t), .. } if t == d));
        assert_eq!(Step::goto("/").with_timeout(d), Step::goto("/"));
    }

    #[test]
    fn test_expect_display() {
        let step = Step::expect(
            Locator::new(Selector::css("input")).first(),
            [ElementPredicate::Visible, ElementPredicate::Focused],
        );
        assert_eq!(step.to_string(), "expect css=input.first() to be visible and focused");
        let page = Step::expect_page(PagePredicate::Title(TextMatcher::parse("/Playwright/").unwrap()));
        assert_eq!(page.to_string(), "expect page title /Playwright/");
    }
}
