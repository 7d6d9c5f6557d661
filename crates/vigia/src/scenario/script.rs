//! YAML scenario scripts.
//!
//! ```yaml
//! name: docs search
//! base_url: https://playwright.dev/
//! before_each:
//!   - action: goto
//!     url: /
//! scenarios:
//!   - name: search opens
//!     steps:
//!       - action: invoke
//!         button: { role: button, name: "/Search/i", nth: first }
//!         shortcut: Primary+k
//!       - action: expect
//!         target:
//!           first_available:
//!             - { role: searchbox, nth: first }
//!             - { css: "input[type=search]", nth: first }
//!         to: { visible: true }
//!         timeout_ms: 7000
//! ```

use super::{Scenario, Step, Target};
use crate::assertion::{ElementPredicate, PagePredicate};
use crate::aria::parse_role;
use crate::fallback::FallbackChain;
use crate::keyboard::{KeyChord, Platform};
use crate::locator::Locator;
use crate::page::join_url;
use crate::result::{VigiaError, VigiaResult};
use crate::selector::Selector;
use crate::suite::{FailureMode, Suite};
use crate::text::TextMatcher;
use crate::wait::LoadState;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root of a scenario script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteScript {
    /// Suite name
    pub name: String,
    /// Joined with relative `goto` URLs
    #[serde(default)]
    pub base_url: Option<String>,
    /// Steps run at the start of every scenario
    #[serde(default)]
    pub before_each: Vec<StepScript>,
    /// What to do after a failed scenario
    #[serde(default)]
    pub failure_mode: FailureMode,
    /// Scenarios in order
    pub scenarios: Vec<ScenarioScript>,
}

/// One scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioScript {
    /// Scenario name
    pub name: String,
    /// List the scenario without running it
    #[serde(default)]
    pub skip: bool,
    /// Steps
    pub steps: Vec<StepScript>,
}

/// One step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepScript {
    /// Navigate
    Goto {
        /// URL, possibly relative
        url: String,
    },
    /// Wait for a load state
    WaitForLoadState {
        /// `load`, `dom_content_loaded`, or `network_idle`
        state: LoadState,
    },
    /// Click
    Click {
        /// Target
        target: TargetScript,
        /// Timeout override
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Fill
    Fill {
        /// Target
        target: TargetScript,
        /// Text
        text: String,
        /// Timeout override
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Press a chord such as `Enter` or `Primary+k`
    Press {
        /// Chord
        key: String,
    },
    /// Click a button if present, otherwise press a shortcut
    Invoke {
        /// Button
        button: LocatorScript,
        /// Shortcut chord
        shortcut: String,
    },
    /// Element expectations
    Expect {
        /// Target
        target: TargetScript,
        /// Predicates
        to: PredicateScript,
        /// Timeout override
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Page expectation; exactly one of `title` or `url`
    ExpectPage {
        /// Title matcher
        #[serde(default)]
        title: Option<String>,
        /// URL matcher
        #[serde(default)]
        url: Option<String>,
        /// Timeout override
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
}

/// A single locator or a fallback chain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetScript {
    /// Fallback chain
    Chain {
        /// Entries in order
        first_available: Vec<LocatorScript>,
    },
    /// One locator
    Single(LocatorScript),
}

/// Position written as an index or `first`/`last`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NthScript {
    /// Zero-based index
    Index(usize),
    /// `first` or `last`
    Named(String),
}

/// One locator; exactly one strategy key must be set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocatorScript {
    /// ARIA role
    #[serde(default)]
    pub role: Option<String>,
    /// Accessible name matcher (with `role`)
    #[serde(default)]
    pub name: Option<String>,
    /// Match name, placeholder, or text exactly
    #[serde(default)]
    pub exact: bool,
    /// Consider elements hidden from accessibility (with `role`)
    #[serde(default)]
    pub include_hidden: bool,
    /// CSS selector list
    #[serde(default)]
    pub css: Option<String>,
    /// Attribute name
    #[serde(default)]
    pub attribute: Option<String>,
    /// Attribute value must equal (with `attribute`)
    #[serde(default)]
    pub equals: Option<String>,
    /// Attribute value must contain (with `attribute`)
    #[serde(default)]
    pub contains: Option<String>,
    /// Placeholder matcher
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Text matcher
    #[serde(default)]
    pub text: Option<String>,
    /// Pick one match
    #[serde(default)]
    pub nth: Option<NthScript>,
}

/// Element predicates; checked in declaration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredicateScript {
    /// Visible
    #[serde(default)]
    pub visible: bool,
    /// Hidden or absent
    #[serde(default)]
    pub hidden: bool,
    /// Enabled
    #[serde(default)]
    pub enabled: bool,
    /// Disabled
    #[serde(default)]
    pub disabled: bool,
    /// Focused
    #[serde(default)]
    pub focused: bool,
    /// Text matcher
    #[serde(default)]
    pub text: Option<String>,
    /// Case-sensitive substring
    #[serde(default)]
    pub contains_text: Option<String>,
    /// Exact match count
    #[serde(default)]
    pub count: Option<usize>,
}

// =============================================================================
// COMPILATION
// =============================================================================

impl SuiteScript {
    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> VigiaResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> VigiaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Build a runnable suite; chords resolve for `platform`
    pub fn compile(&self, platform: Platform) -> VigiaResult<Suite> {
        let ctx = Context {
            base_url: self.base_url.as_deref(),
            platform,
        };
        let before_each = self
            .before_each
            .iter()
            .map(|s| s.compile(&ctx))
            .collect::<VigiaResult<Vec<_>>>()?;
        let mut suite = Suite::new(&self.name)
            .with_before_each(before_each)
            .with_failure_mode(self.failure_mode);
        for scenario in &self.scenarios {
            let steps = scenario
                .steps
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    s.compile(&ctx).map_err(|e| {
                        VigiaError::script(format!("{}, step {i}: {e}", scenario.name))
                    })
                })
                .collect::<VigiaResult<Vec<_>>>()?;
            let mut compiled = Scenario::new(&scenario.name).steps(steps);
            if scenario.skip {
                compiled = compiled.skipped();
            }
            suite = suite.scenario(compiled);
        }
        Ok(suite)
    }
}

struct Context<'a> {
    base_url: Option<&'a str>,
    platform: Platform,
}

fn timeout(ms: Option<u64>) -> Option<Duration> {
    ms.map(Duration::from_millis)
}

impl StepScript {
    fn compile(&self, ctx: &Context<'_>) -> VigiaResult<Step> {
        let step = match self {
            Self::Goto { url } => Step::goto(join_url(ctx.base_url, url)),
            Self::WaitForLoadState { state } => Step::wait_for_load_state(*state),
            Self::Click { target, timeout_ms } => Step::Click {
                target: target.compile()?,
                timeout: timeout(*timeout_ms),
            },
            Self::Fill {
                target,
                text,
                timeout_ms,
            } => Step::Fill {
                target: target.compile()?,
                text: text.clone(),
                timeout: timeout(*timeout_ms),
            },
            Self::Press { key } => Step::Press(KeyChord::parse(key, ctx.platform)?),
            Self::Invoke { button, shortcut } => Step::Invoke {
                button: button.compile()?,
                shortcut: KeyChord::parse(shortcut, ctx.platform)?,
            },
            Self::Expect {
                target,
                to,
                timeout_ms,
            } => Step::Expect {
                target: target.compile()?,
                predicates: to.compile()?,
                timeout: timeout(*timeout_ms),
            },
            Self::ExpectPage {
                title,
                url,
                timeout_ms,
            } => {
                let predicate = match (title, url) {
                    (Some(title), None) => PagePredicate::Title(TextMatcher::parse(title)?),
                    (None, Some(url)) => PagePredicate::Url(TextMatcher::parse(url)?),
                    _ => {
                        return Err(VigiaError::script(
                            "expect_page needs exactly one of title or url",
                        ))
                    }
                };
                Step::ExpectPage {
                    predicate,
                    timeout: timeout(*timeout_ms),
                }
            }
        };
        Ok(step)
    }
}

impl TargetScript {
    fn compile(&self) -> VigiaResult<Target> {
        match self {
            Self::Single(locator) => Ok(Target::Locator(locator.compile()?)),
            Self::Chain { first_available } => {
                let mut entries = first_available.iter();
                let first = entries
                    .next()
                    .ok_or_else(|| VigiaError::script("first_available needs at least one entry"))?;
                let mut chain = FallbackChain::new(first.compile()?);
                for entry in entries {
                    chain = chain.or(entry.compile()?);
                }
                Ok(Target::FirstAvailable(chain))
            }
        }
    }
}

impl LocatorScript {
    fn matcher(&self, value: &str) -> VigiaResult<TextMatcher> {
        if self.exact {
            Ok(TextMatcher::exact(value))
        } else {
            TextMatcher::parse(value)
        }
    }

    fn selector(&self) -> VigiaResult<Selector> {
        let strategies = [
            self.role.is_some(),
            self.css.is_some(),
            self.attribute.is_some(),
            self.placeholder.is_some(),
            self.text.is_some(),
        ];
        if strategies.iter().filter(|s| **s).count() != 1 {
            return Err(VigiaError::script(
                "locator needs exactly one of role, css, attribute, placeholder, or text",
            ));
        }
        if self.role.is_none() && (self.name.is_some() || self.include_hidden) {
            return Err(VigiaError::script("name and include_hidden need role"));
        }
        if self.attribute.is_none() && (self.equals.is_some() || self.contains.is_some()) {
            return Err(VigiaError::script("equals and contains need attribute"));
        }

        if let Some(role) = &self.role {
            let role = parse_role(role)?;
            let selector = match &self.name {
                Some(name) => Selector::role_named(role, self.matcher(name)?),
                None => Selector::role(role),
            };
            return Ok(if self.include_hidden {
                selector.including_hidden()
            } else {
                selector
            });
        }
        if let Some(css) = &self.css {
            return Ok(Selector::css(css));
        }
        if let Some(attribute) = &self.attribute {
            return match (&self.equals, &self.contains) {
                (None, None) => Ok(Selector::attribute_present(attribute)),
                (Some(value), None) => Ok(Selector::attribute_equals(attribute, value)),
                (None, Some(value)) => Ok(Selector::attribute_contains(attribute, value)),
                (Some(_), Some(_)) => Err(VigiaError::script(
                    "attribute takes equals or contains, not both",
                )),
            };
        }
        if let Some(placeholder) = &self.placeholder {
            return Ok(Selector::placeholder(self.matcher(placeholder)?));
        }
        match &self.text {
            Some(text) => Ok(Selector::text(self.matcher(text)?)),
            None => Err(VigiaError::script("locator has no strategy")),
        }
    }

    fn compile(&self) -> VigiaResult<Locator> {
        let locator = Locator::new(self.selector()?);
        match &self.nth {
            None => Ok(locator),
            Some(NthScript::Index(i)) => Ok(locator.nth(*i)),
            Some(NthScript::Named(name)) => match name.as_str() {
                "first" => Ok(locator.first()),
                "last" => Ok(locator.last()),
                other => Err(VigiaError::script(format!(
                    "nth must be an index, first, or last, got '{other}'"
                ))),
            },
        }
    }
}

impl PredicateScript {
    fn compile(&self) -> VigiaResult<Vec<ElementPredicate>> {
        let mut predicates = Vec::new();
        let flags = [
            (self.visible, ElementPredicate::Visible),
            (self.hidden, ElementPredicate::Hidden),
            (self.enabled, ElementPredicate::Enabled),
            (self.disabled, ElementPredicate::Disabled),
            (self.focused, ElementPredicate::Focused),
        ];
        predicates.extend(flags.into_iter().filter(|(on, _)| *on).map(|(_, p)| p));
        if let Some(text) = &self.text {
            predicates.push(ElementPredicate::HasText(TextMatcher::parse(text)?));
        }
        if let Some(text) = &self.contains_text {
            predicates.push(ElementPredicate::ContainsText(text.clone()));
        }
        if let Some(count) = self.count {
            predicates.push(ElementPredicate::Count(count));
        }
        if predicates.is_empty() {
            return Err(VigiaError::script("expect needs at least one predicate"));
        }
        Ok(predicates)
    }
}
