//! Vigia: declarative UI assertions against a live page.
//!
//! Vigia (Spanish: "watch, lookout") drives a page the way a user would and
//! asserts on what an assistive technology would see. Elements are found by
//! ARIA role and accessible name first, CSS and attributes second, and every
//! expectation polls until it holds or its timeout expires.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌─────────────┐   ┌────────────┐
//! │ Suite /     │──►│ Scenario     │──►│ Page        │──►│ PageDriver │
//! │ YAML script │   │ Runner       │   │ (waits,     │   │ (Chromium, │
//! │             │   │ (fail-fast)  │   │  actions)   │   │  memory)   │
//! └─────────────┘   └──────────────┘   └─────────────┘   └────────────┘
//!                          │                  │
//!                          ▼                  ▼
//!                   Fallback chains     Locator resolver
//!                   and affordances     and wait engine
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vigia::prelude::*;
//!
//! # async fn run(driver: Arc<dyn PageDriver>) -> VigiaResult<()> {
//! let page = Page::new(driver, HarnessConfig::default());
//! page.goto("https://playwright.dev/").await?;
//! expect_page()
//!     .to_have_title(TextMatcher::regex("Playwright")?)
//!     .check(&page)
//!     .await?;
//! let get_started = Locator::new(Selector::role_named(
//!     AriaRole::Link,
//!     TextMatcher::regex_with_flags("Get started", "i")?,
//! ));
//! expect(get_started).to_be_visible().check(&page).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod affordance;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod aria;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod assertion;
#[allow(clippy::missing_errors_doc)]
mod config;
#[allow(clippy::must_use_candidate)]
mod dom;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod fallback;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod keyboard;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod locator;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod page;
mod result;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod selector;
#[allow(clippy::missing_errors_doc)]
mod suite;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod text;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod wait;

/// Page driver seam and its implementations
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::doc_markdown
)]
pub mod driver;

/// Scenarios, steps, the fail-fast runner, and YAML scripts
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod scenario;

/// Log subscriber setup
pub mod tracing_support;

pub use affordance::Affordance;
pub use aria::{accessible_name, explicit_role, implicit_role, parse_role, AriaRole, NameSources};
pub use assertion::{
    expect, expect_page, AssertionOutcome, ElementAssertion, ElementPredicate, Expect, ExpectPage,
    Observation, PageAssertion, PagePredicate,
};
pub use config::{
    HarnessConfig, ENV_BASE_URL, ENV_CHROMIUM_PATH, ENV_HEADLESS, ENV_POLL_INTERVAL_MS,
    ENV_TIMEOUT_MS,
};
pub use dom::{DomSnapshot, ElementHandle, ElementSnapshot, NodeId};
pub use driver::{PageDriver, PageSource};
pub use fallback::{FallbackChain, FallbackMatch};
pub use keyboard::{modifier_key_for, Key, KeyChord, Platform};
pub use locator::{resolve, Locator, Position};
pub use page::{join_url, Page};
pub use result::{FailureKind, VigiaError, VigiaResult};
pub use scenario::{
    Failure, Scenario, ScenarioOutcome, ScenarioRunner, ScenarioStatus, Step, StepRecord,
    StepStatus, Target,
};
pub use selector::{AttributePattern, Selector};
pub use suite::{FailureMode, Suite, SuiteResults};
pub use text::{normalize_whitespace, Pattern, TextMatcher};
pub use tracing_support::{init_tracing, init_tracing_with, LogFormat};
pub use wait::{
    wait_for_page, wait_until, LoadState, WaitOptions, WaitState, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_TIMEOUT_MS, MIN_POLL_INTERVAL_MS, NETWORK_IDLE_THRESHOLD_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::affordance::*;
    pub use super::aria::AriaRole;
    pub use super::assertion::*;
    pub use super::config::HarnessConfig;
    pub use super::driver::{PageDriver, PageSource};
    pub use super::fallback::*;
    pub use super::keyboard::{Key, KeyChord, Platform};
    pub use super::locator::{Locator, Position};
    pub use super::page::Page;
    pub use super::result::*;
    pub use super::scenario::{Scenario, ScenarioRunner, Step, Target};
    pub use super::selector::Selector;
    pub use super::suite::*;
    pub use super::text::TextMatcher;
    pub use super::wait::{LoadState, WaitState};
}
