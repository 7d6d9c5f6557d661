//! Ways to open a UI feature: click its button, or press its shortcut.

use crate::keyboard::KeyChord;
use crate::locator::Locator;
use crate::page::Page;
use crate::result::VigiaResult;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// How a feature gets invoked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Affordance {
    /// Click the button the locator designates
    ClickButton(Locator),
    /// Press a key chord
    KeyboardShortcut(KeyChord),
}

impl Affordance {
    /// Prefer the button when it exists on the page, else the shortcut
    pub async fn probe(page: &Page, button: &Locator, shortcut: &KeyChord) -> VigiaResult<Self> {
        let count = page.count(button).await?;
        let chosen = if count > 0 {
            Self::ClickButton(button.clone())
        } else {
            Self::KeyboardShortcut(shortcut.clone())
        };
        debug!(count, affordance = %chosen, "probed affordance");
        Ok(chosen)
    }

    /// Perform the action
    pub async fn invoke(&self, page: &Page, timeout: Option<Duration>) -> VigiaResult<()> {
        match self {
            Self::ClickButton(locator) => page.click(locator, timeout).await,
            Self::KeyboardShortcut(chord) => page.press(chord).await,
        }
    }
}

impl fmt::Display for Affordance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClickButton(locator) => write!(f, "click {locator}"),
            Self::KeyboardShortcut(chord) => write!(f, "press {chord}"),
        }
    }
}
