//! Page driver seam.
//!
//! Everything the harness knows about a live page goes through
//! [`PageDriver`]. Two implementations ship with the crate:
//!
//! - [`MemoryPage`]: an in-process page model for tests
//! - `CdpPage`: Chromium over the DevTools protocol (`browser` feature)

mod css;
mod memory;

#[cfg(feature = "browser")]
mod cdp;

pub use css::CssSelectorList;
pub use memory::{MemoryElement, MemoryPage, MemoryPageSource, PageState, Reaction};

#[cfg(feature = "browser")]
pub use cdp::{ChromiumBrowser, CdpPage};

use crate::dom::{DomSnapshot, NodeId};
use crate::keyboard::KeyChord;
use crate::result::VigiaResult;
use crate::wait::LoadState;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Async boundary to one browser page
///
/// Methods take `&self`: implementations synchronize internally so a page
/// can be shared behind an `Arc`.
#[async_trait]
pub trait PageDriver: Send + Sync + std::fmt::Debug {
    /// Navigate to a URL
    async fn goto(&self, url: &str) -> VigiaResult<()>;

    /// Block until the page reaches a load state
    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> VigiaResult<()>;

    /// Observe every element on the page
    async fn snapshot(&self) -> VigiaResult<DomSnapshot>;

    /// Ids of elements matching a CSS selector, in document order
    async fn query_css(&self, css: &str) -> VigiaResult<Vec<NodeId>>;

    /// Click an element
    async fn click(&self, node: NodeId) -> VigiaResult<()>;

    /// Replace the value of an input and focus it
    async fn fill(&self, node: NodeId, text: &str) -> VigiaResult<()>;

    /// Press a key chord against the focused element
    async fn press(&self, chord: &KeyChord) -> VigiaResult<()>;

    /// Current URL
    async fn url(&self) -> VigiaResult<String>;

    /// Document title
    async fn title(&self) -> VigiaResult<String>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> VigiaResult<Vec<u8>>;

    /// Release the page
    async fn close(&self) -> VigiaResult<()> {
        Ok(())
    }
}

/// Hands out a fresh, isolated page per scenario
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Open a new page
    async fn new_page(&self) -> VigiaResult<Arc<dyn PageDriver>>;
}
