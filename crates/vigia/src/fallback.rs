//! Ordered fallback locators.
//!
//! Entries are tried in declared order; the first whose resolution contains
//! a visible candidate wins. When nothing matches, the last entry comes back
//! unmatched so the caller's own wait produces the timeout diagnostic.

use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::VigiaResult;
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Non-empty ordered list of alternative locators
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FallbackChain {
    entries: Vec<Locator>,
}

/// Entry chosen by [`FallbackChain::resolve_first_available`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackMatch {
    /// Winning entry, or the last entry when nothing matched
    pub locator: Locator,
    /// Some entry had a visible candidate
    pub matched: bool,
    /// Index of `locator` in the chain
    pub index: usize,
}

impl FallbackChain {
    /// Chain starting with `first`
    pub fn new(first: impl Into<Locator>) -> Self {
        Self {
            entries: vec![first.into()],
        }
    }

    /// Append an alternative
    #[must_use]
    pub fn or(mut self, next: impl Into<Locator>) -> Self {
        self.entries.push(next.into());
        self
    }

    /// Entries in order
    pub fn entries(&self) -> &[Locator] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a chain has at least one entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the first entry with a visible candidate.
    ///
    /// With a zero `probe` this is a single pass over the entries. A
    /// non-zero window repeats the pass every `poll_interval` until it ends.
    pub async fn resolve_first_available(
        &self,
        page: &dyn PageDriver,
        probe: Duration,
        poll_interval: Duration,
    ) -> VigiaResult<FallbackMatch> {
        let start = Instant::now();
        loop {
            for (index, entry) in self.entries.iter().enumerate() {
                let handles = entry.resolve(page).await?;
                if handles.iter().any(|h| h.is_visible()) {
                    debug!(index, locator = %entry, "fallback entry matched");
                    return Ok(FallbackMatch {
                        locator: entry.clone(),
                        matched: true,
                        index,
                    });
                }
            }
            let elapsed = start.elapsed();
            if elapsed >= probe {
                break;
            }
            sleep(poll_interval.min(probe - elapsed)).await;
        }

        let index = self.entries.len() - 1;
        warn!(attempted = %self, "no fallback entry had a visible candidate");
        Ok(FallbackMatch {
            locator: self.entries[index].clone(),
            matched: false,
            index,
        })
    }
}

impl fmt::Display for FallbackChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "first available of [")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{entry}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::aria::AriaRole;
    use crate::driver::{MemoryElement, MemoryPage};
    use crate::selector::Selector;
    use crate::text::TextMatcher;

    fn search_chain() -> FallbackChain {
        FallbackChain::new(
            Locator::new(Selector::role_named(
                AriaRole::Button,
                TextMatcher::parse("/Search|検索|Open search/i").unwrap(),
            ))
            .first(),
        )
        .or(Locator::new(Selector::css(r#"input[type="search"], input[role="searchbox"]"#)).first())
        .or(Locator::new(Selector::css(
            r#"[aria-label*="search"], [placeholder*="Search"], [data-search]"#,
        ))
        .first())
    }

    const NO_PROBE: Duration = Duration::ZERO;
    const POLL: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn test_first_entry_wins_when_visible() {
        let page = MemoryPage::new();
        page.add(MemoryElement::new("button").text("Search"));
        page.add(MemoryElement::new("input").attr("type", "search"));
        let m = search_chain()
            .resolve_first_available(&page, NO_PROBE, POLL)
            .await
            .unwrap();
        assert!(m.matched);
        assert_eq!(m.index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_through_to_second_entry() {
        let page = MemoryPage::new();
        page.add(MemoryElement::new("input").attr("type", "search"));
        let m = search_chain()
            .resolve_first_available(&page, NO_PROBE, POLL)
            .await
            .unwrap();
        assert!(m.matched);
        assert_eq!(m.index, 1);
        assert_eq!(m.locator, search_chain().entries()[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_candidates_do_not_count() {
        let page = MemoryPage::new();
        page.add(MemoryElement::new("input").attr("type", "search").hidden());
        page.add(MemoryElement::new("div").attr("data-search", ""));
        let m = search_chain()
            .resolve_first_available(&page, NO_PROBE, POLL)
            .await
            .unwrap();
        assert_eq!(m.index, 2);
        assert!(m.matched);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_match_returns_last_entry_unmatched() {
        let page = MemoryPage::new();
        let m = search_chain()
            .resolve_first_available(&page, NO_PROBE, POLL)
            .await
            .unwrap();
        assert!(!m.matched);
        assert_eq!(m.index, 2);
        assert_eq!(&m.locator, search_chain().entries().last().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_check_does_not_wait() {
        let page = MemoryPage::new();
        let button = page.add(MemoryElement::new("button").text("Search").hidden());
        page.with_state(|s| s.show_after(button, 4));
        let m = search_chain()
            .resolve_first_available(&page, NO_PROBE, POLL)
            .await
            .unwrap();
        assert!(!m.matched);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_window_catches_late_elements() {
        let page = MemoryPage::new();
        let button = page.add(MemoryElement::new("button").text("Search").hidden());
        // Three snapshots per pass; visible during the second pass
        page.with_state(|s| s.show_after(button, 4));
        let m = search_chain()
            .resolve_first_available(&page, Duration::from_millis(500), POLL)
            .await
            .unwrap();
        assert!(m.matched);
        assert_eq!(m.index, 0);
    }

    #[test]
    fn test_display_lists_every_entry() {
        let shown = search_chain().to_string();
        assert!(shown.starts_with("first available of [getByRole('button'"));
        assert!(shown.contains(r#"css=input[type="search"], input[role="searchbox"]"#));
        assert!(shown.contains("[data-search]"));
        assert_eq!(search_chain().len(), 3);
    }
}
