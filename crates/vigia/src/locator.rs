//! Locators: a selector plus position and strictness.
//!
//! A locator owns no page state. Every `resolve` re-queries the live page,
//! so two calls may observe different elements as the page changes.
//!
//! # Design
//!
//! - **No caching**: handles are a snapshot of one instant
//! - **Empty is not an error**: zero matches resolve to an empty list
//! - **Strict by default**: element assertions on a locator without a
//!   position fail when more than one element matches

use crate::dom::{ElementHandle, NodeId};
use crate::driver::PageDriver;
use crate::result::{VigiaError, VigiaResult};
use crate::selector::Selector;
use std::collections::HashSet;
use std::fmt;

/// Which match of a selector a locator designates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// First match in document order
    First,
    /// Last match in document order
    Last,
    /// Zero-based index
    Nth(usize),
}

/// Selector with optional position and strictness
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    selector: Selector,
    position: Option<Position>,
    strict: bool,
}

impl Locator {
    /// Strict locator for a selector
    pub const fn new(selector: Selector) -> Self {
        Self {
            selector,
            position: None,
            strict: true,
        }
    }

    /// Designate the first match
    #[must_use]
    pub const fn first(mut self) -> Self {
        self.position = Some(Position::First);
        self
    }

    /// Designate the last match
    #[must_use]
    pub const fn last(mut self) -> Self {
        self.position = Some(Position::Last);
        self
    }

    /// Designate the match at `index`
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.position = Some(Position::Nth(index));
        self
    }

    /// Enable or disable strictness
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Selector
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Position filter
    pub const fn position(&self) -> Option<Position> {
        self.position
    }

    /// Whether several matches are an error for element assertions
    pub const fn is_strict(&self) -> bool {
        self.strict && self.position.is_none()
    }

    /// Resolve against the live page, applying the position filter
    pub async fn resolve(&self, page: &dyn PageDriver) -> VigiaResult<Vec<ElementHandle>> {
        let mut handles = resolve(&self.selector, page).await?;
        let picked = match self.position {
            None => return Ok(handles),
            Some(Position::First) => (!handles.is_empty()).then(|| handles.swap_remove(0)),
            Some(Position::Last) => handles.pop(),
            Some(Position::Nth(i)) => (i < handles.len()).then(|| handles.swap_remove(i)),
        };
        Ok(picked.into_iter().collect())
    }

    /// Number of matches after the position filter
    pub async fn count(&self, page: &dyn PageDriver) -> VigiaResult<usize> {
        Ok(self.resolve(page).await?.len())
    }

    /// The single element an action should target.
    ///
    /// Errors with `ElementNotFound` on zero matches and
    /// `StrictModeViolation` when a strict locator matches several.
    pub async fn target(&self, page: &dyn PageDriver) -> VigiaResult<ElementHandle> {
        let handles = self.resolve(page).await?;
        check_strict(self, &handles)?;
        handles
            .into_iter()
            .next()
            .ok_or_else(|| VigiaError::ElementNotFound {
                selector: self.to_string(),
                timeout_ms: 0,
            })
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Self::new(selector)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        match self.position {
            None => Ok(()),
            Some(Position::First) => write!(f, ".first()"),
            Some(Position::Last) => write!(f, ".last()"),
            Some(Position::Nth(i)) => write!(f, ".nth({i})"),
        }
    }
}

/// Fail when a strict locator matched more than one element
pub(crate) fn check_strict(locator: &Locator, handles: &[ElementHandle]) -> VigiaResult<()> {
    if locator.is_strict() && handles.len() > 1 {
        return Err(VigiaError::StrictModeViolation {
            selector: locator.to_string(),
            count: handles.len(),
        });
    }
    Ok(())
}

/// Resolve a selector to element handles in document order.
///
/// Zero matches resolve to an empty list, never an error. Errors come only
/// from the driver or from a selector the driver cannot evaluate.
pub async fn resolve(selector: &Selector, page: &dyn PageDriver) -> VigiaResult<Vec<ElementHandle>> {
    let snapshot = page.snapshot().await?;
    let handles: Vec<ElementHandle> = match selector {
        Selector::Css(css) => {
            let ids: HashSet<NodeId> = page.query_css(css).await?.into_iter().collect();
            snapshot
                .elements
                .iter()
                .filter(|e| ids.contains(&e.node))
                .map(ElementHandle::from_snapshot)
                .collect()
        }
        Selector::Text(_) => {
            let matching: Vec<_> = snapshot
                .elements
                .iter()
                .filter(|e| selector.matches(e))
                .collect();
            // Only the innermost elements containing the text
            let parents: HashSet<NodeId> = matching.iter().filter_map(|e| e.parent).collect();
            matching
                .into_iter()
                .filter(|e| !parents.contains(&e.node))
                .map(ElementHandle::from_snapshot)
                .collect()
        }
        _ => snapshot
            .elements
            .iter()
            .filter(|e| selector.matches(e))
            .map(ElementHandle::from_snapshot)
            .collect(),
    };
    tracing::trace!(selector = %selector, matches = handles.len(), "resolved selector");
    Ok(handles)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::aria::AriaRole;
    use crate::driver::{MemoryElement, MemoryPage};
    use crate::text::TextMatcher;

    fn search_page() -> MemoryPage {
        let page = MemoryPage::new();
        page.add(
            MemoryElement::new("button")
                .attr("class", "DocSearch DocSearch-Button")
                .attr("aria-label", "Search (Ctrl+K)")
                .text("Search"),
        );
        page.add(MemoryElement::new("button").text("Open search"));
        page.add(
            MemoryElement::new("input")
                .attr("type", "search")
                .attr("placeholder", "Search docs")
                .hidden(),
        );
        page
    }

    fn search_button() -> Locator {
        Locator::new(Selector::role_named(
            AriaRole::Button,
            TextMatcher::parse("/Search|検索|Open search/i").unwrap(),
        ))
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test]
        async fn test_role_matches_in_document_order() {
            let page = search_page();
            let handles = search_button().resolve(&page).await.unwrap();
            assert_eq!(handles.len(), 2);
            assert_eq!(handles[0].name(), "Search (Ctrl+K)");
            assert_eq!(handles[1].name(), "Open search");
        }

        #[tokio::test]
        async fn test_zero_matches_is_empty_not_error() {
            let page = search_page();
            let locator = Locator::new(Selector::role_named(
                AriaRole::Link,
                TextMatcher::substring("Nonexistent"),
            ));
            assert!(locator.resolve(&page).await.unwrap().is_empty());
            assert_eq!(locator.count(&page).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_css_includes_hidden_elements() {
            let page = search_page();
            let locator = Locator::new(Selector::css(
                r#"input[type="search"], input[role="searchbox"]"#,
            ));
            let handles = locator.resolve(&page).await.unwrap();
            assert_eq!(handles.len(), 1);
            assert!(!handles[0].is_visible());
        }

        #[tokio::test]
        async fn test_role_skips_hidden_searchbox() {
            let page = search_page();
            let locator = Locator::new(Selector::role(AriaRole::Searchbox));
            assert_eq!(locator.count(&page).await.unwrap(), 0);
            let including = Locator::new(Selector::role(AriaRole::Searchbox).including_hidden());
            assert_eq!(including.count(&page).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_text_selector_prefers_innermost() {
            let page = MemoryPage::new();
            let nav = page.add(MemoryElement::new("nav"));
            let link = page.add(
                MemoryElement::new("a")
                    .attr("href", "/docs/intro")
                    .text("Get started")
                    .child_of(nav),
            );
            let handles = Locator::new(Selector::text(TextMatcher::substring("get started")))
                .resolve(&page)
                .await
                .unwrap();
            assert_eq!(handles.len(), 1);
            assert_eq!(handles[0].node(), link);
        }

        #[tokio::test]
        async fn test_resolution_is_idempotent() {
            let page = search_page();
            let a = search_button().resolve(&page).await.unwrap();
            let b = search_button().resolve(&page).await.unwrap();
            assert_eq!(a, b);
            page.with_state(|s| assert!(s.log().is_empty()));
        }

        #[tokio::test]
        async fn test_invalid_css_is_an_error() {
            let page = search_page();
            let err = Locator::new(Selector::css("input[type="))
                .resolve(&page)
                .await
                .unwrap_err();
            assert!(matches!(err, VigiaError::InvalidSelector { .. }));
        }
    }

    mod position_tests {
        use super::*;

        #[tokio::test]
        async fn test_first_last_nth() {
            let page = search_page();
            let first = search_button().first().resolve(&page).await.unwrap();
            assert_eq!(first.len(), 1);
            assert_eq!(first[0].name(), "Search (Ctrl+K)");

            let last = search_button().last().resolve(&page).await.unwrap();
            assert_eq!(last[0].name(), "Open search");

            assert_eq!(search_button().nth(1).count(&page).await.unwrap(), 1);
            assert_eq!(search_button().nth(5).count(&page).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_target_enforces_strictness() {
            let page = search_page();
            let err = search_button().target(&page).await.unwrap_err();
            assert!(matches!(
                err,
                VigiaError::StrictModeViolation { count: 2, .. }
            ));
            assert!(search_button().first().target(&page).await.is_ok());
            assert!(search_button()
                .with_strict(false)
                .target(&page)
                .await
                .is_ok());
        }

        #[test]
        fn test_display_includes_position() {
            assert_eq!(
                search_button().first().to_string(),
                "getByRole('button', { name: /Search|検索|Open search/i }).first()"
            );
            assert_eq!(
                Locator::new(Selector::css("a")).nth(2).to_string(),
                "css=a.nth(2)"
            );
        }
    }
}
