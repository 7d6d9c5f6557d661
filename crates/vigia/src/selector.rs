//! Declarative selector strategies.

use crate::aria::AriaRole;
use crate::dom::ElementSnapshot;
use crate::text::TextMatcher;
use std::fmt;

/// How an attribute value is matched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributePattern {
    /// Attribute exists
    Present,
    /// Value equals (case-sensitive)
    Equals(String),
    /// Value contains substring (case-sensitive, like CSS `*=`)
    Contains(String),
}

impl AttributePattern {
    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Present => true,
            Self::Equals(expected) => value == expected,
            Self::Contains(needle) => value.contains(needle.as_str()),
        }
    }
}

/// Selector strategy plus its matching parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// ARIA role with optional accessible name
    Role {
        /// Role to match
        role: AriaRole,
        /// Accessible name matcher
        name: Option<TextMatcher>,
        /// Also match elements hidden from the accessibility tree
        include_hidden: bool,
    },
    /// CSS selector, evaluated by the driver
    Css(String),
    /// Attribute presence or value
    Attribute {
        /// Attribute name
        name: String,
        /// Value pattern
        pattern: AttributePattern,
    },
    /// Placeholder text of form controls
    Placeholder(TextMatcher),
    /// Text content; the innermost matching elements win
    Text(TextMatcher),
}

impl Selector {
    /// Match by role
    pub const fn role(role: AriaRole) -> Self {
        Self::Role {
            role,
            name: None,
            include_hidden: false,
        }
    }

    /// Match by role and accessible name
    pub const fn role_named(role: AriaRole, name: TextMatcher) -> Self {
        Self::Role {
            role,
            name: Some(name),
            include_hidden: false,
        }
    }

    /// Match by CSS
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Match elements carrying an attribute
    pub fn attribute_present(name: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            pattern: AttributePattern::Present,
        }
    }

    /// Match an attribute value exactly
    pub fn attribute_equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            pattern: AttributePattern::Equals(value.into()),
        }
    }

    /// Match an attribute value containing a substring
    pub fn attribute_contains(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            pattern: AttributePattern::Contains(value.into()),
        }
    }

    /// Match by placeholder
    pub const fn placeholder(matcher: TextMatcher) -> Self {
        Self::Placeholder(matcher)
    }

    /// Match by text content
    pub const fn text(matcher: TextMatcher) -> Self {
        Self::Text(matcher)
    }

    /// Include elements hidden from the accessibility tree (role selectors only)
    #[must_use]
    pub fn including_hidden(self) -> Self {
        match self {
            Self::Role { role, name, .. } => Self::Role {
                role,
                name,
                include_hidden: true,
            },
            other => other,
        }
    }

    /// Evaluated by the driver rather than against the snapshot
    pub const fn is_css(&self) -> bool {
        matches!(self, Self::Css(_))
    }

    /// Test a snapshot element. CSS selectors never match here.
    pub fn matches(&self, element: &ElementSnapshot) -> bool {
        match self {
            Self::Role {
                role,
                name,
                include_hidden,
            } => {
                if !include_hidden && element.is_hidden_from_accessibility() {
                    return false;
                }
                if element.role() != Some(*role) {
                    return false;
                }
                name.as_ref()
                    .map_or(true, |matcher| matcher.matches(&element.accessible_name()))
            }
            Self::Css(_) => false,
            Self::Attribute { name, pattern } => element
                .attr(&name.to_ascii_lowercase())
                .is_some_and(|value| pattern.matches(value)),
            Self::Placeholder(matcher) => element
                .attr("placeholder")
                .is_some_and(|value| matcher.matches(value)),
            Self::Text(matcher) => {
                element.rendered && !element.text.trim().is_empty() && matcher.matches(&element.text)
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role {
                role,
                name,
                include_hidden,
            } => {
                write!(f, "getByRole('{role}'")?;
                match (name, include_hidden) {
                    (Some(name), true) => write!(f, ", {{ name: {name}, includeHidden: true }}")?,
                    (Some(name), false) => write!(f, ", {{ name: {name} }}")?,
                    (None, true) => write!(f, ", {{ includeHidden: true }}")?,
                    (None, false) => {}
                }
                write!(f, ")")
            }
            Self::Css(css) => write!(f, "css={css}"),
            Self::Attribute { name, pattern } => match pattern {
                AttributePattern::Present => write!(f, "[{name}]"),
                AttributePattern::Equals(value) => write!(f, "[{name}=\"{value}\"]"),
                AttributePattern::Contains(value) => write!(f, "[{name}*=\"{value}\"]"),
            },
            Self::Placeholder(matcher) => write!(f, "getByPlaceholder({matcher})"),
            Self::Text(matcher) => write!(f, "getByText({matcher})"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::dom::NodeId;
    use std::collections::BTreeMap;

    fn element(tag: &str, attrs: &[(&str, &str)], text: &str) -> ElementSnapshot {
        ElementSnapshot {
            node: NodeId(1),
            tag: tag.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
            text: text.to_string(),
            rendered: true,
            visible: true,
            ..Default::default()
        }
    }

    mod role_tests {
        use super::*;

        #[test]
        fn test_role_with_pattern_name() {
            let selector = Selector::role_named(
                AriaRole::Button,
                TextMatcher::parse("/Search|検索|Open search/i").unwrap(),
            );
            assert!(selector.matches(&element("button", &[], "検索")));
            assert!(selector.matches(&element(
                "button",
                &[("aria-label", "Search (Ctrl+K)")],
                ""
            )));
            assert!(!selector.matches(&element("button", &[], "Menu")));
            assert!(!selector.matches(&element("a", &[("href", "/")], "Search")));
        }

        #[test]
        fn test_role_excludes_hidden_unless_requested() {
            let mut hidden = element("button", &[], "Search");
            hidden.rendered = false;
            hidden.visible = false;
            let selector = Selector::role(AriaRole::Button);
            assert!(!selector.matches(&hidden));
            assert!(selector.including_hidden().matches(&hidden));
        }

        #[test]
        fn test_role_excludes_aria_hidden() {
            let el = element("button", &[("aria-hidden", "true")], "Search");
            assert!(!Selector::role(AriaRole::Button).matches(&el));
        }

        #[test]
        fn test_explicit_role_attribute() {
            let el = element("div", &[("role", "searchbox")], "");
            assert!(Selector::role(AriaRole::Searchbox).matches(&el));
        }
    }

    mod attribute_tests {
        use super::*;

        #[test]
        fn test_contains_is_case_sensitive() {
            let selector = Selector::attribute_contains("aria-label", "search");
            assert!(selector.matches(&element("div", &[("aria-label", "open search")], "")));
            assert!(!selector.matches(&element("div", &[("aria-label", "Search")], "")));
        }

        #[test]
        fn test_present_and_equals() {
            let el = element("div", &[("data-search", "")], "");
            assert!(Selector::attribute_present("data-search").matches(&el));
            assert!(Selector::attribute_equals("data-search", "").matches(&el));
            assert!(!Selector::attribute_present("data-other").matches(&el));
        }

        #[test]
        fn test_placeholder_matches_substring() {
            let el = element("input", &[("placeholder", "Search docs")], "");
            assert!(Selector::placeholder(TextMatcher::substring("search")).matches(&el));
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn test_display_forms() {
            assert_eq!(
                Selector::role_named(AriaRole::Link, TextMatcher::parse("/Install/i").unwrap())
                    .to_string(),
                "getByRole('link', { name: /Install/i })"
            );
            assert_eq!(
                Selector::css("input[type=\"search\"]").to_string(),
                "css=input[type=\"search\"]"
            );
            assert_eq!(
                Selector::attribute_contains("placeholder", "Search").to_string(),
                "[placeholder*=\"Search\"]"
            );
            assert_eq!(Selector::attribute_present("data-search").to_string(), "[data-search]");
        }

        #[test]
        fn test_structural_equality() {
            let a = Selector::role_named(AriaRole::Button, TextMatcher::substring("Search"));
            let b = Selector::role_named(AriaRole::Button, TextMatcher::substring("Search"));
            assert_eq!(a, b);
            assert_ne!(a, Selector::role(AriaRole::Button));
        }
    }
}
