//! ARIA roles and accessible names.
//!
//! Roles come from an explicit `role` attribute when it names a known role,
//! otherwise from the implicit role of the tag (and input type). Names
//! follow a simplified accessible-name computation: `aria-labelledby`,
//! `aria-label`, native labelling (`<label>`, `alt`, button value), content
//! for roles that take their name from content, then `title` and
//! `placeholder`.

use crate::result::{VigiaError, VigiaResult};
use crate::text::normalize_whitespace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

macro_rules! aria_roles {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// ARIA role
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum AriaRole {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
        }

        impl AriaRole {
            /// Every known role
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Lowercase role name as written in markup
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl FromStr for AriaRole {
            type Err = VigiaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    other => Err(VigiaError::InvalidSelector {
                        selector: format!("role={other}"),
                        message: "unknown ARIA role".to_string(),
                    }),
                }
            }
        }
    };
}

aria_roles! {
    Alert => "alert",
    Article => "article",
    Banner => "banner",
    Button => "button",
    Cell => "cell",
    Checkbox => "checkbox",
    Columnheader => "columnheader",
    Combobox => "combobox",
    Complementary => "complementary",
    Contentinfo => "contentinfo",
    Dialog => "dialog",
    Form => "form",
    Generic => "generic",
    Group => "group",
    Heading => "heading",
    Img => "img",
    Link => "link",
    List => "list",
    Listbox => "listbox",
    Listitem => "listitem",
    Main => "main",
    Menu => "menu",
    Menuitem => "menuitem",
    Navigation => "navigation",
    Option => "option",
    Paragraph => "paragraph",
    Presentation => "presentation",
    Radio => "radio",
    Region => "region",
    Row => "row",
    Search => "search",
    Searchbox => "searchbox",
    Slider => "slider",
    Spinbutton => "spinbutton",
    Switch => "switch",
    Tab => "tab",
    Table => "table",
    Tablist => "tablist",
    Tabpanel => "tabpanel",
    Textbox => "textbox",
}

impl AriaRole {
    /// Roles whose accessible name may come from their text content
    pub const fn takes_name_from_content(self) -> bool {
        matches!(
            self,
            Self::Button
                | Self::Cell
                | Self::Checkbox
                | Self::Columnheader
                | Self::Heading
                | Self::Link
                | Self::Menuitem
                | Self::Option
                | Self::Radio
                | Self::Row
                | Self::Switch
                | Self::Tab
        )
    }

    /// Roles that are text entry fields
    pub const fn is_text_field(self) -> bool {
        matches!(self, Self::Textbox | Self::Searchbox | Self::Combobox)
    }
}

impl fmt::Display for AriaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a role attribute value; the first recognized token wins
pub fn explicit_role(value: &str) -> Option<AriaRole> {
    value
        .split_whitespace()
        .find_map(|token| AriaRole::from_str(token).ok())
}

/// Implicit role of an element from its tag and attributes
pub fn implicit_role(tag: &str, attributes: &BTreeMap<String, String>) -> Option<AriaRole> {
    let has = |name: &str| attributes.contains_key(name);
    let role = match tag {
        "a" | "area" if has("href") => AriaRole::Link,
        "button" | "summary" => AriaRole::Button,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => AriaRole::Heading,
        "input" => return input_role(attributes),
        "textarea" => AriaRole::Textbox,
        "select" => {
            let size = attributes
                .get("size")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(0);
            if has("multiple") || size > 1 {
                AriaRole::Listbox
            } else {
                AriaRole::Combobox
            }
        }
        "option" => AriaRole::Option,
        "img" => {
            if attributes.get("alt").is_some_and(String::is_empty) {
                AriaRole::Presentation
            } else {
                AriaRole::Img
            }
        }
        "nav" => AriaRole::Navigation,
        "main" => AriaRole::Main,
        "header" => AriaRole::Banner,
        "footer" => AriaRole::Contentinfo,
        "aside" => AriaRole::Complementary,
        "form" => AriaRole::Form,
        "search" => AriaRole::Search,
        "dialog" => AriaRole::Dialog,
        "ul" | "ol" | "menu" => AriaRole::List,
        "li" => AriaRole::Listitem,
        "table" => AriaRole::Table,
        "tr" => AriaRole::Row,
        "td" => AriaRole::Cell,
        "th" => AriaRole::Columnheader,
        "p" => AriaRole::Paragraph,
        "article" => AriaRole::Article,
        "section" => AriaRole::Region,
        "details" | "fieldset" => AriaRole::Group,
        "div" | "span" => AriaRole::Generic,
        _ => return None,
    };
    Some(role)
}

fn input_role(attributes: &BTreeMap<String, String>) -> Option<AriaRole> {
    let input_type = attributes
        .get("type")
        .map_or_else(|| "text".to_string(), |t| t.to_ascii_lowercase());
    let with_list = attributes.contains_key("list");
    let role = match input_type.as_str() {
        "button" | "submit" | "reset" | "image" => AriaRole::Button,
        "checkbox" => AriaRole::Checkbox,
        "radio" => AriaRole::Radio,
        "range" => AriaRole::Slider,
        "number" => AriaRole::Spinbutton,
        "search" if with_list => AriaRole::Combobox,
        "search" => AriaRole::Searchbox,
        "email" | "tel" | "text" | "url" | "" if with_list => AriaRole::Combobox,
        "email" | "tel" | "text" | "url" | "" => AriaRole::Textbox,
        // hidden, password, file, color, date inputs expose no role here
        _ => return None,
    };
    Some(role)
}

/// Inputs to the accessible name computation
#[derive(Debug, Clone, Copy)]
pub struct NameSources<'a> {
    /// Lowercase tag name
    pub tag: &'a str,
    /// Element attributes
    pub attributes: &'a BTreeMap<String, String>,
    /// Text content of the element
    pub text: &'a str,
    /// Text of the elements referenced by `aria-labelledby`
    pub labelled_by_text: Option<&'a str>,
    /// Text of associated `<label>` elements
    pub label_text: Option<&'a str>,
}

/// Compute the accessible name for an element with the given role
pub fn accessible_name(sources: NameSources<'_>, role: Option<AriaRole>) -> String {
    let non_empty = |value: Option<&str>| {
        value
            .map(normalize_whitespace)
            .filter(|normalized| !normalized.is_empty())
    };
    let attr = |name: &str| non_empty(sources.attributes.get(name).map(String::as_str));

    if let Some(name) = non_empty(sources.labelled_by_text) {
        return name;
    }
    if let Some(name) = attr("aria-label") {
        return name;
    }
    if matches!(sources.tag, "input" | "textarea" | "select") {
        if let Some(name) = non_empty(sources.label_text) {
            return name;
        }
    }
    if sources.tag == "input" && role == Some(AriaRole::Button) {
        if let Some(name) = attr("value").or_else(|| attr("alt")) {
            return name;
        }
    }
    if matches!(sources.tag, "img" | "area") {
        if let Some(name) = attr("alt") {
            return name;
        }
    }
    if role.is_some_and(AriaRole::takes_name_from_content) {
        if let Some(name) = non_empty(Some(sources.text)) {
            return name;
        }
    }
    if let Some(name) = attr("title") {
        return name;
    }
    if role.is_some_and(AriaRole::is_text_field) || matches!(sources.tag, "input" | "textarea") {
        if let Some(name) = attr("placeholder") {
            return name;
        }
    }
    String::new()
}

/// Parse a role name, reporting the offending value
pub fn parse_role(value: &str) -> VigiaResult<AriaRole> {
    AriaRole::from_str(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    mod role_tests {
        use super::*;

        #[test]
        fn test_link_requires_href() {
            assert_eq!(
                implicit_role("a", &attrs(&[("href", "/docs/intro")])),
                Some(AriaRole::Link)
            );
            assert_eq!(implicit_role("a", &attrs(&[])), None);
        }

        #[test]
        fn test_input_types() {
            assert_eq!(
                implicit_role("input", &attrs(&[("type", "search")])),
                Some(AriaRole::Searchbox)
            );
            assert_eq!(implicit_role("input", &attrs(&[])), Some(AriaRole::Textbox));
            assert_eq!(
                implicit_role("input", &attrs(&[("type", "submit")])),
                Some(AriaRole::Button)
            );
            assert_eq!(
                implicit_role("input", &attrs(&[("type", "text"), ("list", "dl")])),
                Some(AriaRole::Combobox)
            );
            assert_eq!(implicit_role("input", &attrs(&[("type", "hidden")])), None);
        }

        #[test]
        fn test_headings_and_landmarks() {
            for tag in ["h1", "h2", "h3", "h4", "h5", "h6"] {
                assert_eq!(implicit_role(tag, &attrs(&[])), Some(AriaRole::Heading));
            }
            assert_eq!(implicit_role("nav", &attrs(&[])), Some(AriaRole::Navigation));
            assert_eq!(implicit_role("header", &attrs(&[])), Some(AriaRole::Banner));
        }

        #[test]
        fn test_decorative_image_is_presentation() {
            assert_eq!(
                implicit_role("img", &attrs(&[("alt", "")])),
                Some(AriaRole::Presentation)
            );
        }

        #[test]
        fn test_explicit_role_first_known_token() {
            assert_eq!(explicit_role("fancy button"), Some(AriaRole::Button));
            assert_eq!(explicit_role("fancy"), None);
        }

        #[test]
        fn test_role_round_trips_through_name() {
            for role in AriaRole::ALL {
                assert_eq!(parse_role(role.as_str()).unwrap(), *role);
            }
            assert!(parse_role("not-a-role").is_err());
        }
    }

    mod name_tests {
        use super::*;

        fn name(tag: &str, a: &BTreeMap<String, String>, text: &str) -> String {
            let role = a
                .get("role")
                .and_then(|r| explicit_role(r))
                .or_else(|| implicit_role(tag, a));
            accessible_name(
                NameSources {
                    tag,
                    attributes: a,
                    text,
                    labelled_by_text: None,
                    label_text: None,
                },
                role,
            )
        }

        #[test]
        fn test_aria_label_beats_content() {
            let a = attrs(&[("aria-label", "Search (Ctrl+K)")]);
            assert_eq!(name("button", &a, "Search"), "Search (Ctrl+K)");
        }

        #[test]
        fn test_button_name_from_content() {
            assert_eq!(name("button", &attrs(&[]), "  Open \n search "), "Open search");
        }

        #[test]
        fn test_generic_does_not_take_content() {
            assert_eq!(name("div", &attrs(&[]), "Search"), "");
        }

        #[test]
        fn test_placeholder_names_text_fields() {
            let a = attrs(&[("type", "search"), ("placeholder", "Search docs")]);
            assert_eq!(name("input", &a, ""), "Search docs");
        }

        #[test]
        fn test_labelledby_has_highest_precedence() {
            let a = attrs(&[("aria-label", "ignored")]);
            let computed = accessible_name(
                NameSources {
                    tag: "button",
                    attributes: &a,
                    text: "content",
                    labelled_by_text: Some("Labelled"),
                    label_text: None,
                },
                Some(AriaRole::Button),
            );
            assert_eq!(computed, "Labelled");
        }

        #[test]
        fn test_label_element_names_input() {
            let a = attrs(&[("type", "text"), ("placeholder", "fallback")]);
            let computed = accessible_name(
                NameSources {
                    tag: "input",
                    attributes: &a,
                    text: "",
                    labelled_by_text: None,
                    label_text: Some("Email"),
                },
                Some(AriaRole::Textbox),
            );
            assert_eq!(computed, "Email");
        }

        #[test]
        fn test_image_alt() {
            let a = attrs(&[("alt", "Playwright logo")]);
            assert_eq!(name("img", &a, ""), "Playwright logo");
        }

        #[test]
        fn test_submit_input_value() {
            let a = attrs(&[("type", "submit"), ("value", "Go")]);
            assert_eq!(name("input", &a, ""), "Go");
        }
    }
}
