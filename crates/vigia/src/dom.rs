//! Point-in-time view of the page that locators resolve against.

use crate::aria::{accessible_name, explicit_role, implicit_role, AriaRole, NameSources};
use crate::text::normalize_whitespace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Driver-assigned identity of a DOM element, stable for the element's lifetime
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// One element as observed by the driver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Element identity
    pub node: NodeId,
    /// Parent element identity
    #[serde(default)]
    pub parent: Option<NodeId>,
    /// Lowercase tag name
    pub tag: String,
    /// Attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Rendered text content
    #[serde(default)]
    pub text: String,
    /// Associated `<label>` text
    #[serde(default)]
    pub label_text: Option<String>,
    /// Text of `aria-labelledby` targets
    #[serde(default)]
    pub labelled_by_text: Option<String>,
    /// Participates in layout (not `display: none` / `visibility: hidden`)
    #[serde(default)]
    pub rendered: bool,
    /// Rendered with a non-empty box
    #[serde(default)]
    pub visible: bool,
    /// Disabled (natively or via `aria-disabled`)
    #[serde(default)]
    pub disabled: bool,
    /// Has keyboard focus
    #[serde(default)]
    pub focused: bool,
    /// Current value of form controls
    #[serde(default)]
    pub value: Option<String>,
}

impl ElementSnapshot {
    /// Attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Explicit role, falling back to the implicit one
    pub fn role(&self) -> Option<AriaRole> {
        self.attr("role")
            .and_then(explicit_role)
            .or_else(|| implicit_role(&self.tag, &self.attributes))
    }

    /// Accessible name for the computed role
    pub fn accessible_name(&self) -> String {
        accessible_name(
            NameSources {
                tag: &self.tag,
                attributes: &self.attributes,
                text: &self.text,
                labelled_by_text: self.labelled_by_text.as_deref(),
                label_text: self.label_text.as_deref(),
            },
            self.role(),
        )
    }

    /// Excluded from the accessibility tree
    pub fn is_hidden_from_accessibility(&self) -> bool {
        !self.rendered || self.attr("aria-hidden") == Some("true")
    }
}

/// Every element on the page at one instant, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomSnapshot {
    /// Page URL
    #[serde(default)]
    pub url: String,
    /// Document title
    #[serde(default)]
    pub title: String,
    /// Elements in document order
    #[serde(default)]
    pub elements: Vec<ElementSnapshot>,
}

impl DomSnapshot {
    /// Look up an element by id
    pub fn get(&self, node: NodeId) -> Option<&ElementSnapshot> {
        self.elements.iter().find(|e| e.node == node)
    }
}

/// A resolved element with its role and name computed once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    node: NodeId,
    role: Option<AriaRole>,
    name: String,
    snapshot: ElementSnapshot,
}

impl ElementHandle {
    /// Build a handle, computing role and name
    pub fn from_snapshot(snapshot: &ElementSnapshot) -> Self {
        Self {
            node: snapshot.node,
            role: snapshot.role(),
            name: snapshot.accessible_name(),
            snapshot: snapshot.clone(),
        }
    }

    /// Element identity
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Computed role
    pub const fn role(&self) -> Option<AriaRole> {
        self.role
    }

    /// Accessible name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag name
    pub fn tag(&self) -> &str {
        &self.snapshot.tag
    }

    /// Normalized text content
    pub fn text(&self) -> String {
        normalize_whitespace(&self.snapshot.text)
    }

    /// Attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.snapshot.attr(name)
    }

    /// Form control value
    pub fn value(&self) -> Option<&str> {
        self.snapshot.value.as_deref()
    }

    /// Visible to the user
    pub const fn is_visible(&self) -> bool {
        self.snapshot.visible
    }

    /// Accepts input
    pub const fn is_enabled(&self) -> bool {
        !self.snapshot.disabled
    }

    /// Has keyboard focus
    pub const fn is_focused(&self) -> bool {
        self.snapshot.focused
    }

    /// Underlying snapshot
    pub const fn snapshot(&self) -> &ElementSnapshot {
        &self.snapshot
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.snapshot.tag)?;
        if let Some(role) = self.role {
            write!(f, " role={role}")?;
        }
        if !self.name.is_empty() {
            write!(f, " name=\"{}\"", self.name)?;
        }
        write!(
            f,
            "> {}{}{}",
            if self.is_visible() { "visible" } else { "hidden" },
            if self.is_enabled() { "" } else { ", disabled" },
            if self.is_focused() { ", focused" } else { "" },
        )
    }
}
