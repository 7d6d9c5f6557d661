//! In-memory page model.
//!
//! `MemoryPage` holds a flat element list plus reactions that fire on
//! navigation, clicks, and key presses. Deferred visibility changes let tests
//! exercise polling: an element can appear or disappear after a number of
//! snapshots.

use super::css::CssSelectorList;
use super::{PageDriver, PageSource};
use crate::dom::{DomSnapshot, ElementSnapshot, NodeId};
use crate::keyboard::{Key, KeyChord};
use crate::result::{VigiaError, VigiaResult};
use crate::wait::LoadState;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Callback that mutates page state
pub type Reaction = Arc<dyn Fn(&mut PageState) + Send + Sync>;

/// Element description used to populate a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    label_text: Option<String>,
    rendered: bool,
    sized: bool,
    disabled: bool,
    value: Option<String>,
}

impl MemoryElement {
    /// Rendered, enabled element with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            parent: None,
            label_text: None,
            rendered: true,
            sized: true,
            disabled: false,
            value: None,
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Set text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Nest under a parent element
    #[must_use]
    pub const fn child_of(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Associated `<label>` text
    #[must_use]
    pub fn label(mut self, text: impl Into<String>) -> Self {
        self.label_text = Some(text.into());
        self
    }

    /// Not rendered (`display: none`)
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.rendered = false;
        self
    }

    /// Rendered but with an empty box
    #[must_use]
    pub const fn collapsed(mut self) -> Self {
        self.sized = false;
        self
    }

    /// Disabled control
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Initial form value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn accepts_text(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => !matches!(
                self.attributes.get("type").map(String::as_str),
                Some("button" | "submit" | "reset" | "checkbox" | "radio" | "hidden" | "image")
            ),
            _ => self.attributes.contains_key("contenteditable"),
        }
    }

    fn focusable(&self) -> bool {
        matches!(
            self.tag.as_str(),
            "input" | "textarea" | "select" | "button" | "summary"
        ) || (self.tag == "a" && self.attributes.contains_key("href"))
            || self.attributes.contains_key("tabindex")
    }
}

#[derive(Debug, Clone, Copy)]
struct Deferred {
    due: u64,
    node: NodeId,
    rendered: bool,
}

/// Mutable state of a [`MemoryPage`]
///
/// Listeners belong to the document: navigation drops them together with
/// the elements.
#[derive(Default)]
pub struct PageState {
    url: String,
    title: String,
    elements: BTreeMap<NodeId, MemoryElement>,
    next_id: u64,
    focused: Option<NodeId>,
    snapshots: u64,
    deferred: Vec<Deferred>,
    pending_navigation: Option<String>,
    clicks: HashMap<NodeId, Reaction>,
    keys: Vec<(KeyChord, Reaction)>,
    log: Vec<String>,
}

impl fmt::Debug for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageState")
            .field("url", &self.url)
            .field("title", &self.title)
            .field("elements", &self.elements.len())
            .field("focused", &self.focused)
            .field("click_listeners", &self.clicks.len())
            .field("key_listeners", &self.keys.len())
            .finish_non_exhaustive()
    }
}

impl PageState {
    /// React to clicks on an element
    pub fn on_click(&mut self, node: NodeId, reaction: impl Fn(&mut Self) + Send + Sync + 'static) {
        self.clicks.insert(node, Arc::new(reaction));
    }

    /// React to a key chord pressed anywhere in the document
    pub fn on_key(&mut self, chord: KeyChord, reaction: impl Fn(&mut Self) + Send + Sync + 'static) {
        self.keys.push((chord, Arc::new(reaction)));
    }

    /// Append an element; ids increase in document order
    pub fn add(&mut self, element: MemoryElement) -> NodeId {
        self.next_id += 1;
        let node = NodeId(self.next_id);
        self.elements.insert(node, element);
        node
    }

    /// Detach an element and its descendants
    pub fn remove(&mut self, node: NodeId) {
        let mut doomed = vec![node];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(
                self.elements
                    .iter()
                    .filter(|(_, e)| e.parent == Some(parent))
                    .map(|(id, _)| *id),
            );
            i += 1;
        }
        for id in doomed {
            self.elements.remove(&id);
            self.clicks.remove(&id);
            if self.focused == Some(id) {
                self.focused = None;
            }
        }
    }

    /// Drop every element (new document)
    pub fn clear(&mut self) {
        self.elements.clear();
        self.focused = None;
        self.deferred.clear();
        self.clicks.clear();
        self.keys.clear();
    }

    /// Render an element
    pub fn show(&mut self, node: NodeId) {
        self.set_rendered(node, true);
    }

    /// Stop rendering an element; hidden elements lose focus
    pub fn hide(&mut self, node: NodeId) {
        self.set_rendered(node, false);
    }

    fn set_rendered(&mut self, node: NodeId, rendered: bool) {
        if let Some(element) = self.elements.get_mut(&node) {
            element.rendered = rendered;
        }
        if !rendered && self.focused == Some(node) {
            self.focused = None;
        }
    }

    /// Render an element once `polls` more snapshots have been taken
    pub fn show_after(&mut self, node: NodeId, polls: u64) {
        self.deferred.push(Deferred {
            due: self.snapshots + polls,
            node,
            rendered: true,
        });
    }

    /// Hide an element once `polls` more snapshots have been taken
    pub fn hide_after(&mut self, node: NodeId, polls: u64) {
        self.deferred.push(Deferred {
            due: self.snapshots + polls,
            node,
            rendered: false,
        });
    }

    /// Enable or disable a control
    pub fn set_disabled(&mut self, node: NodeId, disabled: bool) {
        if let Some(element) = self.elements.get_mut(&node) {
            element.disabled = disabled;
        }
    }

    /// Move keyboard focus
    pub fn focus(&mut self, node: NodeId) {
        if self.elements.contains_key(&node) {
            self.focused = Some(node);
        }
    }

    /// Clear keyboard focus
    pub fn blur(&mut self) {
        self.focused = None;
    }

    /// Focused element
    pub const fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Set the document title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Current URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Navigate after the current action completes
    pub fn navigate(&mut self, url: impl Into<String>) {
        self.pending_navigation = Some(url.into());
    }

    /// Element by id
    pub fn element(&self, node: NodeId) -> Option<&MemoryElement> {
        self.elements.get(&node)
    }

    /// Form value of an element
    pub fn value_of(&self, node: NodeId) -> Option<&str> {
        self.elements.get(&node).and_then(|e| e.value.as_deref())
    }

    /// Replace the text content of an element
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        if let Some(element) = self.elements.get_mut(&node) {
            element.text = text.into();
        }
    }

    /// Actions dispatched to the page, in order
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Snapshots taken so far
    pub const fn snapshot_count(&self) -> u64 {
        self.snapshots
    }

    fn take_snapshot(&mut self) -> DomSnapshot {
        self.snapshots += 1;
        let now = self.snapshots;
        let (due, later): (Vec<_>, Vec<_>) =
            self.deferred.drain(..).partition(|d| d.due <= now);
        self.deferred = later;
        for change in due {
            self.set_rendered(change.node, change.rendered);
        }

        let elements = self
            .elements
            .iter()
            .map(|(node, e)| {
                // Rendering is inherited: a hidden ancestor hides its subtree
                let rendered = e.rendered && self.ancestors_rendered(e.parent);
                ElementSnapshot {
                    node: *node,
                    parent: e.parent,
                    tag: e.tag.clone(),
                    attributes: e.attributes.clone(),
                    text: self.text_content(*node),
                    label_text: e.label_text.clone(),
                    labelled_by_text: self.labelled_by(e),
                    rendered,
                    visible: rendered && e.sized,
                    disabled: e.disabled,
                    focused: self.focused == Some(*node),
                    value: e.value.clone(),
                }
            })
            .collect();
        DomSnapshot {
            url: self.url.clone(),
            title: self.title.clone(),
            elements,
        }
    }

    fn ancestors_rendered(&self, mut parent: Option<NodeId>) -> bool {
        while let Some(id) = parent {
            match self.elements.get(&id) {
                Some(p) if !p.rendered => return false,
                Some(p) => parent = p.parent,
                None => return true,
            }
        }
        true
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut parts = Vec::new();
        if let Some(own) = self.elements.get(&node).map(|e| e.text.as_str()) {
            if !own.is_empty() {
                parts.push(own.to_string());
            }
        }
        for (id, e) in &self.elements {
            if e.parent == Some(node) {
                let child = self.text_content(*id);
                if !child.is_empty() {
                    parts.push(child);
                }
            }
        }
        parts.join(" ")
    }

    fn labelled_by(&self, element: &MemoryElement) -> Option<String> {
        let ids = element.attributes.get("aria-labelledby")?;
        let texts: Vec<String> = ids
            .split_whitespace()
            .filter_map(|id| {
                self.elements
                    .iter()
                    .find(|(_, e)| e.attributes.get("id").map(String::as_str) == Some(id))
                    .map(|(node, _)| self.text_content(*node))
            })
            .collect();
        (!texts.is_empty()).then(|| texts.join(" "))
    }

    // Unbound printable keys type into the focused field
    fn type_into_focused(&mut self, chord: &KeyChord) {
        if chord.has_command_modifier() || chord.key() == Key::Enter {
            return;
        }
        let Some(text) = chord.key().text() else {
            return;
        };
        let Some(focused) = self.focused else {
            return;
        };
        if let Some(element) = self.elements.get_mut(&focused) {
            if element.accepts_text() {
                element.value.get_or_insert_with(String::new).push_str(&text);
            }
        }
    }

    fn is_rendered(&self, node: NodeId) -> bool {
        self.elements
            .get(&node)
            .is_some_and(|e| e.rendered && e.sized && self.ancestors_rendered(e.parent))
    }
}

/// In-memory [`PageDriver`]
pub struct MemoryPage {
    state: Mutex<PageState>,
    routes: Mutex<HashMap<String, Reaction>>,
}

impl fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MemoryPage")
            .field("url", &state.url)
            .field("elements", &state.elements.len())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MemoryPage {
    /// Blank page at `about:blank`
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                ..PageState::default()
            }),
            routes: Mutex::new(HashMap::new()),
        }
    }

    /// Run a closure against the page state
    pub fn with_state<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        f(&mut *lock(&self.state))
    }

    /// Append an element to the current document
    pub fn add(&self, element: MemoryElement) -> NodeId {
        self.with_state(|state| state.add(element))
    }

    /// Build the document served at `url`
    pub fn route(&self, url: impl Into<String>, build: impl Fn(&mut PageState) + Send + Sync + 'static) {
        lock(&self.routes).insert(url.into(), Arc::new(build));
    }

    /// React to clicks on an element of the current document
    pub fn on_click(&self, node: NodeId, reaction: impl Fn(&mut PageState) + Send + Sync + 'static) {
        self.with_state(|state| state.on_click(node, reaction));
    }

    /// React to a key chord in the current document
    pub fn on_key(&self, chord: KeyChord, reaction: impl Fn(&mut PageState) + Send + Sync + 'static) {
        self.with_state(|state| state.on_key(chord, reaction));
    }

    fn load(&self, url: &str) -> VigiaResult<()> {
        let build = lock(&self.routes).get(url).cloned();
        let Some(build) = build else {
            return Err(VigiaError::NavigationError {
                url: url.to_string(),
                message: "no route registered".to_string(),
            });
        };
        let mut state = lock(&self.state);
        state.clear();
        state.url = url.to_string();
        state.title.clear();
        build(&mut *state);
        Ok(())
    }

    fn follow_pending_navigation(&self) -> VigiaResult<()> {
        let pending = lock(&self.state).pending_navigation.take();
        match pending {
            Some(url) => self.load(&url),
            None => Ok(()),
        }
    }

    fn record(&self, entry: String) {
        lock(&self.state).log.push(entry);
    }
}

#[async_trait]
impl PageDriver for MemoryPage {
    async fn goto(&self, url: &str) -> VigiaResult<()> {
        self.record(format!("goto {url}"));
        self.load(url)
    }

    async fn wait_for_load_state(&self, state: LoadState, _timeout: Duration) -> VigiaResult<()> {
        self.record(format!("wait_for_load_state {state}"));
        Ok(())
    }

    async fn snapshot(&self) -> VigiaResult<DomSnapshot> {
        Ok(lock(&self.state).take_snapshot())
    }

    async fn query_css(&self, css: &str) -> VigiaResult<Vec<NodeId>> {
        let list = CssSelectorList::parse(css)?;
        let state = lock(&self.state);
        Ok(state
            .elements
            .iter()
            .filter(|(_, e)| list.matches(&e.tag, &e.attributes))
            .map(|(node, _)| *node)
            .collect())
    }

    async fn click(&self, node: NodeId) -> VigiaResult<()> {
        self.record(format!("click {node}"));
        {
            let mut state = lock(&self.state);
            let Some(element) = state.elements.get(&node) else {
                return Err(VigiaError::action(
                    "click",
                    node.to_string(),
                    "element is detached from the document",
                ));
            };
            let focusable = element.focusable();
            if !state.is_rendered(node) {
                return Err(VigiaError::action(
                    "click",
                    node.to_string(),
                    "element is not visible",
                ));
            }
            if focusable {
                state.focused = Some(node);
            }
            if let Some(reaction) = state.clicks.get(&node).cloned() {
                reaction(&mut *state);
            }
        }
        self.follow_pending_navigation()
    }

    async fn fill(&self, node: NodeId, text: &str) -> VigiaResult<()> {
        self.record(format!("fill {node} {text:?}"));
        let mut state = lock(&self.state);
        let Some(element) = state.elements.get_mut(&node) else {
            return Err(VigiaError::action(
                "fill",
                node.to_string(),
                "element is detached from the document",
            ));
        };
        if !element.accepts_text() {
            return Err(VigiaError::action(
                "fill",
                node.to_string(),
                "element is not an <input>, <textarea> or [contenteditable] element",
            ));
        }
        if element.disabled {
            return Err(VigiaError::action("fill", node.to_string(), "element is disabled"));
        }
        element.value = Some(text.to_string());
        state.focused = Some(node);
        Ok(())
    }

    async fn press(&self, chord: &KeyChord) -> VigiaResult<()> {
        self.record(format!("press {chord}"));
        {
            let mut state = lock(&self.state);
            let reactions: Vec<Reaction> = state
                .keys
                .iter()
                .filter(|(bound, _)| bound == chord)
                .map(|(_, reaction)| Arc::clone(reaction))
                .collect();
            if reactions.is_empty() {
                state.type_into_focused(chord);
            }
            for reaction in reactions {
                reaction(&mut *state);
            }
        }
        self.follow_pending_navigation()
    }

    async fn url(&self) -> VigiaResult<String> {
        Ok(lock(&self.state).url.clone())
    }

    async fn title(&self) -> VigiaResult<String> {
        Ok(lock(&self.state).title.clone())
    }

    async fn screenshot(&self) -> VigiaResult<Vec<u8>> {
        // No pixels; a textual dump keeps failure artifacts useful
        let snapshot = lock(&self.state).take_snapshot();
        Ok(serde_json::to_vec_pretty(&snapshot)?)
    }
}

/// [`PageSource`] that builds each page from a factory
pub struct MemoryPageSource {
    factory: Arc<dyn Fn() -> MemoryPage + Send + Sync>,
    opened: AtomicUsize,
}

impl MemoryPageSource {
    /// Create a source from a page factory
    pub fn new(factory: impl Fn() -> MemoryPage + Send + Sync + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            opened: AtomicUsize::new(0),
        }
    }

    /// Number of pages handed out
    pub fn pages_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MemoryPageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPageSource")
            .field("opened", &self.pages_opened())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PageSource for MemoryPageSource {
    async fn new_page(&self) -> VigiaResult<Arc<dyn PageDriver>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new((self.factory)()))
    }
}
