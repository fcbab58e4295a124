//! In-memory DOM implementing [`BrowserSession`].
//!
//! `MockSession` lets steps, waits and whole scenarios run without a
//! browser. It keeps a tree of nodes, evaluates a small CSS subset natively
//! and answers XPath expressions from explicit bindings, since evaluating
//! XPath is out of its reach.
//!
//! ## Supported CSS
//!
//! Compound selectors made of a tag (or `*`), `#id`, `.class`, `[attr]` and
//! `[attr=value]`, joined by descendant combinators (whitespace). Selector
//! lists and other combinators are rejected with
//! [`HarnessError::InvalidSelector`].
//!
//! ## Example
//!
//! ```
//! use acceptance_kit::mock::MockSession;
//! use acceptance_kit::{BrowserSession, Locator};
//!
//! let dom = MockSession::new();
//! let controls = dom.append(dom.root(), "div").id("controls").build();
//! let button = dom.append(controls, "a").class("button").class("new").build();
//!
//! let found = dom.resolve(&Locator::for_css("#controls .button.new")).unwrap();
//! assert_eq!(found, vec![button]);
//! ```
//!
//! Clones share the same tree, so a test thread can change the DOM while a
//! wait polls it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::locator::{Locator, Selector};
use crate::result::{HarnessError, HarnessResult};
use crate::session::{BrowserSession, ElementRef};

type ClickReaction = Arc<dyn Fn(&MockSession) + Send + Sync>;
type ValueReaction = Arc<dyn Fn(&MockSession, &str) + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    value: String,
    visible: bool,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Default)]
struct DomState {
    nodes: Vec<Node>,
    xpath_bindings: HashMap<String, Vec<usize>>,
    click_reactions: HashMap<usize, Vec<ClickReaction>>,
    value_reactions: HashMap<usize, Vec<ValueReaction>>,
    history: Vec<String>,
}

impl DomState {
    fn with_root() -> Self {
        Self {
            nodes: vec![Node {
                tag: "html".to_string(),
                visible: true,
                ..Node::default()
            }],
            ..Self::default()
        }
    }

    fn is_attached(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(node) = current {
            if node == 0 {
                return true;
            }
            current = self.nodes.get(node).and_then(|n| n.parent);
        }
        false
    }

    fn is_strict_descendant(&self, node: usize, ancestor: usize) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.nodes[parent].parent;
        }
        false
    }

    /// Attached nodes in pre-order
    fn document_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node].children.iter().rev());
        }
        order
    }

    fn attached(&self, element: ElementRef) -> HarnessResult<usize> {
        usize::try_from(element.0)
            .ok()
            .filter(|&index| index < self.nodes.len() && self.is_attached(index))
            .ok_or_else(|| HarnessError::StaleElement {
                description: format!("element #{}", element.0),
            })
    }

    fn rendered(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(node) = current {
            if !self.nodes[node].visible {
                return false;
            }
            current = self.nodes[node].parent;
        }
        true
    }

    fn evaluate(&self, selector: &Selector, order: &[usize]) -> HarnessResult<Vec<usize>> {
        match selector {
            Selector::Css(expression) => {
                let compounds = parse_css(expression)?;
                Ok(order
                    .iter()
                    .copied()
                    .filter(|&node| self.css_matches(&compounds, node))
                    .collect())
            }
            Selector::XPath(expression) => {
                let bound = self.xpath_bindings.get(expression);
                Ok(order
                    .iter()
                    .copied()
                    .filter(|node| bound.is_some_and(|nodes| nodes.contains(node)))
                    .collect())
            }
        }
    }

    fn css_matches(&self, compounds: &[Compound], node: usize) -> bool {
        let Some((last, ancestors)) = compounds.split_last() else {
            return false;
        };
        if !last.matches(&self.nodes[node]) {
            return false;
        }
        let mut current = self.nodes[node].parent;
        for compound in ancestors.iter().rev() {
            loop {
                let Some(parent) = current else {
                    return false;
                };
                current = self.nodes[parent].parent;
                if compound.matches(&self.nodes[parent]) {
                    break;
                }
            }
        }
        true
    }

    fn collect_text(&self, index: usize, out: &mut String) {
        out.push_str(&self.nodes[index].text);
        for &child in &self.nodes[index].children {
            self.collect_text(child, out);
        }
    }
}

// =============================================================================
// CSS SUBSET
// =============================================================================

#[derive(Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        self.tag.as_ref().map_or(true, |tag| *tag == node.tag)
            && self
                .id
                .as_ref()
                .map_or(true, |id| node.id.as_ref() == Some(id))
            && self.classes.iter().all(|class| node.classes.contains(class))
            && self.attributes.iter().all(|(name, expected)| {
                let actual = match name.as_str() {
                    "id" => node.id.clone(),
                    "class" => (!node.classes.is_empty()).then(|| node.classes.join(" ")),
                    other => node.attributes.get(other).cloned(),
                };
                match (actual, expected) {
                    (Some(actual), Some(expected)) => actual == *expected,
                    (Some(_), None) => true,
                    (None, _) => false,
                }
            })
    }
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(input: &str) -> (&str, &str) {
    let end = input.find(|c: char| !is_ident_char(c)).unwrap_or(input.len());
    input.split_at(end)
}

fn unsupported(expression: &str) -> HarnessError {
    HarnessError::InvalidSelector {
        message: format!("unsupported css selector `{expression}`"),
    }
}

fn parse_compound(token: &str, expression: &str) -> HarnessResult<Compound> {
    let mut compound = Compound::default();
    let mut rest = match token.strip_prefix('*') {
        Some(after) => after,
        None => {
            let (tag, after) = take_ident(token);
            if !tag.is_empty() {
                compound.tag = Some(tag.to_string());
            }
            after
        }
    };

    while let Some(marker) = rest.chars().next() {
        rest = &rest[marker.len_utf8()..];
        match marker {
            '#' | '.' => {
                let (ident, after) = take_ident(rest);
                if ident.is_empty() {
                    return Err(unsupported(expression));
                }
                if marker == '#' {
                    compound.id = Some(ident.to_string());
                } else {
                    compound.classes.push(ident.to_string());
                }
                rest = after;
            }
            '[' => {
                let end = rest.find(']').ok_or_else(|| unsupported(expression))?;
                let body = &rest[..end];
                rest = &rest[end + 1..];
                let (name, value) = match body.split_once('=') {
                    Some((name, value)) => (
                        name.trim(),
                        Some(value.trim().trim_matches(['"', '\'']).to_string()),
                    ),
                    None => (body.trim(), None),
                };
                if name.is_empty() || !name.chars().all(is_ident_char) {
                    return Err(unsupported(expression));
                }
                compound.attributes.push((name.to_string(), value));
            }
            _ => return Err(unsupported(expression)),
        }
    }
    Ok(compound)
}

fn parse_css(expression: &str) -> HarnessResult<Vec<Compound>> {
    let compounds = expression
        .split_whitespace()
        .map(|token| parse_compound(token, expression))
        .collect::<HarnessResult<Vec<_>>>()?;
    if compounds.is_empty() {
        return Err(unsupported(expression));
    }
    Ok(compounds)
}

// =============================================================================
// MOCK SESSION
// =============================================================================

/// In-memory browser session for tests
#[derive(Clone)]
pub struct MockSession {
    state: Arc<Mutex<DomState>>,
}

impl Default for MockSession {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(DomState::with_root())),
        }
    }
}

impl fmt::Debug for MockSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MockSession")
            .field("nodes", &state.nodes.len())
            .field("history", &state.history.len())
            .finish_non_exhaustive()
    }
}

impl MockSession {
    /// Create a document holding only the `html` root
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DomState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The document root
    #[must_use]
    pub const fn root(&self) -> ElementRef {
        ElementRef(0)
    }

    /// Start building a child of `parent`
    #[must_use]
    pub fn append(&self, parent: ElementRef, tag: &str) -> NodeBuilder<'_> {
        NodeBuilder {
            session: self,
            parent,
            node: Node {
                tag: tag.to_string(),
                visible: true,
                ..Node::default()
            },
        }
    }

    /// Detach `element` and its subtree; handles to them become stale
    pub fn remove(&self, element: ElementRef) {
        let mut state = self.lock();
        let Ok(index) = state.attached(element) else {
            return;
        };
        if index == 0 {
            return;
        }
        if let Some(parent) = state.nodes[index].parent.take() {
            state.nodes[parent].children.retain(|&child| child != index);
        }
    }

    /// Show or hide `element` (hiding also hides its subtree)
    pub fn set_visible(&self, element: ElementRef, visible: bool) {
        let mut state = self.lock();
        if let Ok(index) = state.attached(element) {
            state.nodes[index].visible = visible;
        }
    }

    /// Add a class to `element`
    pub fn add_class(&self, element: ElementRef, class: &str) {
        let mut state = self.lock();
        if let Ok(index) = state.attached(element) {
            let classes = &mut state.nodes[index].classes;
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
    }

    /// Replace the own text of `element`
    pub fn set_text(&self, element: ElementRef, text: &str) {
        let mut state = self.lock();
        if let Ok(index) = state.attached(element) {
            state.nodes[index].text = text.to_string();
        }
    }

    /// Current value of an input, without the submitting `\r`
    #[must_use]
    pub fn value(&self, element: ElementRef) -> Option<String> {
        let state = self.lock();
        state
            .attached(element)
            .ok()
            .map(|index| state.nodes[index].value.clone())
    }

    /// Whether `element` is still part of the document
    #[must_use]
    pub fn is_attached(&self, element: ElementRef) -> bool {
        self.lock().attached(element).is_ok()
    }

    /// Whether `element` lies strictly inside the subtree of `ancestor`
    #[must_use]
    pub fn contains(&self, ancestor: ElementRef, element: ElementRef) -> bool {
        let state = self.lock();
        match (usize::try_from(ancestor.0), usize::try_from(element.0)) {
            (Ok(ancestor), Ok(element)) if element < state.nodes.len() => {
                state.is_strict_descendant(element, ancestor)
            }
            _ => false,
        }
    }

    /// Answer `expression` with `elements` (added to earlier bindings)
    pub fn bind_xpath(
        &self,
        expression: impl Into<String>,
        elements: impl IntoIterator<Item = ElementRef>,
    ) {
        let indices: Vec<usize> = elements
            .into_iter()
            .filter_map(|element| usize::try_from(element.0).ok())
            .collect();
        self.lock()
            .xpath_bindings
            .entry(expression.into())
            .or_default()
            .extend(indices);
    }

    /// Bind the leaf XPath of `locator` to `elements`; CSS leaves are ignored
    pub fn bind_locator(
        &self,
        locator: &Locator,
        elements: impl IntoIterator<Item = ElementRef>,
    ) {
        if let Selector::XPath(expression) = locator.selector() {
            self.bind_xpath(expression.clone(), elements);
        }
    }

    /// Run `reaction` every time `element` is clicked
    pub fn on_click<F>(&self, element: ElementRef, reaction: F)
    where
        F: Fn(&Self) + Send + Sync + 'static,
    {
        if let Ok(index) = usize::try_from(element.0) {
            self.lock()
                .click_reactions
                .entry(index)
                .or_default()
                .push(Arc::new(reaction));
        }
    }

    /// Run `reaction` with the typed value every time `element` receives one
    pub fn on_set_value<F>(&self, element: ElementRef, reaction: F)
    where
        F: Fn(&Self, &str) + Send + Sync + 'static,
    {
        if let Ok(index) = usize::try_from(element.0) {
            self.lock()
                .value_reactions
                .entry(index)
                .or_default()
                .push(Arc::new(reaction));
        }
    }

    /// Get the interaction history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Check if an interaction was recorded
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(method))
    }
}

impl BrowserSession for MockSession {
    fn resolve(&self, locator: &Locator) -> HarnessResult<Vec<ElementRef>> {
        let state = self.lock();
        let order = state.document_order();
        let mut context: Option<Vec<usize>> = None;

        for step in locator.chain() {
            let matched = state.evaluate(step.selector(), &order)?;
            let scoped = match context {
                None => matched,
                Some(ancestors) => matched
                    .into_iter()
                    .filter(|&node| {
                        ancestors
                            .iter()
                            .any(|&ancestor| state.is_strict_descendant(node, ancestor))
                    })
                    .collect(),
            };
            context = Some(scoped);
        }

        Ok(context
            .unwrap_or_default()
            .into_iter()
            .map(|index| ElementRef(index as u64))
            .collect())
    }

    fn click(&self, element: ElementRef) -> HarnessResult<()> {
        let reactions = {
            let mut state = self.lock();
            let index = state.attached(element)?;
            state.history.push(format!("click:{}", element.0));
            state.click_reactions.get(&index).cloned().unwrap_or_default()
        };
        for reaction in reactions {
            reaction(self);
        }
        Ok(())
    }

    fn set_value(&self, element: ElementRef, value: &str) -> HarnessResult<()> {
        let reactions = {
            let mut state = self.lock();
            let index = state.attached(element)?;
            state.history.push(format!("set_value:{}:{value}", element.0));
            state.nodes[index].value = value.trim_end_matches('\r').to_string();
            state.value_reactions.get(&index).cloned().unwrap_or_default()
        };
        for reaction in reactions {
            reaction(self, value);
        }
        Ok(())
    }

    fn is_visible(&self, element: ElementRef) -> HarnessResult<bool> {
        let state = self.lock();
        let index = state.attached(element)?;
        Ok(state.rendered(index))
    }

    fn text(&self, element: ElementRef) -> HarnessResult<String> {
        let state = self.lock();
        let index = state.attached(element)?;
        let mut text = String::new();
        state.collect_text(index, &mut text);
        Ok(text)
    }
}

/// Builder for a node appended with [`MockSession::append`]
#[derive(Debug)]
#[must_use]
pub struct NodeBuilder<'a> {
    session: &'a MockSession,
    parent: ElementRef,
    node: Node,
}

impl NodeBuilder<'_> {
    /// Set the id
    pub fn id(mut self, id: &str) -> Self {
        self.node.id = Some(id.to_string());
        self
    }

    /// Add a class
    pub fn class(mut self, class: &str) -> Self {
        self.node.classes.push(class.to_string());
        self
    }

    /// Set an attribute
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        let _ = self
            .node
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Set the own text
    pub fn text(mut self, text: &str) -> Self {
        self.node.text = text.to_string();
        self
    }

    /// Start hidden
    pub const fn hidden(mut self) -> Self {
        self.node.visible = false;
        self
    }

    /// Insert the node as the last child of its parent.
    ///
    /// A stale parent leaves the node detached.
    #[must_use]
    pub fn build(self) -> ElementRef {
        let mut state = self.session.lock();
        let index = state.nodes.len();
        let parent = state.attached(self.parent).ok();
        let mut node = self.node;
        node.parent = parent;
        state.nodes.push(node);
        if let Some(parent) = parent {
            state.nodes[parent].children.push(index);
        }
        ElementRef(index as u64)
    }
}
