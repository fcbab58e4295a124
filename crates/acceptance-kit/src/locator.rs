//! Locator abstraction for element selection.
//!
//! A [`Locator`] is an immutable description of how to find an element:
//! a CSS or XPath selector, an optional ancestor locator the match must live
//! under, a human-readable label for failure messages and an explicit policy
//! for what to do when more than one element matches.
//!
//! # Design
//!
//! - **Immutable**: every builder method consumes `self` and returns a new
//!   value; nothing mutates a locator after construction
//! - **Tree-shaped**: the ancestor is an owned `Arc<Locator>` snapshot taken
//!   at composition time, so a chain can never loop back on itself
//! - **Cosmetic labels**: [`Locator::described_as`] never takes part in
//!   matching or equality

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::result::{HarnessError, HarnessResult};

/// Query language of a selector expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorKind {
    /// CSS selector
    Css,
    /// XPath 1.0 expression
    XPath,
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css => f.write_str("css"),
            Self::XPath => f.write_str("xpath"),
        }
    }
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "#controls .button.new")
    Css(String),
    /// XPath selector, evaluated relative to each ancestor match
    XPath(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// Query language of this selector
    #[must_use]
    pub const fn kind(&self) -> SelectorKind {
        match self {
            Self::Css(_) => SelectorKind::Css,
            Self::XPath(_) => SelectorKind::XPath,
        }
    }

    /// Raw selector expression
    #[must_use]
    pub fn expression(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) => s,
        }
    }

    /// Reject expressions no session could evaluate
    pub fn validate(&self) -> HarnessResult<()> {
        if self.expression().trim().is_empty() {
            return Err(HarnessError::InvalidSelector {
                message: format!("empty {} expression", self.kind()),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind(), self.expression())
    }
}

/// What to do when a locator resolves to more than one element.
///
/// Name-based selectors (a row for file "Notes.txt") can legitimately match
/// several elements when two entries share a name. The policy makes the
/// outcome explicit instead of inheriting document order by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// More than one match is an [`HarnessError::AmbiguousLocator`]
    #[default]
    Strict,
    /// Take the first match in document order
    First,
}

impl MatchPolicy {
    /// Pick the element this policy designates from all matches.
    ///
    /// Returns `Ok(None)` when nothing matched.
    pub fn pick<T>(self, mut matches: Vec<T>, description: &str) -> HarnessResult<Option<T>> {
        match (self, matches.len()) {
            (_, 0) => Ok(None),
            (Self::Strict, 1) | (Self::First, _) => Ok(Some(matches.swap_remove(0))),
            (Self::Strict, count) => Err(HarnessError::AmbiguousLocator {
                description: description.to_string(),
                count,
            }),
        }
    }
}

/// A locator for finding elements, optionally scoped under an ancestor.
#[derive(Debug, Clone)]
pub struct Locator {
    selector: Selector,
    ancestor: Option<Arc<Locator>>,
    description: Option<String>,
    policy: MatchPolicy,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            ancestor: None,
            description: None,
            policy: MatchPolicy::default(),
        }
    }

    /// Leaf locator for a CSS selector
    #[must_use]
    pub fn for_css(expression: impl Into<String>) -> Self {
        Self::from_selector(Selector::css(expression))
    }

    /// Leaf locator for an XPath expression
    #[must_use]
    pub fn for_xpath(expression: impl Into<String>) -> Self {
        Self::from_selector(Selector::xpath(expression))
    }

    /// Only match elements inside the subtree of an element matched by
    /// `ancestor`.
    ///
    /// If this locator is already scoped, `ancestor` is attached at the root
    /// of the existing chain, so both constraints keep applying.
    #[must_use]
    pub fn descendant_of(mut self, ancestor: &Self) -> Self {
        let root = match self.ancestor.take() {
            None => ancestor.clone(),
            Some(existing) => existing.as_ref().clone().descendant_of(ancestor),
        };
        self.ancestor = Some(Arc::new(root));
        self
    }

    /// Like [`Locator::descendant_of`], with `None` meaning the document root
    #[must_use]
    pub fn within(self, scope: Option<&Self>) -> Self {
        match scope {
            Some(ancestor) => self.descendant_of(ancestor),
            None => self,
        }
    }

    /// Attach a human-readable label used in failure messages
    #[must_use]
    pub fn described_as(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Set the ambiguity policy
    #[must_use]
    pub const fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fail when more than one element matches
    #[must_use]
    pub const fn strict(self) -> Self {
        self.with_match_policy(MatchPolicy::Strict)
    }

    /// Take the first match in document order
    #[must_use]
    pub const fn first_match(self) -> Self {
        self.with_match_policy(MatchPolicy::First)
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the ancestor, if scoped
    #[must_use]
    pub fn ancestor(&self) -> Option<&Self> {
        self.ancestor.as_deref()
    }

    /// Get the ambiguity policy
    #[must_use]
    pub const fn match_policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Label used in failure messages; falls back to the selector
    #[must_use]
    pub fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("element matching {}", self.selector))
    }

    /// Whether a label was attached
    #[must_use]
    pub const fn has_description(&self) -> bool {
        self.description.is_some()
    }

    /// Ancestor chain ordered from the outermost ancestor to `self`
    #[must_use]
    pub fn chain(&self) -> Vec<&Self> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.ancestor() {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Number of locators in the chain (1 for a leaf)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain().len()
    }

    /// Validate every selector in the chain
    pub fn validate(&self) -> HarnessResult<()> {
        self.chain()
            .into_iter()
            .try_for_each(|locator| locator.selector.validate())
    }
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.selector == other.selector
            && self.policy == other.policy
            && self.ancestor() == other.ancestor()
    }
}

impl Eq for Locator {}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
