//! Escaping expression builders for XPath selectors.
//!
//! Caller-supplied text (file names, menu labels) never reaches a selector by
//! plain string concatenation. It is normalised and rendered as an XPath
//! string literal, so quotes, brackets or whitespace in a file name cannot
//! change the structure of the selector.
//!
//! Structural parts of an expression (tag names, attribute names, class
//! names) are `&'static str`: they are part of the harness source, not data.

use std::fmt;

/// Collapse XML whitespace runs into single spaces and trim both ends.
///
/// Mirrors XPath `normalize-space()`, which only treats space, tab, carriage
/// return and line feed as whitespace.
#[must_use]
pub fn normalize_space(text: &str) -> String {
    text.split([' ', '\t', '\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render `text` as an XPath 1.0 string literal.
///
/// XPath 1.0 has no escape sequences, so a string holding both quote kinds
/// is split on `'` and reassembled with `concat()`.
#[must_use]
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }

    let parts: Vec<String> = text.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// An XPath predicate, only constructible from escaped parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate(String);

impl Predicate {
    /// `@class` contains the whole class token `class`
    #[must_use]
    pub fn has_class(class: &'static str) -> Self {
        Self(format!(
            "contains(concat(' ', normalize-space(@class), ' '), {})",
            xpath_literal(&format!(" {class} "))
        ))
    }

    /// Normalised text content equals the normalised `text`
    #[must_use]
    pub fn text_equals(text: &str) -> Self {
        Self(format!(
            "normalize-space() = {}",
            xpath_literal(&normalize_space(text))
        ))
    }

    /// Attribute `name` equals `value`
    #[must_use]
    pub fn attribute_equals(name: &'static str, value: &str) -> Self {
        Self(format!("@{name} = {}", xpath_literal(value)))
    }

    /// Both predicates hold
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self(format!("{} and {}", self.0, other.0))
    }

    /// Rendered predicate body (without brackets)
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fluent builder for location paths.
///
/// ```
/// use acceptance_kit::query::{Predicate, XPathBuilder};
///
/// let row = XPathBuilder::anywhere("span")
///     .filter(Predicate::text_equals("O'Brien \"draft\".txt"))
///     .ancestor("tr")
///     .build();
/// assert!(row.starts_with("//span[normalize-space() = concat("));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathBuilder {
    expr: String,
}

impl XPathBuilder {
    /// Start with `//tag`: any element named `tag` below the context node
    #[must_use]
    pub fn anywhere(tag: &'static str) -> Self {
        Self {
            expr: format!("//{tag}"),
        }
    }

    /// Step to descendants named `tag`
    #[must_use]
    pub fn descendant(mut self, tag: &'static str) -> Self {
        self.expr.push_str("//");
        self.expr.push_str(tag);
        self
    }

    /// Step to ancestors named `tag`
    #[must_use]
    pub fn ancestor(mut self, tag: &'static str) -> Self {
        self.expr.push_str("/ancestor::");
        self.expr.push_str(tag);
        self
    }

    /// Filter the current step
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.expr.push('[');
        self.expr.push_str(predicate.as_str());
        self.expr.push(']');
        self
    }

    /// Finish the expression
    #[must_use]
    pub fn build(self) -> String {
        self.expr
    }
}
