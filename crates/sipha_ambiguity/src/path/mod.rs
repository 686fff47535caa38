//! # Parse Paths
//!
//! Linear, typed views of parse trees. A [`ParsePath`] is the preorder walk of
//! one tree restricted to a token interval; paths compare by their labels, so
//! two trees built from different states but with the same shape produce
//! equal paths.
//!
//! [`commonalities`] splits a set of paths into a shared head, a shared tail
//! and the divergent middles; [`split`] applies that recursively and yields a
//! nested layout.

mod canonical;
mod layout;

pub use canonical::PathCanonicalizer;
pub use layout::{Branch, Commonalities, Segment, commonalities, render_segments, split};

use crate::text::TextRange;
use compact_str::CompactString;
use std::fmt;
use std::hash::{Hash, Hasher};

/// What kind of tree node a path element stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum PathKind {
    /// Entry into a rule invocation
    RuleEntry,
    /// Matched token
    Token,
    /// Any other node, such as an error leaf
    Other,
}

/// One node of a parse path.
///
/// Equality and hashing use the kind and the label; the source range is
/// carried along for display only.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PathElement {
    pub kind: PathKind,
    pub label: CompactString,
    pub span: Option<TextRange>,
}

impl PathElement {
    #[must_use]
    pub fn new(kind: PathKind, label: &str) -> Self {
        Self {
            kind,
            label: label.into(),
            span: None,
        }
    }

    #[must_use]
    pub fn rule(label: &str) -> Self {
        Self::new(PathKind::RuleEntry, label)
    }

    #[must_use]
    pub fn token(label: &str) -> Self {
        Self::new(PathKind::Token, label)
    }

    #[must_use]
    pub const fn with_span(mut self, span: Option<TextRange>) -> Self {
        self.span = span;
        self
    }
}

impl PartialEq for PathElement {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.label == other.label
    }
}

impl Eq for PathElement {}

impl Hash for PathElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.label.hash(state);
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PathKind::RuleEntry | PathKind::Token => f.write_str(&self.label),
            PathKind::Other => write!(f, "<{}>", self.label),
        }
    }
}

/// Preorder walk of one parse tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsePath {
    elements: Vec<PathElement>,
}

impl ParsePath {
    #[must_use]
    pub const fn new(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    #[must_use]
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element the walk ends in
    #[must_use]
    pub fn terminal(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.label.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathElement> {
        self.elements.iter()
    }
}

impl FromIterator<PathElement> for ParsePath {
    fn from_iter<I: IntoIterator<Item = PathElement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ParsePath {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl fmt::Display for ParsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextSize;

    #[test]
    fn test_equality_ignores_span() {
        let span = TextRange::new(TextSize::from(1), TextSize::from(3));
        let a = PathElement::rule("expr").with_span(Some(span));
        let b = PathElement::rule("expr");
        assert_eq!(a, b);
        assert_ne!(a, PathElement::token("expr"));
    }

    #[test]
    fn test_display() {
        let path: ParsePath = [
            PathElement::rule("expr"),
            PathElement::token("ATOM"),
            PathElement::new(PathKind::Other, "OP"),
        ]
        .into_iter()
        .collect();
        assert_eq!(path.to_string(), "expr ATOM <OP>");
        assert_eq!(path.terminal(), Some(&PathElement::new(PathKind::Other, "OP")));
    }
}
