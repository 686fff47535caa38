//! # Parse Trees
//!
//! Trees produced by the interpreter and the lookahead fallback. Node kinds
//! are a closed set: rule nodes, matched tokens and error leaves.
//!
//! Children are shared through [`Arc`], so trees that differ in one place
//! share every other subtree. Equality is structural.

use crate::atn::{DecisionId, RuleIndex, StateId, TokenType};
use smallvec::SmallVec;
use std::sync::Arc;

/// A decision taken while parsing one rule invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionChoice {
    pub decision: DecisionId,
    /// Token index at which the decision was made
    pub position: usize,
    /// Chosen alternative (1-based)
    pub alt: usize,
    /// Number of children of the node already built when the choice was made
    pub child: usize,
}

/// One invocation of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleNode {
    pub rule: RuleIndex,
    /// Outermost alternative of the rule that was taken (1-based)
    pub alt: usize,
    /// State of the rule-call transition that invoked this rule; `None` for
    /// the start rule
    pub invoking_state: Option<StateId>,
    /// First token index covered
    pub start: usize,
    /// One past the last token index covered
    pub end: usize,
    /// Decisions taken directly inside this invocation, in order
    pub trail: SmallVec<[DecisionChoice; 2]>,
    pub children: Vec<Arc<ParseTree>>,
}

/// A matched token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalNode {
    pub token_index: usize,
    pub token_type: TokenType,
    /// State whose transition matched the token
    pub state: Option<StateId>,
}

/// Parse-tree node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParseTree {
    Rule(RuleNode),
    Token(TerminalNode),
    /// Token the tree could not account for
    Error(TerminalNode),
}

impl ParseTree {
    /// First token index covered
    #[must_use]
    pub const fn start(&self) -> usize {
        match self {
            Self::Rule(node) => node.start,
            Self::Token(leaf) | Self::Error(leaf) => leaf.token_index,
        }
    }

    /// One past the last token index covered
    #[must_use]
    pub const fn end(&self) -> usize {
        match self {
            Self::Rule(node) => node.end,
            Self::Token(leaf) | Self::Error(leaf) => leaf.token_index + 1,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[Arc<Self>] {
        match self {
            Self::Rule(node) => &node.children,
            Self::Token(_) | Self::Error(_) => &[],
        }
    }

    #[must_use]
    pub const fn as_rule(&self) -> Option<&RuleNode> {
        match self {
            Self::Rule(node) => Some(node),
            Self::Token(_) | Self::Error(_) => None,
        }
    }

    /// Whether the tokens of this node all lie in `start..=stop`
    #[must_use]
    pub const fn within(&self, start: usize, stop: usize) -> bool {
        self.start() >= start && self.end() <= stop + 1
    }

    /// Smallest subtree covering every token of `start..=stop`.
    ///
    /// Returns `None` when this tree itself does not cover the region.
    #[must_use]
    pub fn enclosing(self: &Arc<Self>, start: usize, stop: usize) -> Option<Arc<Self>> {
        if self.start() > start || self.end() <= stop {
            return None;
        }
        let mut current = Arc::clone(self);
        loop {
            let next = current
                .children()
                .iter()
                .find(|child| child.start() <= start && child.end() > stop)
                .cloned();
            match next {
                Some(child) if child.as_rule().is_some() => current = child,
                _ => return Some(current),
            }
        }
    }

    /// Number of nodes in the tree
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// Every decision taken in this subtree, in the order a parser takes them
    #[must_use]
    pub fn timeline(&self) -> Vec<DecisionChoice> {
        let mut out = Vec::new();
        self.collect_timeline(&mut out);
        out
    }

    fn collect_timeline(&self, out: &mut Vec<DecisionChoice>) {
        let Self::Rule(node) = self else {
            return;
        };
        let mut trail = node.trail.iter().peekable();
        for (index, child) in node.children.iter().enumerate() {
            while let Some(choice) = trail.next_if(|c| c.child <= index) {
                out.push(*choice);
            }
            child.collect_timeline(out);
        }
        out.extend(trail.copied());
    }

    /// Copy of this node recording the state that invoked it
    #[must_use]
    pub fn invoked_from(self: &Arc<Self>, state: StateId) -> Arc<Self> {
        match self.as_ref() {
            Self::Rule(node) if node.invoking_state != Some(state) => {
                Arc::new(Self::Rule(RuleNode {
                    invoking_state: Some(state),
                    ..node.clone()
                }))
            }
            _ => Arc::clone(self),
        }
    }

    /// Preorder iterator over every node
    #[must_use]
    pub fn preorder(self: &Arc<Self>) -> Preorder {
        Preorder {
            stack: vec![Arc::clone(self)],
        }
    }
}

/// Preorder walk over a shared tree
pub struct Preorder {
    stack: Vec<Arc<ParseTree>>,
}

impl Iterator for Preorder {
    type Item = Arc<ParseTree>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev().cloned());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(index: usize) -> Arc<ParseTree> {
        Arc::new(ParseTree::Token(TerminalNode {
            token_index: index,
            token_type: 1,
            state: None,
        }))
    }

    fn node(start: usize, end: usize, children: Vec<Arc<ParseTree>>) -> Arc<ParseTree> {
        Arc::new(ParseTree::Rule(RuleNode {
            rule: 0,
            alt: 1,
            invoking_state: None,
            start,
            end,
            trail: SmallVec::new(),
            children,
        }))
    }

    #[test]
    fn test_enclosing_descends_to_smallest_rule() {
        let inner = node(0, 2, vec![leaf(0), leaf(1)]);
        let root = node(0, 3, vec![Arc::clone(&inner), leaf(2)]);
        assert_eq!(root.enclosing(0, 1), Some(inner));
        assert_eq!(root.enclosing(1, 2), Some(Arc::clone(&root)));
        assert_eq!(root.enclosing(0, 3), None);
    }

    #[test]
    fn test_enclosing_stops_at_rule_nodes() {
        let inner = node(0, 2, vec![leaf(0), leaf(1)]);
        // a single token region is covered by the leaf, but the answer is its rule
        assert_eq!(inner.enclosing(1, 1), Some(Arc::clone(&inner)));
    }

    #[test]
    fn test_timeline_interleaves_children() {
        let choice = |decision, child| DecisionChoice {
            decision,
            position: 0,
            alt: 1,
            child,
        };
        let inner = Arc::new(ParseTree::Rule(RuleNode {
            rule: 1,
            alt: 1,
            invoking_state: None,
            start: 0,
            end: 1,
            trail: SmallVec::from_iter([choice(1, 0)]),
            children: vec![leaf(0)],
        }));
        let root = ParseTree::Rule(RuleNode {
            rule: 0,
            alt: 1,
            invoking_state: None,
            start: 0,
            end: 2,
            trail: SmallVec::from_iter([choice(0, 0), choice(2, 1)]),
            children: vec![inner, leaf(1)],
        });
        let order: Vec<_> = root.timeline().iter().map(|c| c.decision).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_preorder_and_size() {
        let root = node(0, 2, vec![node(0, 1, vec![leaf(0)]), leaf(1)]);
        let starts: Vec<_> = root.preorder().map(|n| n.start()).collect();
        assert_eq!(starts, vec![0, 0, 0, 1]);
        assert_eq!(root.size(), 4);
        assert!(root.within(0, 1));
        assert!(!root.within(1, 1));
    }
}
