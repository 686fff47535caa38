use crate::atn::{Atn, StateId};
use crate::text::TextRange;
use crate::tree::ParseTree;
use hashbrown::HashMap;
use std::sync::Arc;

/// Grammar source range of every state that produced a tree node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    ranges: HashMap<StateId, TextRange>,
    skipped: usize,
}

impl SourceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map the states behind every node of `tree`
    pub fn record_tree(&mut self, atn: &Atn, tree: &Arc<ParseTree>) {
        for node in tree.preorder() {
            if let Some(state) = origin(atn, &node) {
                self.record(atn, state);
            }
        }
    }

    /// Map one state; states without a range are ignored and malformed
    /// ranges are skipped with a warning
    pub fn record(&mut self, atn: &Atn, state: StateId) {
        if self.ranges.contains_key(&state) {
            return;
        }
        let Some(span) = atn.state(state).and_then(|s| s.span) else {
            return;
        };
        let well_formed = span.start() <= span.end()
            && atn.source_len().is_none_or(|len| span.fits_within(len));
        if !well_formed {
            self.skipped += 1;
            tracing::warn!(state, %span, "skipping malformed grammar source range");
            return;
        }
        self.ranges.insert(state, span);
    }

    #[must_use]
    pub fn get(&self, state: StateId) -> Option<TextRange> {
        self.ranges.get(&state).copied()
    }

    /// Range of the grammar construct that produced `node`
    #[must_use]
    pub fn range_of(&self, atn: &Atn, node: &ParseTree) -> Option<TextRange> {
        self.get(origin(atn, node)?)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Ranges dropped because they did not fit the grammar source
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, TextRange)> + '_ {
        self.ranges.iter().map(|(&state, &span)| (state, span))
    }
}

/// State a node came from: the rule-call state for an invoked rule, the rule
/// start for a root, the matching state for a token
fn origin(atn: &Atn, node: &ParseTree) -> Option<StateId> {
    match node {
        ParseTree::Rule(rule) => rule.invoking_state.or_else(|| atn.rule_start(rule.rule)),
        ParseTree::Token(leaf) | ParseTree::Error(leaf) => leaf.state,
    }
}
