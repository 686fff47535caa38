use super::{ParsePath, PathElement, PathKind};
use crate::atn::GrammarModel;
use crate::enumerate::SourceMap;
use crate::tree::ParseTree;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Turns parse trees into [`ParsePath`]s.
///
/// Rule nodes become [`PathKind::RuleEntry`] elements labelled with the rule
/// name, tokens become [`PathKind::Token`] elements labelled with their
/// vocabulary name, and error leaves become [`PathKind::Other`]. With a
/// [`SourceMap`] attached, each element carries the grammar range of the
/// construct that produced it.
#[derive(Debug, Clone, Copy)]
pub struct PathCanonicalizer<'a> {
    model: &'a GrammarModel,
    source_map: Option<&'a SourceMap>,
}

impl<'a> PathCanonicalizer<'a> {
    #[must_use]
    pub const fn new(model: &'a GrammarModel) -> Self {
        Self {
            model,
            source_map: None,
        }
    }

    #[must_use]
    pub const fn with_source_map(mut self, source_map: &'a SourceMap) -> Self {
        self.source_map = Some(source_map);
        self
    }

    /// Preorder path of `tree`, keeping children whose tokens lie in
    /// `start..=stop`.
    ///
    /// When the filter would drop every child of a node, that node's subtree
    /// is walked without it.
    #[must_use]
    pub fn canonicalize(&self, tree: &Arc<ParseTree>, start: usize, stop: usize) -> ParsePath {
        let mut elements = Vec::with_capacity(tree.size());
        let mut stack = vec![(Arc::clone(tree), true)];

        while let Some((node, filtered)) = stack.pop() {
            elements.push(self.element(&node));
            let children = node.children();
            let kept: Vec<_> = if filtered {
                children.iter().filter(|c| c.within(start, stop)).collect()
            } else {
                children.iter().collect()
            };
            if kept.is_empty() && !children.is_empty() {
                stack.extend(children.iter().rev().map(|c| (Arc::clone(c), false)));
            } else {
                stack.extend(kept.into_iter().rev().map(|c| (Arc::clone(c), filtered)));
            }
        }
        ParsePath::new(elements)
    }

    /// Paths of every tree, in order
    #[must_use]
    pub fn canonicalize_all(&self, trees: &[Arc<ParseTree>], start: usize, stop: usize) -> Vec<ParsePath> {
        #[cfg(feature = "parallel")]
        {
            trees
                .par_iter()
                .map(|tree| self.canonicalize(tree, start, stop))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            trees
                .iter()
                .map(|tree| self.canonicalize(tree, start, stop))
                .collect()
        }
    }

    fn element(&self, node: &ParseTree) -> PathElement {
        let (kind, label) = match node {
            ParseTree::Rule(rule) => (
                PathKind::RuleEntry,
                self.model
                    .atn()
                    .rule_name(rule.rule)
                    .map_or_else(|| format!("rule{}", rule.rule), str::to_string),
            ),
            ParseTree::Token(leaf) => (
                PathKind::Token,
                self.model.vocabulary().display_name(leaf.token_type),
            ),
            ParseTree::Error(leaf) => (
                PathKind::Other,
                self.model.vocabulary().display_name(leaf.token_type),
            ),
        };
        let span = self
            .source_map
            .and_then(|map| map.range_of(self.model.atn(), node));
        PathElement::new(kind, &label).with_span(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{RuleNode, TerminalNode};
    use crate::testing::fixtures;
    use smallvec::SmallVec;

    fn leaf(index: usize, token_type: i32) -> Arc<ParseTree> {
        Arc::new(ParseTree::Token(TerminalNode {
            token_index: index,
            token_type,
            state: None,
        }))
    }

    fn expr(start: usize, end: usize, children: Vec<Arc<ParseTree>>) -> Arc<ParseTree> {
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
    fn test_filter_keeps_children_inside_interval() {
        let grammar = fixtures::expr_grammar();
        let tree = expr(0, 3, vec![expr(0, 1, vec![leaf(0, 1)]), leaf(1, 2), expr(2, 3, vec![leaf(2, 1)])]);
        let path = PathCanonicalizer::new(&grammar).canonicalize(&tree, 0, 1);
        assert_eq!(path.labels().collect::<Vec<_>>(), vec!["expr", "expr", "ATOM", "OP"]);
    }

    #[test]
    fn test_node_outside_interval_is_walked_whole() {
        let grammar = fixtures::expr_grammar();
        let tree = expr(2, 3, vec![leaf(2, 1)]);
        let path = PathCanonicalizer::new(&grammar).canonicalize(&tree, 0, 1);
        assert_eq!(path.labels().collect::<Vec<_>>(), vec!["expr", "ATOM"]);
    }

    #[test]
    fn test_error_leaf_is_other() {
        let grammar = fixtures::expr_grammar();
        let tree = expr(0, 1, vec![Arc::new(ParseTree::Error(TerminalNode {
            token_index: 0,
            token_type: 2,
            state: None,
        }))]);
        let path = PathCanonicalizer::new(&grammar).canonicalize(&tree, 0, 0);
        assert_eq!(path.terminal().map(|e| e.kind), Some(PathKind::Other));
    }
}
