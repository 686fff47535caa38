//! # Tree Enumeration
//!
//! Produces the parse trees an ambiguous decision can lead to over a token
//! span.
//!
//! ## Strategies
//!
//! - **Exact**: the [`GrammarInterpreter`] parses the whole stream in
//!   [`PredictionMode::LlExactAmbigDetection`]. A listener waits for the report
//!   that matches the target on decision, state, rule, start and stop, then
//!   the interpreter supplies one enclosing subtree per conflicting
//!   alternative.
//! - **Lookahead fallback**: when the interpreter is cancelled before any tree
//!   is found, one tree per conflicting alternative is rebuilt by greedy LL(1)
//!   descent from the decision state.
//!
//! When neither strategy yields a tree the result is
//! [`Enumeration::NotReproduced`], which callers treat as a normal outcome.

mod fallback;
mod source_map;

pub use source_map::SourceMap;

use crate::atn::{AltSet, DecisionId, GrammarModel, RuleIndex, StateId};
use crate::config::EngineConfig;
use crate::error::{AnalysisError, InterpreterError};
use crate::interpreter::{AmbiguityReport, GrammarInterpreter, PredictionMode};
use crate::progress::ProgressSink;
use crate::token::TokenStream;
use crate::tree::ParseTree;
use fallback::Reconstruction;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

/// An ambiguous decision reported by a recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionTarget {
    /// Rule containing the decision state
    pub rule_index: RuleIndex,
    /// Decision state
    pub state: StateId,
    pub decision: DecisionId,
    /// Token index at which the decision was taken
    pub start_index: usize,
    /// Last token index of the ambiguous region (inclusive)
    pub stop_index: usize,
    pub conflicting_alternatives: AltSet,
}

impl DecisionTarget {
    fn matches(&self, report: &AmbiguityReport) -> bool {
        report.decision == self.decision
            && report.state == self.state
            && report.rule == self.rule_index
            && report.start == self.start_index
            && report.stop == self.stop_index
    }
}

/// Which strategy produced the trees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Exact,
    LookaheadFallback,
}

/// Why no trees could be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReproduced {
    /// The interpreter finished without reporting the target ambiguity
    NoMatchingReport { reports: usize },
    /// The target was reported, but no parse took a conflicting alternative
    NoTreesForAlternatives,
    /// The interpreter was cancelled and the fallback built nothing
    Cancelled { steps: usize },
    /// The decision cannot choose any of the conflicting alternatives for the
    /// token at the decision
    LookaheadMismatch { alt: usize },
}

impl fmt::Display for NotReproduced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatchingReport { reports } => write!(
                f,
                "the interpreter reported {reports} ambiguities, none at the target decision"
            ),
            Self::NoTreesForAlternatives => {
                write!(f, "no parse takes a conflicting alternative at the target decision")
            }
            Self::Cancelled { steps } => write!(
                f,
                "interpretation was cancelled after {steps} steps and no tree could be rebuilt"
            ),
            Self::LookaheadMismatch { alt } => write!(
                f,
                "alternative {alt} cannot start with the token at the decision"
            ),
        }
    }
}

/// Result of a tree enumeration
#[derive(Debug, Clone)]
pub enum Enumeration {
    Found {
        strategy: Strategy,
        trees: Vec<Arc<ParseTree>>,
        source_map: SourceMap,
    },
    NotReproduced(NotReproduced),
}

impl Enumeration {
    /// Trees produced, empty when the target was not reproduced
    #[must_use]
    pub fn trees(&self) -> &[Arc<ParseTree>] {
        match self {
            Self::Found { trees, .. } => trees,
            Self::NotReproduced(_) => &[],
        }
    }

    #[must_use]
    pub const fn strategy(&self) -> Option<Strategy> {
        match self {
            Self::Found { strategy, .. } => Some(*strategy),
            Self::NotReproduced(_) => None,
        }
    }
}

/// Enumerates parse trees for one decision target.
#[derive(Debug, Clone)]
pub struct TreeEnumerator<'a> {
    model: &'a GrammarModel,
    tokens: &'a TokenStream,
    config: &'a EngineConfig,
    start_rule: RuleIndex,
}

impl<'a> TreeEnumerator<'a> {
    #[must_use]
    pub const fn new(
        model: &'a GrammarModel,
        tokens: &'a TokenStream,
        config: &'a EngineConfig,
        start_rule: RuleIndex,
    ) -> Self {
        Self {
            model,
            tokens,
            config,
            start_rule,
        }
    }

    /// Produce the trees for `target`.
    ///
    /// The target is assumed to be validated against the grammar model.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::Interpreter`] when the start rule does not exist.
    pub fn enumerate(
        &self,
        target: &DecisionTarget,
        progress: &mut dyn ProgressSink,
    ) -> Result<Enumeration, AnalysisError> {
        progress.report("interpreting token stream", 1, 3);
        let interpreter =
            GrammarInterpreter::new(self.model, self.tokens, self.config.interpreter.clone())
                .with_mode(PredictionMode::LlExactAmbigDetection);

        let mut matched: Option<AmbiguityReport> = None;
        let mut reports = 0;
        let mut listener = |report: &AmbiguityReport| {
            reports += 1;
            if target.matches(report) {
                matched = Some(report.clone());
                ControlFlow::Break(())
            } else {
                tracing::trace!(decision = report.decision, start = report.start, stop = report.stop, "ignoring ambiguity");
                ControlFlow::Continue(())
            }
        };

        let (strategy, trees) = match interpreter.run(self.start_rule, &mut listener) {
            Ok(forest) => {
                progress.report("collecting parse trees", 2, 3);
                let Some(report) = matched else {
                    tracing::debug!(reports, "target ambiguity not reported");
                    return Ok(Enumeration::NotReproduced(NotReproduced::NoMatchingReport { reports }));
                };
                let trees = interpreter.get_all_possible_parse_trees(
                    &forest,
                    &report,
                    &target.conflicting_alternatives,
                );
                (Strategy::Exact, trees)
            }
            Err(InterpreterError::Cancelled { steps }) => {
                tracing::warn!(steps, "interpreter cancelled, rebuilding trees from lookahead");
                progress.report("rebuilding trees from lookahead", 2, 3);
                let trees = self.fallback(target);
                if trees.is_empty() {
                    return Ok(Enumeration::NotReproduced(NotReproduced::Cancelled { steps }));
                }
                (Strategy::LookaheadFallback, trees)
            }
            Err(err) => return Err(err.into()),
        };

        if trees.is_empty() {
            return Ok(Enumeration::NotReproduced(NotReproduced::NoTreesForAlternatives));
        }

        progress.report("mapping grammar source ranges", 3, 3);
        let mut source_map = SourceMap::new();
        for tree in &trees {
            source_map.record_tree(self.model.atn(), tree);
        }
        tracing::debug!(?strategy, trees = trees.len(), mapped = source_map.len(), "enumeration finished");
        Ok(Enumeration::Found {
            strategy,
            trees,
            source_map,
        })
    }

    fn fallback(&self, target: &DecisionTarget) -> Vec<Arc<ParseTree>> {
        let mut rebuild = Reconstruction::new(
            self.model.atn(),
            self.tokens,
            self.config.see_through_predicates,
            self.config.interpreter.max_steps,
        );
        let mut trees: Vec<Arc<ParseTree>> = Vec::new();
        for alt in target.conflicting_alternatives.iter() {
            let tree = rebuild.build(target.rule_index, target.state, target.start_index, alt);
            if let Some(tree) = tree
                && !trees.contains(&tree)
            {
                trees.push(tree);
            }
        }
        tracing::debug!(trees = trees.len(), steps = rebuild.steps(), "lookahead reconstruction");
        trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::testing::fixtures;

    fn expr_target(stop_index: usize) -> DecisionTarget {
        let grammar = fixtures::expr_grammar();
        DecisionTarget {
            rule_index: 0,
            state: grammar.atn().decision_state(0).unwrap(),
            decision: 0,
            start_index: 0,
            stop_index,
            conflicting_alternatives: AltSet::from_iter([1, 2]),
        }
    }

    #[test]
    fn test_exact_strategy_finds_both_associativities() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 3);
        let config = EngineConfig::default();
        let result = TreeEnumerator::new(&grammar, &tokens, &config, 0)
            .enumerate(&expr_target(4), &mut NoProgress)
            .unwrap();
        assert_eq!(result.strategy(), Some(Strategy::Exact));
        assert_eq!(result.trees().len(), 2);
        let Enumeration::Found { source_map, .. } = result else {
            unreachable!()
        };
        assert!(!source_map.is_empty());
    }

    #[test]
    fn test_mismatched_stop_is_not_reproduced() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 3);
        let config = EngineConfig::default();
        let result = TreeEnumerator::new(&grammar, &tokens, &config, 0)
            .enumerate(&expr_target(2), &mut NoProgress)
            .unwrap();
        assert!(matches!(
            result,
            Enumeration::NotReproduced(NotReproduced::NoMatchingReport { reports: 1 })
        ));
    }

    #[test]
    fn test_cancellation_falls_back_to_lookahead() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 3);
        let config = EngineConfig::default().with_max_steps(20);
        let mut steps = Vec::new();
        let mut sink = |message: &str, step: usize, _total: usize| steps.push((message.to_string(), step));
        let result = TreeEnumerator::new(&grammar, &tokens, &config, 0)
            .enumerate(&expr_target(4), &mut sink)
            .unwrap();
        assert_eq!(result.strategy(), Some(Strategy::LookaheadFallback));
        assert_eq!(result.trees().len(), 2);
        assert!(steps.iter().any(|(m, _)| m.contains("lookahead")));
    }
}
